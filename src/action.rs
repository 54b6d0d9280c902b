//! What a decoded payload asks the application to do.
//!
//! The scanner itself never acts on a payload; this only classifies it so
//! the caller can navigate to a link or look the code up in the catalogue.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

/// Catalogue lookup endpoint, relative to the application root
pub const LOOKUP_ENDPOINT: &str = "/api/artworks/by-qr";

/// Bytes a URI component may carry unescaped
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Interpretation of a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanAction {
    /// An http(s) link to open
    OpenUrl(String),
    /// A catalogue code such as `MCN-001`, trimmed
    Lookup(String),
    /// Nothing but whitespace
    Empty,
}

impl ScanAction {
    /// Classify a scanned (or typed) payload
    pub fn from_payload(payload: &str) -> Self {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return ScanAction::Empty;
        }
        if is_web_link(trimmed) {
            return ScanAction::OpenUrl(trimmed.to_string());
        }
        ScanAction::Lookup(trimmed.to_string())
    }

    /// Request path for a catalogue lookup, with the code percent-encoded
    pub fn lookup_path(&self) -> Option<String> {
        match self {
            ScanAction::Lookup(code) => {
                let code = utf8_percent_encode(code, COMPONENT);
                Some(format!("{LOOKUP_ENDPOINT}?code={code}"))
            }
            _ => None,
        }
    }
}

fn is_web_link(text: &str) -> bool {
    match Url::parse(text) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}
