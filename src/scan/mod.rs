//! Scan sessions
//!
//! A [`Scanner`] pulls frames from one open source on a fixed cadence, runs
//! the decoder on each, and reports exactly one outcome per session: the
//! first code found, or the error that ended the session.

mod controller;
mod session;

pub use controller::Scanner;
pub use session::{ScanSession, SessionState};

use std::time::Duration;

use crate::error::ScanError;
use crate::models::QRCode;

/// A successful scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanHit {
    pub code: QRCode,
    /// Sequence number of the frame the code was read from
    pub frame_sequence: u64,
    /// Frames decoded in this session, the successful one included
    pub attempts: u64,
    /// Time from session start to the hit
    pub elapsed: Duration,
}

impl ScanHit {
    pub fn payload(&self) -> &str {
        &self.code.content
    }
}

/// What a session reports when it ends
pub type ScanOutcome = Result<ScanHit, ScanError>;

/// Result consumer. Runs on the scan worker thread and must not block it
/// for long.
pub type ScanCallback = Box<dyn FnOnce(ScanOutcome) + Send>;
