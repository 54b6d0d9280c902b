//! Error types surfaced by frame construction and scan sessions

use thiserror::Error;

/// Rejected frame buffers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame has zero area ({width}x{height})")]
    Empty { width: usize, height: usize },

    #[error("{width}x{height} {format} frame does not fit in memory")]
    TooLarge {
        width: usize,
        height: usize,
        format: &'static str,
    },

    #[error("expected {expected} bytes for {width}x{height} {format}, got {actual}")]
    LengthMismatch {
        width: usize,
        height: usize,
        format: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Terminal failure reasons delivered to the result consumer
#[derive(Debug, Error)]
pub enum ScanError {
    /// The user or platform refused camera access
    #[error("camera permission denied")]
    PermissionDenied,

    /// No camera matched the request, or it is busy
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// The session was stopped before anything was found
    #[error("scan cancelled before a code was found")]
    Cancelled,

    /// The configured attempt or time bound ran out
    #[error("no code decoded after {attempts} attempts")]
    DecodeTimeout { attempts: u64 },

    /// A finite source (a photo) ran out of frames without a code
    #[error("no QR code found")]
    NotFound,

    /// `switch_source` with no running session to carry over
    #[error("no scan session is running")]
    NoActiveSession,

    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl ScanError {
    /// Acquisition errors end the session before any decode happened
    pub fn is_acquisition(&self) -> bool {
        matches!(
            self,
            ScanError::PermissionDenied | ScanError::DeviceUnavailable(_)
        )
    }
}
