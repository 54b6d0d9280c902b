//! qr_scan - QR acquisition and decode core
//!
//! Pulls still frames from a camera stream or a photo, locates and decodes a
//! QR code (Model 2, versions 1-40) in them, and reports exactly one payload
//! or one terminal failure per scan session.
//!
//! ```no_run
//! use qr_scan::{decode, DecodeResult, Frame};
//!
//! let frame = Frame::open("ticket.png")?;
//! if let DecodeResult::Found(code) = decode(&frame) {
//!     println!("{}", code.content);
//! }
//! # Ok::<(), qr_scan::ScanError>(())
//! ```

/// Turning a payload into what the application should do next
pub mod action;
/// Environment-driven tuning knobs
pub mod config;
/// Grid decoding (format, Reed-Solomon, data segments)
pub mod decoder;
/// Locating a code in a frame (finder, alignment, grid sampling)
pub mod detector;
/// Error types
pub mod error;
/// Core data structures (Frame, QRCode, BitMatrix, Point, ...)
pub mod models;
/// Scan sessions and the controller that drives them
pub mod scan;
/// Frame sources: photo and camera
pub mod source;
/// Utility functions (grayscale, binarization, geometry)
pub mod utils;

mod pipeline;

pub use action::ScanAction;
pub use config::{DetectorConfig, ScanConfig};
pub use detector::Detector;
pub use error::{FrameError, ScanError};
pub use models::{BitMatrix, ECLevel, Frame, MaskPattern, PixelFormat, Point, QRCode, Version};
pub use scan::{ScanHit, ScanOutcome, Scanner, SessionState};
pub use source::{
    CameraBackend, CameraConfig, Facing, FrameSource, PhotoSource, ReplayCamera, SourceConfig,
    SourceHandle, Sources,
};

/// Outcome of one decode attempt on one frame. All or nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeResult {
    Found(QRCode),
    NotFound,
}

impl DecodeResult {
    pub fn is_found(&self) -> bool {
        matches!(self, DecodeResult::Found(_))
    }

    /// Decoded payload text, if any
    pub fn payload(&self) -> Option<&str> {
        match self {
            DecodeResult::Found(code) => Some(&code.content),
            DecodeResult::NotFound => None,
        }
    }

    pub fn into_code(self) -> Option<QRCode> {
        match self {
            DecodeResult::Found(code) => Some(code),
            DecodeResult::NotFound => None,
        }
    }
}

impl From<Option<QRCode>> for DecodeResult {
    fn from(code: Option<QRCode>) -> Self {
        code.map_or(DecodeResult::NotFound, DecodeResult::Found)
    }
}

/// Single-frame decoder used by the scan controller.
///
/// Implementations must be pure functions of the frame: the controller may
/// call them from a worker thread and relies on the same frame giving the
/// same answer.
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, frame: &Frame) -> DecodeResult;
}

impl FrameDecoder for Detector {
    fn decode(&self, frame: &Frame) -> DecodeResult {
        self.detect(frame).into()
    }
}

/// Decode one frame with the default detector
///
/// # Example
/// ```
/// use qr_scan::{decode, Frame};
///
/// let blank = Frame::from_luma(64, 64, vec![255; 64 * 64]).unwrap();
/// assert!(!decode(&blank).is_found());
/// ```
pub fn decode(frame: &Frame) -> DecodeResult {
    Detector::default().decode(frame)
}
