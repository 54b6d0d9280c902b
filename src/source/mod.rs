//! Frame sources
//!
//! A source produces still frames on demand: a camera stream pulled at the
//! controller's pace, or a single photo. Sources are opened through
//! [`Sources`], which hands back a [`SourceHandle`] that releases the
//! underlying device exactly once, whether closed explicitly or dropped.

mod camera;
mod photo;

pub use camera::{CameraBackend, CameraConfig, Facing, ReplayCamera};
pub use photo::PhotoSource;

use crate::error::ScanError;
use crate::models::Frame;
use tracing::{debug, info, warn};

/// A stream of still frames.
///
/// `next_frame` returns `Ok(None)` once the stream is exhausted
/// (end of stream). `close` releases the device and may be called more than
/// once; [`SourceHandle`] guarantees it is called at least once.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, ScanError>;

    fn close(&mut self);

    /// Whether the controller should wait its sampling interval between
    /// frames. Live streams are paced; a finite list of stills is not.
    fn paced(&self) -> bool {
        true
    }
}

/// What to scan from
#[derive(Debug, Clone)]
pub enum SourceConfig {
    Camera(CameraConfig),
    Photo(Frame),
}

impl SourceConfig {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Camera(_) => "camera",
            SourceConfig::Photo(_) => "photo",
        }
    }
}

impl From<CameraConfig> for SourceConfig {
    fn from(config: CameraConfig) -> Self {
        SourceConfig::Camera(config)
    }
}

impl From<Frame> for SourceConfig {
    fn from(frame: Frame) -> Self {
        SourceConfig::Photo(frame)
    }
}

/// Capabilities available for opening sources: photos always work, cameras
/// only when a backend has been installed.
pub struct Sources {
    camera: Option<Box<dyn CameraBackend>>,
}

impl Sources {
    /// No camera; camera requests fail with `DeviceUnavailable`
    pub fn photo_only() -> Self {
        Self { camera: None }
    }

    pub fn with_camera(backend: impl CameraBackend + 'static) -> Self {
        Self {
            camera: Some(Box::new(backend)),
        }
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    /// Open the source `config` asks for.
    ///
    /// Acquisition failures are returned as they are; nothing is left open
    /// when this fails.
    pub fn open(&mut self, config: SourceConfig) -> Result<SourceHandle, ScanError> {
        match config {
            SourceConfig::Photo(frame) => {
                debug!(
                    width = frame.width(),
                    height = frame.height(),
                    "opening photo source"
                );
                Ok(SourceHandle::new("photo", Box::new(PhotoSource::new(frame))))
            }
            SourceConfig::Camera(camera) => {
                let Some(backend) = self.camera.as_mut() else {
                    warn!("camera requested but no camera backend is installed");
                    return Err(ScanError::DeviceUnavailable(
                        "no camera backend installed".into(),
                    ));
                };
                match backend.open(&camera) {
                    Ok(source) => {
                        info!(facing = ?camera.facing, "camera opened");
                        Ok(SourceHandle::new("camera", source))
                    }
                    Err(err) => {
                        warn!(facing = ?camera.facing, error = %err, "camera open failed");
                        Err(err)
                    }
                }
            }
        }
    }
}

impl Default for Sources {
    fn default() -> Self {
        Self::photo_only()
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources")
            .field("camera", &self.camera.is_some())
            .finish()
    }
}

/// Scoped ownership of an open source.
///
/// The source is closed exactly once: by [`SourceHandle::close`] or, failing
/// that, on drop. After closing, `next_frame` reports end of stream.
pub struct SourceHandle {
    kind: &'static str,
    source: Box<dyn FrameSource>,
    closed: bool,
}

impl SourceHandle {
    pub fn new(kind: &'static str, source: Box<dyn FrameSource>) -> Self {
        Self {
            kind,
            source,
            closed: false,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn paced(&self) -> bool {
        self.source.paced()
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>, ScanError> {
        if self.closed {
            return Ok(None);
        }
        self.source.next_frame()
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.source.close();
        debug!(kind = self.kind, "source closed");
    }
}

impl Drop for SourceHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceHandle")
            .field("kind", &self.kind)
            .field("closed", &self.closed)
            .finish()
    }
}
