use std::sync::Arc;

use super::FrameSource;
use crate::error::ScanError;
use crate::models::Frame;
use tracing::debug;

/// Which physical camera to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    /// Front camera, facing the user
    User,
    /// Rear camera, facing the scene
    #[default]
    Environment,
}

impl Facing {
    /// The other camera
    pub fn toggled(self) -> Self {
        match self {
            Facing::User => Facing::Environment,
            Facing::Environment => Facing::User,
        }
    }
}

/// Camera request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CameraConfig {
    pub facing: Facing,
    /// Preferred capture size (width, height); the backend picks when `None`
    pub resolution: Option<(u32, u32)>,
}

impl CameraConfig {
    pub fn new(facing: Facing) -> Self {
        Self {
            facing,
            resolution: None,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Some((width, height));
        self
    }

    /// Same request on the other camera
    pub fn toggled(self) -> Self {
        Self {
            facing: self.facing.toggled(),
            ..self
        }
    }
}

/// Platform camera access.
///
/// `open` acquires the device exclusively; the returned source releases it
/// in `close`. Refusals are reported as `PermissionDenied` or
/// `DeviceUnavailable`.
pub trait CameraBackend: Send {
    fn open(&mut self, config: &CameraConfig) -> Result<Box<dyn FrameSource>, ScanError>;
}

/// Camera backend that plays a fixed list of frames as a live stream.
///
/// Every open starts from the first frame. Frames are restamped with a
/// fresh capture time and a per-stream sequence number.
#[derive(Debug, Clone)]
pub struct ReplayCamera {
    frames: Arc<[Frame]>,
    looping: bool,
}

impl ReplayCamera {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            looping: false,
        }
    }

    /// Restart from the first frame instead of ending the stream
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }
}

impl CameraBackend for ReplayCamera {
    fn open(&mut self, config: &CameraConfig) -> Result<Box<dyn FrameSource>, ScanError> {
        if self.frames.is_empty() {
            return Err(ScanError::DeviceUnavailable("no frames to replay".into()));
        }
        debug!(
            facing = ?config.facing,
            frames = self.frames.len(),
            looping = self.looping,
            "replay camera opened"
        );
        Ok(Box::new(ReplayStream {
            frames: Arc::clone(&self.frames),
            looping: self.looping,
            next: 0,
            sequence: 0,
            closed: false,
        }))
    }
}

struct ReplayStream {
    frames: Arc<[Frame]>,
    looping: bool,
    next: usize,
    sequence: u64,
    closed: bool,
}

impl FrameSource for ReplayStream {
    fn next_frame(&mut self) -> Result<Option<Frame>, ScanError> {
        if self.closed {
            return Ok(None);
        }
        if self.next >= self.frames.len() {
            if !self.looping {
                return Ok(None);
            }
            self.next = 0;
        }
        let frame = self.frames[self.next].recaptured(self.sequence);
        self.next += 1;
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
