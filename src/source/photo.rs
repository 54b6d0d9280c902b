use super::FrameSource;
use crate::error::ScanError;
use crate::models::Frame;

/// One user-supplied still: a single frame, then end of stream
#[derive(Debug)]
pub struct PhotoSource {
    frame: Option<Frame>,
}

impl PhotoSource {
    pub fn new(frame: Frame) -> Self {
        Self { frame: Some(frame) }
    }
}

impl FrameSource for PhotoSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, ScanError> {
        Ok(self.frame.take())
    }

    fn close(&mut self) {
        self.frame = None;
    }

    fn paced(&self) -> bool {
        false
    }
}
