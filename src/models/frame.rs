//! Still image handed from a frame source to the decoder

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{FrameError, ScanError};
use crate::utils::grayscale::{rgb_to_grayscale, rgba_to_grayscale};

/// Layout of the sample buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One intensity byte per pixel
    Luma8,
    /// Three bytes per pixel
    Rgb8,
    /// Four bytes per pixel, alpha ignored
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Luma8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PixelFormat::Luma8 => "luma8",
            PixelFormat::Rgb8 => "rgb8",
            PixelFormat::Rgba8 => "rgba8",
        }
    }
}

/// One captured image. Immutable; cloning shares the sample buffer.
#[derive(Debug, Clone)]
pub struct Frame {
    width: usize,
    height: usize,
    format: PixelFormat,
    samples: Arc<[u8]>,
    captured_at: Instant,
    sequence: u64,
}

impl Frame {
    /// Wrap a sample buffer, checking that its length matches the geometry
    pub fn new(
        width: usize,
        height: usize,
        format: PixelFormat,
        samples: impl Into<Arc<[u8]>>,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty { width, height });
        }
        let samples = samples.into();
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(format.channels()))
            .ok_or(FrameError::TooLarge {
                width,
                height,
                format: format.name(),
            })?;
        if samples.len() != expected {
            return Err(FrameError::LengthMismatch {
                width,
                height,
                format: format.name(),
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            samples,
            captured_at: Instant::now(),
            sequence: 0,
        })
    }

    /// Grayscale frame
    pub fn from_luma(width: usize, height: usize, samples: Vec<u8>) -> Result<Self, FrameError> {
        Self::new(width, height, PixelFormat::Luma8, samples)
    }

    /// Frame from a decoded image (kept as RGBA)
    pub fn from_image(image: &image::DynamicImage) -> Result<Self, FrameError> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(
            width as usize,
            height as usize,
            PixelFormat::Rgba8,
            rgba.into_raw(),
        )
    }

    /// Load a photo from disk (any format the `image` crate reads)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let image = image::open(path)?;
        Ok(Self::from_image(&image)?)
    }

    /// Decode a photo from encoded bytes (PNG, JPEG, ...)
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, ScanError> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_image(&image)?)
    }

    /// Same pixels, new capture time and sequence number
    pub fn recaptured(&self, sequence: u64) -> Self {
        Self {
            captured_at: Instant::now(),
            sequence,
            ..self.clone()
        }
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Sample layout
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw sample buffer
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// When the frame was captured
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Position of the frame in its source's stream
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Single-channel intensity map; borrows when already grayscale
    pub fn to_luma(&self) -> Cow<'_, [u8]> {
        match self.format {
            PixelFormat::Luma8 => Cow::Borrowed(&self.samples),
            PixelFormat::Rgb8 => Cow::Owned(rgb_to_grayscale(&self.samples, self.width, self.height)),
            PixelFormat::Rgba8 => {
                Cow::Owned(rgba_to_grayscale(&self.samples, self.width, self.height))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_is_validated() {
        assert!(Frame::new(2, 2, PixelFormat::Rgba8, vec![0u8; 16]).is_ok());
        let err = Frame::new(2, 2, PixelFormat::Rgb8, vec![0u8; 16]).unwrap_err();
        assert!(matches!(err, FrameError::LengthMismatch { expected: 12, .. }));
        assert!(matches!(
            Frame::from_luma(0, 5, Vec::new()),
            Err(FrameError::Empty { .. })
        ));
    }

    #[test]
    fn test_oversized_geometry_rejected() {
        let err = Frame::new(usize::MAX / 2, 3, PixelFormat::Rgba8, vec![0u8; 4]).unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { height: 3, .. }));
        assert!(matches!(
            Frame::from_luma(usize::MAX, usize::MAX, vec![0]),
            Err(FrameError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_luma_borrows_grayscale() {
        let frame = Frame::from_luma(2, 1, vec![10, 200]).unwrap();
        assert!(matches!(frame.to_luma(), Cow::Borrowed(_)));
        assert_eq!(&*frame.to_luma(), &[10, 200]);
    }

    #[test]
    fn test_rgba_to_luma() {
        let frame = Frame::new(2, 1, PixelFormat::Rgba8, vec![0, 0, 0, 255, 255, 255, 255, 255])
            .unwrap();
        let luma = frame.to_luma();
        assert_eq!(luma[0], 0);
        assert!(luma[1] >= 254);
    }

    #[test]
    fn test_recaptured_shares_pixels() {
        let frame = Frame::from_luma(1, 1, vec![7]).unwrap();
        let again = frame.recaptured(9);
        assert_eq!(again.sequence(), 9);
        assert_eq!(again.samples(), frame.samples());
    }
}
