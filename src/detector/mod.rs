//! QR code detection modules
//!
//! Locating a code in a frame and sampling its module grid:
//! - Finder pattern detection (the three square markers)
//! - Alignment pattern search (versions 2+)
//! - Perspective-corrected grid sampling
//!
//! [`Detector`] ties these to binarization and the grid decoder.

/// Alignment pattern search for QR versions 2+
pub mod alignment;
/// Finder pattern detection using 1:1:3:1:1 ratio scanning
pub mod finder;
/// Module grid sampling through a perspective transform
pub mod grid;

use crate::config::DetectorConfig;
use crate::models::{BitMatrix, Frame, QRCode};
use crate::pipeline::decode_groups;
use crate::utils::binarization::{adaptive_binarize, otsu_binarize};
use finder::FinderDetector;
use tracing::{debug, trace};

/// Frames at least this wide or tall are binarized adaptively first
const LARGE_FRAME: usize = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binarizer {
    Otsu,
    Adaptive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    DarkOnLight,
    LightOnDark,
}

/// Single-frame QR detector and decoder.
///
/// Stateless apart from its configuration: decoding the same frame twice
/// gives the same answer.
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectorConfig,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(DetectorConfig::shared())
    }
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// First code found in the frame
    pub fn detect(&self, frame: &Frame) -> Option<QRCode> {
        let gray = frame.to_luma();
        self.detect_luma(&gray, frame.width(), frame.height())
    }

    /// First code found in a row-major 8-bit luma buffer
    pub fn detect_luma(&self, gray: &[u8], width: usize, height: usize) -> Option<QRCode> {
        if width < 21 || height < 21 || gray.len() < width * height {
            return None;
        }

        // Otsu first on small frames, adaptive first on large ones; the
        // other is the fallback
        let order = if width >= LARGE_FRAME || height >= LARGE_FRAME {
            [Binarizer::Adaptive, Binarizer::Otsu]
        } else {
            [Binarizer::Otsu, Binarizer::Adaptive]
        };

        let mut polarities = vec![Polarity::DarkOnLight];
        if self.config.try_inverted {
            polarities.push(Polarity::LightOnDark);
        }

        for polarity in polarities {
            let inverted: Vec<u8>;
            let luma = match polarity {
                Polarity::DarkOnLight => gray,
                Polarity::LightOnDark => {
                    inverted = gray.iter().map(|&p| 255 - p).collect();
                    &inverted
                }
            };

            for binarizer in order {
                let binary = self.binarize(binarizer, luma, width, height);
                let finders =
                    FinderDetector::detect_with_limit(&binary, self.config.max_finder_candidates);
                if finders.len() < 3 {
                    debug!(
                        ?binarizer,
                        ?polarity,
                        found = finders.len(),
                        "too few finder candidates"
                    );
                    continue;
                }
                if let Some(code) = decode_groups(&binary, &finders, self.config.max_groups) {
                    debug!(?binarizer, ?polarity, version = code.version.number(), "decoded");
                    return Some(code);
                }
                trace!(?binarizer, ?polarity, "no group decoded");
            }
        }

        None
    }

    fn binarize(
        &self,
        binarizer: Binarizer,
        gray: &[u8],
        width: usize,
        height: usize,
    ) -> BitMatrix {
        match binarizer {
            Binarizer::Otsu => otsu_binarize(gray, width, height),
            Binarizer::Adaptive => {
                adaptive_binarize(gray, width, height, self.config.adaptive_window)
            }
        }
    }
}
