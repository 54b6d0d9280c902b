/// Module grid to payload: format, unmask, codewords, correction, segments
use crate::decoder::bitstream::read_codewords;
use crate::decoder::blocks::deinterleave_and_correct;
use crate::decoder::format::FormatInfo;
use crate::decoder::function_mask::FunctionMask;
use crate::decoder::segments::{Payload, parse_segments};
use crate::decoder::unmask::unmask;
use crate::decoder::version::VersionInfo;
use crate::models::{BitMatrix, ECLevel, MaskPattern, Version};
use tracing::trace;

/// A successfully decoded module grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedGrid {
    pub payload: Payload,
    pub version: Version,
    pub ec_level: ECLevel,
    pub mask_pattern: MaskPattern,
    /// The grid was read transposed (code seen from behind or mis-ordered corners)
    pub mirrored: bool,
}

pub struct QrDecoder;

impl QrDecoder {
    /// Decode a sampled square grid, trying the transposed grid second.
    pub fn decode_grid(grid: &BitMatrix) -> Option<DecodedGrid> {
        let version = Version::from_dimension(grid.width())?;
        if grid.height() != grid.width() {
            return None;
        }

        if let Some(decoded) = Self::decode_oriented(grid, version) {
            return Some(DecodedGrid {
                mirrored: false,
                ..decoded
            });
        }

        trace!(version = version.number(), "trying mirrored grid");
        let mirrored = grid.transposed();
        Self::decode_oriented(&mirrored, version).map(|decoded| DecodedGrid {
            mirrored: true,
            ..decoded
        })
    }

    /// Version recorded in the symbol itself, for grids of 45+ modules
    pub fn read_version(grid: &BitMatrix) -> Option<u8> {
        VersionInfo::extract(grid).or_else(|| VersionInfo::extract(&grid.transposed()))
    }

    fn decode_oriented(grid: &BitMatrix, version: Version) -> Option<DecodedGrid> {
        let format = FormatInfo::extract(grid)?;
        let number = version.number();
        if number >= 7 {
            // a readable version block that disagrees means the grid is wrong
            if let Some(recorded) = VersionInfo::extract(grid) {
                if recorded != number {
                    trace!(recorded, estimated = number, "version mismatch");
                    return None;
                }
            }
        }

        let func = FunctionMask::new(number);
        let mut unmasked = grid.clone();
        unmask(&mut unmasked, format.mask_pattern, &func);

        let codewords = read_codewords(&unmasked, &func);
        let data = deinterleave_and_correct(&codewords, number, format.ec_level)?;
        let payload = parse_segments(&data, number)?;

        Some(DecodedGrid {
            payload,
            version,
            ec_level: format.ec_level,
            mask_pattern: format.mask_pattern,
            mirrored: false,
        })
    }
}
