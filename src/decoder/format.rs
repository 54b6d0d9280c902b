/// Format information: EC level and mask pattern, BCH(15,5) protected
use crate::models::{BitMatrix, ECLevel, MaskPattern};

/// BCH(15,5) generator: x^10 + x^8 + x^5 + x^4 + x^2 + x + 1
const GENERATOR: u32 = 0x537;
/// XOR mask applied to every format word so it is never all zeros
const FORMAT_MASK: u16 = 0x5412;
/// Largest Hamming distance still accepted as a correction
const MAX_DISTANCE: u32 = 3;

/// Decoded format information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub ec_level: ECLevel,
    pub mask_pattern: MaskPattern,
}

impl FormatInfo {
    /// Masked 15-bit word for a 5-bit format payload
    pub fn encode_bits(data: u8) -> u16 {
        let data = (data & 0x1F) as u32;
        let mut rem = data << 10;
        for shift in (10..15).rev() {
            if rem & (1 << shift) != 0 {
                rem ^= GENERATOR << (shift - 10);
            }
        }
        (((data << 10) | rem) as u16) ^ FORMAT_MASK
    }

    /// Masked 15-bit word for this format
    pub fn encode(&self) -> u16 {
        Self::encode_bits((self.ec_level.format_bits() << 3) | self.mask_pattern as u8)
    }

    /// Best match for one or more raw (still masked) 15-bit readings.
    ///
    /// Picks the valid word at minimum Hamming distance over all readings;
    /// `None` when nothing is within three bit errors.
    pub fn decode(readings: &[u16]) -> Option<Self> {
        let mut best: Option<(u32, u8)> = None;
        for data in 0u8..32 {
            let word = Self::encode_bits(data);
            for &raw in readings {
                let distance = (word ^ raw).count_ones();
                if best.is_none_or(|(d, _)| distance < d) {
                    best = Some((distance, data));
                }
            }
        }
        let (distance, data) = best?;
        if distance > MAX_DISTANCE {
            return None;
        }
        Some(Self {
            ec_level: ECLevel::from_format_bits(data >> 3),
            mask_pattern: MaskPattern::from_bits(data & 0x07),
        })
    }

    /// Read both copies from a sampled grid and decode them
    pub fn extract(matrix: &BitMatrix) -> Option<Self> {
        if matrix.width() < 21 || matrix.width() != matrix.height() {
            return None;
        }
        let (first, second) = read_format_copies(matrix);
        Self::decode(&[first, second])
    }
}

/// Both raw format words, most significant bit first
pub fn read_format_copies(matrix: &BitMatrix) -> (u16, u16) {
    let dim = matrix.width();
    let mut first = 0u16;
    let push = |word: &mut u16, x: usize, y: usize| {
        *word = (*word << 1) | matrix.get(x, y) as u16;
    };

    // around the top-left finder
    for x in 0..6 {
        push(&mut first, x, 8);
    }
    push(&mut first, 7, 8);
    push(&mut first, 8, 8);
    push(&mut first, 8, 7);
    for y in (0..6).rev() {
        push(&mut first, 8, y);
    }

    // split between the bottom-left and top-right finders
    let mut second = 0u16;
    for y in ((dim - 7)..dim).rev() {
        push(&mut second, 8, y);
    }
    for x in (dim - 8)..dim {
        push(&mut second, x, 8);
    }

    (first, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_format_words() {
        // M / mask 0 and L / mask 4, from the published format table
        assert_eq!(FormatInfo::encode_bits(0b00_000), 0x5412);
        assert_eq!(FormatInfo::encode_bits(0b01_100), 0x662F);
        assert_eq!(FormatInfo::encode_bits(0b10_101), 0x0255);
    }

    #[test]
    fn test_decode_exact() {
        for data in 0u8..32 {
            let word = FormatInfo::encode_bits(data);
            let info = FormatInfo::decode(&[word]).unwrap();
            assert_eq!(info.ec_level.format_bits(), data >> 3);
            assert_eq!(info.mask_pattern as u8, data & 7);
        }
    }

    #[test]
    fn test_decode_corrects_three_bits() {
        let info = FormatInfo {
            ec_level: ECLevel::Q,
            mask_pattern: MaskPattern::Pattern6,
        };
        let corrupted = info.encode() ^ 0b100_0000_0100_0001;
        assert_eq!(FormatInfo::decode(&[corrupted]), Some(info));
    }

    #[test]
    fn test_second_copy_rescues_first() {
        let info = FormatInfo {
            ec_level: ECLevel::H,
            mask_pattern: MaskPattern::Pattern2,
        };
        let ruined = info.encode() ^ 0b111_1100_0000_0000;
        assert_eq!(FormatInfo::decode(&[ruined, info.encode()]), Some(info));
    }

    #[test]
    fn test_blank_grid_rejected() {
        // all-light reads as 0, at least five bits from every valid word
        let matrix = BitMatrix::new(21, 21);
        assert!(FormatInfo::extract(&matrix).is_none());
    }

    #[test]
    fn test_extract_from_placed_bits() {
        let info = FormatInfo {
            ec_level: ECLevel::L,
            mask_pattern: MaskPattern::Pattern3,
        };
        let word = info.encode();
        let dim = 25;
        let mut matrix = BitMatrix::new(dim, dim);
        let bit = |i: usize| (word >> (14 - i)) & 1 == 1;

        let first: Vec<(usize, usize)> = (0..6)
            .map(|x| (x, 8))
            .chain([(7, 8), (8, 8), (8, 7)])
            .chain((0..6).rev().map(|y| (8, y)))
            .collect();
        for (i, &(x, y)) in first.iter().enumerate() {
            matrix.set(x, y, bit(i));
        }
        let second: Vec<(usize, usize)> = ((dim - 7)..dim)
            .rev()
            .map(|y| (8, y))
            .chain(((dim - 8)..dim).map(|x| (x, 8)))
            .collect();
        for (i, &(x, y)) in second.iter().enumerate() {
            matrix.set(x, y, bit(i));
        }

        assert_eq!(read_format_copies(&matrix), (word, word));
        assert_eq!(FormatInfo::extract(&matrix), Some(info));
    }
}
