/// Fixed per-version tables of the QR symbol format (Model 2)
use crate::models::ECLevel;

/// Block structure for one (version, EC level) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcBlockInfo {
    pub num_blocks: usize,
    pub ecc_per_block: usize,
}

// Index: [ec_level ordinal][version]
const ECC_CODEWORDS_PER_BLOCK: [[u8; 41]; 4] = [
    [
        0, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28,
        30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
    [
        0, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ],
    [
        0, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30,
        30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
    [
        0, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
];

const NUM_ERROR_CORRECTION_BLOCKS: [[u8; 41]; 4] = [
    [
        0, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12, 13,
        14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ],
    [
        0, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ],
    [
        0, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27,
        29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ],
    [
        0, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32,
        35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ],
];

pub fn ec_block_info(version: u8, ec_level: ECLevel) -> Option<EcBlockInfo> {
    if !(1..=40).contains(&version) {
        return None;
    }
    let idx = ec_level.ordinal();
    Some(EcBlockInfo {
        num_blocks: NUM_ERROR_CORRECTION_BLOCKS[idx][version as usize] as usize,
        ecc_per_block: ECC_CODEWORDS_PER_BLOCK[idx][version as usize] as usize,
    })
}

/// Codewords (data + ECC) a symbol of this version carries
pub fn total_codewords(version: u8) -> usize {
    raw_data_modules(version) / 8
}

/// Modules left over for codewords and remainder bits
pub fn raw_data_modules(version: u8) -> usize {
    let v = version as usize;
    let mut modules = (16 * v + 128) * v + 64;
    if v >= 2 {
        let align = v / 7 + 2;
        modules -= (25 * align - 10) * align - 55;
        if v >= 7 {
            modules -= 36;
        }
    }
    modules
}

/// Alignment pattern centre coordinates along one axis, ascending.
///
/// The centres are the cross product of this list with itself, minus the
/// three that collide with finder patterns.
pub fn alignment_pattern_positions(version: u8) -> Vec<usize> {
    if version < 2 {
        return Vec::new();
    }
    let v = version as usize;
    let count = v / 7 + 2;
    let size = 17 + 4 * v;
    let step = if v == 32 {
        26
    } else {
        (v * 4 + count * 2 + 1) / (count * 2 - 2) * 2
    };

    let mut positions = vec![6usize; count];
    let mut pos = size - 7;
    for slot in positions.iter_mut().skip(1).rev() {
        *slot = pos;
        pos = pos.saturating_sub(step);
    }
    positions
}

/// Width of the character-count field for a segment mode indicator
pub fn char_count_bits(mode: u8, version: u8) -> Option<usize> {
    let band = match version {
        1..=9 => 0,
        10..=26 => 1,
        _ => 2,
    };
    let bits = match mode {
        0b0001 => [10, 12, 14],
        0b0010 => [9, 11, 13],
        0b0100 => [8, 16, 16],
        0b1000 => [8, 10, 12],
        _ => return None,
    };
    Some(bits[band])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_info() {
        let info = ec_block_info(1, ECLevel::M).unwrap();
        assert_eq!(info.num_blocks, 1);
        assert_eq!(info.ecc_per_block, 10);

        let info = ec_block_info(5, ECLevel::Q).unwrap();
        assert_eq!(info.num_blocks, 4);
        assert_eq!(info.ecc_per_block, 18);

        assert!(ec_block_info(0, ECLevel::L).is_none());
        assert!(ec_block_info(41, ECLevel::L).is_none());
    }

    #[test]
    fn test_total_codewords() {
        assert_eq!(total_codewords(1), 26);
        assert_eq!(total_codewords(2), 44);
        assert_eq!(total_codewords(7), 196);
        assert_eq!(total_codewords(40), 3706);
    }

    #[test]
    fn test_alignment_positions() {
        assert!(alignment_pattern_positions(1).is_empty());
        assert_eq!(alignment_pattern_positions(2), vec![6, 18]);
        assert_eq!(alignment_pattern_positions(7), vec![6, 22, 38]);
        assert_eq!(alignment_pattern_positions(15), vec![6, 26, 48, 70]);
        assert_eq!(alignment_pattern_positions(32), vec![6, 34, 60, 86, 112, 138]);
        assert_eq!(
            alignment_pattern_positions(40),
            vec![6, 30, 58, 86, 114, 142, 170]
        );
    }

    #[test]
    fn test_char_count_bits() {
        assert_eq!(char_count_bits(0b0001, 1), Some(10));
        assert_eq!(char_count_bits(0b0010, 10), Some(11));
        assert_eq!(char_count_bits(0b0100, 27), Some(16));
        assert_eq!(char_count_bits(0b1000, 40), Some(12));
        assert_eq!(char_count_bits(0b0111, 1), None);
    }
}
