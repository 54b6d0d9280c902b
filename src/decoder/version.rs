/// Version information for versions 7-40, BCH(18,6) protected
use crate::models::BitMatrix;

/// BCH(18,6) generator: x^12 + x^11 + x^10 + x^9 + x^8 + x^5 + x^2 + 1
const GENERATOR: u32 = 0x1F25;
const MAX_DISTANCE: u32 = 3;

pub struct VersionInfo;

impl VersionInfo {
    /// 18-bit version word: six version bits followed by twelve check bits
    pub fn encode(version: u8) -> u32 {
        let data = version as u32 & 0x3F;
        let mut rem = data << 12;
        for shift in (12..18).rev() {
            if rem & (1 << shift) != 0 {
                rem ^= GENERATOR << (shift - 12);
            }
        }
        (data << 12) | rem
    }

    /// Nearest version (7..=40) to any reading, within three bit errors
    pub fn decode(readings: &[u32]) -> Option<u8> {
        let mut best: Option<(u32, u8)> = None;
        for version in 7u8..=40 {
            let word = Self::encode(version);
            for &raw in readings {
                let distance = (word ^ raw).count_ones();
                if best.is_none_or(|(d, _)| distance < d) {
                    best = Some((distance, version));
                }
            }
        }
        best.filter(|&(d, _)| d <= MAX_DISTANCE).map(|(_, v)| v)
    }

    /// Version read from the two 6x3 blocks next to the top-right and
    /// bottom-left finders. `None` below 45 modules or when unreadable.
    pub fn extract(matrix: &BitMatrix) -> Option<u8> {
        let dim = matrix.width();
        if dim < 45 || dim != matrix.height() {
            return None;
        }
        let (top_right, bottom_left) = read_version_copies(matrix);
        Self::decode(&[top_right, bottom_left])
    }
}

/// Raw version words, most significant bit first
pub fn read_version_copies(matrix: &BitMatrix) -> (u32, u32) {
    let dim = matrix.width();
    let mut top_right = 0u32;
    for y in (0..6).rev() {
        for x in ((dim - 11)..=(dim - 9)).rev() {
            top_right = (top_right << 1) | matrix.get(x, y) as u32;
        }
    }

    let mut bottom_left = 0u32;
    for x in (0..6).rev() {
        for y in ((dim - 11)..=(dim - 9)).rev() {
            bottom_left = (bottom_left << 1) | matrix.get(x, y) as u32;
        }
    }

    (top_right, bottom_left)
}
