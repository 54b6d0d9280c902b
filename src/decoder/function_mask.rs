use crate::decoder::tables::alignment_pattern_positions;
use crate::models::BitMatrix;

/// Function module mask for a specific QR version.
/// true = function module (not data), false = data module.
pub struct FunctionMask {
    mask: BitMatrix,
    version: u8,
}

impl FunctionMask {
    pub fn new(version: u8) -> Self {
        let size = 17 + 4 * version as usize;
        let mut mask = BitMatrix::new(size, size);

        // Finder patterns with separators and format areas
        mask.fill_rect(0, 0, 9, 9);
        mask.fill_rect(size - 8, 0, 8, 9);
        mask.fill_rect(0, size - 8, 9, 8);

        // Timing patterns
        mask.fill_rect(6, 0, 1, size);
        mask.fill_rect(0, 6, size, 1);

        let align = alignment_pattern_positions(version);
        let last = align.len().saturating_sub(1);
        for (ix, &cx) in align.iter().enumerate() {
            for (iy, &cy) in align.iter().enumerate() {
                let on_finder =
                    (ix == 0 && iy == 0) || (ix == 0 && iy == last) || (ix == last && iy == 0);
                if !on_finder {
                    mask.fill_rect(cx - 2, cy - 2, 5, 5);
                }
            }
        }

        // Dark module
        mask.set(8, size - 8, true);

        if version >= 7 {
            mask.fill_rect(size - 11, 0, 3, 6);
            mask.fill_rect(0, size - 11, 6, 3);
        }

        Self { mask, version }
    }

    pub fn size(&self) -> usize {
        self.mask.width()
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn is_function(&self, x: usize, y: usize) -> bool {
        self.mask.get(x, y)
    }

    pub fn data_modules_count(&self) -> usize {
        let size = self.size();
        size * size - self.mask.count_ones()
    }
}

trait FillRect {
    fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize);
}

impl FillRect for BitMatrix {
    fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize) {
        for yy in y..y + height {
            for xx in x..x + width {
                self.set(xx, yy, true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::tables::raw_data_modules;

    #[test]
    fn test_data_module_counts_match_capacity() {
        for version in 1u8..=40 {
            let mask = FunctionMask::new(version);
            assert_eq!(
                mask.data_modules_count(),
                raw_data_modules(version),
                "version {version}"
            );
        }
    }

    #[test]
    fn test_version_blocks_marked() {
        let mask = FunctionMask::new(7);
        let size = mask.size();
        assert!(mask.is_function(size - 11, 5));
        assert!(mask.is_function(size - 9, 0));
        assert!(mask.is_function(5, size - 11));
        assert!(mask.is_function(0, size - 9));
        // just outside the bottom-left block
        assert!(!mask.is_function(6 + 1, size - 11));
        assert!(!mask.is_function(2, size - 12));
    }

    #[test]
    fn test_alignment_and_dark_module() {
        let mask = FunctionMask::new(2);
        assert!(mask.is_function(18, 18));
        assert!(mask.is_function(16, 20));
        assert!(!mask.is_function(15, 15));
        assert!(mask.is_function(8, 17));
    }
}
