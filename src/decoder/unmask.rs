/// Mask removal
use crate::decoder::function_mask::FunctionMask;
use crate::models::{BitMatrix, MaskPattern};

/// XOR the data region with the mask pattern; function modules are untouched
pub fn unmask(matrix: &mut BitMatrix, mask_pattern: MaskPattern, func: &FunctionMask) {
    let size = func.size().min(matrix.width()).min(matrix.height());
    for y in 0..size {
        for x in 0..size {
            if !func.is_function(x, y) && mask_pattern.is_masked(y, x) {
                matrix.toggle(x, y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmask_toggles_data_modules() {
        let mut matrix = BitMatrix::new(21, 21);
        matrix.set(10, 10, true);
        matrix.set(11, 10, false);

        let func = FunctionMask::new(1);
        unmask(&mut matrix, MaskPattern::Pattern0, &func);

        // (i + j) % 2 == 0 flips (10,10) but not (11,10)
        assert!(!matrix.get(10, 10));
        assert!(!matrix.get(11, 10));
    }

    #[test]
    fn test_unmask_skips_function_modules() {
        let mut matrix = BitMatrix::new(21, 21);
        let func = FunctionMask::new(1);
        unmask(&mut matrix, MaskPattern::Pattern1, &func);
        // row 0 is masked by pattern 1 but lies in finder areas at x < 9
        assert!(!matrix.get(0, 0));
        assert!(!matrix.get(6, 10));
        assert!(matrix.get(9, 0));
    }

    #[test]
    fn test_unmask_twice_restores() {
        let func = FunctionMask::new(2);
        let original = BitMatrix::from_fn(25, 25, |x, y| (x * 7 + y * 3) % 5 == 0);
        let mut matrix = original.clone();
        unmask(&mut matrix, MaskPattern::Pattern5, &func);
        unmask(&mut matrix, MaskPattern::Pattern5, &func);
        assert_eq!(matrix, original);
    }
}
