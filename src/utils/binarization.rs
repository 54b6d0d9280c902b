/// Grayscale to dark/light separation. `true` in the result means dark.
use crate::models::BitMatrix;
use rayon::prelude::*;

/// Otsu's global threshold: one cut for the whole frame
pub fn otsu_binarize(gray: &[u8], width: usize, height: usize) -> BitMatrix {
    let threshold = calculate_otsu_threshold(gray);
    threshold_binarize(gray, width, height, threshold)
}

/// Otsu's optimal threshold from the intensity histogram
fn calculate_otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total = gray.len() as f64;
    if total == 0.0 {
        return 128;
    }
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut below_count = 0f64;
    let mut below_sum = 0f64;
    let mut max_variance = 0.0;
    let mut optimal_threshold = 128u8;

    // Pixels strictly below `threshold` form the dark class.
    for threshold in 1..=255usize {
        below_count += histogram[threshold - 1] as f64;
        below_sum += (threshold - 1) as f64 * histogram[threshold - 1] as f64;
        let above_count = total - below_count;
        if below_count == 0.0 || above_count == 0.0 {
            continue;
        }

        let mean_below = below_sum / below_count;
        let mean_above = (sum_all - below_sum) / above_count;
        let variance = below_count * above_count * (mean_below - mean_above).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    optimal_threshold
}

/// Fixed global threshold
pub fn threshold_binarize(gray: &[u8], width: usize, height: usize, threshold: u8) -> BitMatrix {
    BitMatrix::from_fn(width, height, |x, y| gray[y * width + x] < threshold)
}

/// Local-mean threshold over a `window`-pixel square, for uneven lighting.
///
/// A pixel is dark when it is noticeably darker than its neighbourhood mean,
/// so flat regions of any brightness come out light.
pub fn adaptive_binarize(gray: &[u8], width: usize, height: usize, window: usize) -> BitMatrix {
    if width == 0 || height == 0 {
        return BitMatrix::new(width, height);
    }
    let integral = integral_image(gray, width, height);
    let stride = width + 1;
    let half = (window.max(3) / 2) as isize;

    let mut flags = vec![0u8; width * height];
    flags
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let y0 = (y as isize - half).max(0) as usize;
            let y1 = ((y as isize + half + 1) as usize).min(height);
            for (x, out) in row.iter_mut().enumerate() {
                let x0 = (x as isize - half).max(0) as usize;
                let x1 = ((x as isize + half + 1) as usize).min(width);
                let area = ((x1 - x0) * (y1 - y0)) as u64;
                let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                    - integral[y0 * stride + x1]
                    - integral[y1 * stride + x0];
                // dark when below ~92% of the local mean
                let pixel = gray[y * width + x] as u64;
                *out = (pixel * area * 256 < sum * 235) as u8;
            }
        });

    BitMatrix::from_fn(width, height, |x, y| flags[y * width + x] != 0)
}

/// Summed-area table with a zero first row and column
fn integral_image(gray: &[u8], width: usize, height: usize) -> Vec<u64> {
    let stride = width + 1;
    let mut integral = vec![0u64; stride * (height + 1)];
    for y in 0..height {
        let mut row_sum = 0u64;
        for x in 0..width {
            row_sum += gray[y * width + x] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }
    integral
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_binarize() {
        let gray = vec![100, 150, 200, 50];
        let binary = threshold_binarize(&gray, 2, 2, 128);

        assert!(binary.get(0, 0));
        assert!(!binary.get(1, 0));
        assert!(!binary.get(0, 1));
        assert!(binary.get(1, 1));
    }

    #[test]
    fn test_otsu_binarize() {
        let mut gray = vec![50u8; 50];
        gray.extend(vec![200u8; 50]);

        let binary = otsu_binarize(&gray, 10, 10);

        assert!(binary.get(0, 0));
        assert!(!binary.get(0, 7));
    }

    #[test]
    fn test_uniform_frames_have_no_dark_pixels_adaptive() {
        for level in [0u8, 90, 255] {
            let gray = vec![level; 40 * 40];
            let binary = adaptive_binarize(&gray, 40, 40, 31);
            assert_eq!(binary.count_ones(), 0, "level {level}");
        }
    }

    #[test]
    fn test_adaptive_handles_gradient_lighting() {
        // Dark square on a background that brightens left to right; the
        // square is darker than any global cut would separate cleanly.
        let (w, h) = (60, 20);
        let mut gray = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let background = 60 + (x * 3) as u8;
                let dark = (40..46).contains(&x) && (7..13).contains(&y);
                gray[y * w + x] = if dark { background / 2 } else { background };
            }
        }
        let binary = adaptive_binarize(&gray, w, h, 15);
        assert!(binary.get(43, 10));
        assert!(!binary.get(5, 10));
        assert!(!binary.get(55, 2));
    }
}
