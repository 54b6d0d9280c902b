/// Colour to luminance conversion
///
/// Y = 0.299*R + 0.587*G + 0.114*B, computed with integer weights:
/// Y = (76*R + 150*G + 29*B) >> 8. Rows are converted in parallel.
use rayon::prelude::*;

const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Below this many pixels the rayon split costs more than it saves
const PARALLEL_MIN_PIXELS: usize = 64 * 64;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8) as u8
}

fn convert(src: &[u8], channels: usize, width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 || height == 0 {
        return gray;
    }
    let row_in = width * channels;
    let convert_row = |(row, out): (usize, &mut [u8])| {
        let line = &src[row * row_in..(row + 1) * row_in];
        for (dst, px) in out.iter_mut().zip(line.chunks_exact(channels)) {
            *dst = luma(px[0], px[1], px[2]);
        }
    };

    if width * height >= PARALLEL_MIN_PIXELS {
        gray.par_chunks_mut(width).enumerate().for_each(convert_row);
    } else {
        gray.chunks_mut(width).enumerate().for_each(convert_row);
    }
    gray
}

/// Convert packed RGB bytes to grayscale
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    convert(rgb, 3, width, height)
}

/// Convert packed RGBA bytes to grayscale (alpha ignored)
pub fn rgba_to_grayscale(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    convert(rgba, 4, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primaries() {
        let rgb = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let gray = rgb_to_grayscale(&rgb, 4, 1);
        assert_eq!(gray, vec![75, 149, 28, 254]);
    }

    #[test]
    fn test_rgba_ignores_alpha() {
        let rgba = vec![10, 20, 30, 0, 10, 20, 30, 255];
        let gray = rgba_to_grayscale(&rgba, 2, 1);
        assert_eq!(gray[0], gray[1]);
    }

    #[test]
    fn test_parallel_matches_serial_rows() {
        let (w, h) = (130, 70);
        let rgb: Vec<u8> = (0..w * h * 3).map(|i| (i * 7 % 251) as u8).collect();
        let gray = rgb_to_grayscale(&rgb, w, h);
        for (i, px) in rgb.chunks_exact(3).enumerate() {
            assert_eq!(gray[i], luma(px[0], px[1], px[2]));
        }
    }
}
