//! Synthetic QR frames for integration tests and benchmarks

#![allow(dead_code)]

use qr_scan::utils::geometry::PerspectiveTransform;
use qr_scan::{Frame, Point};

/// Quiet zone around rendered codes, in modules
pub const QUIET_ZONE: usize = 4;

/// Module grid of `data` as produced by a reference encoder
pub fn encode(data: &str, ec: qrcode::EcLevel) -> (Vec<bool>, usize) {
    let code = qrcode::QrCode::with_error_correction_level(data.as_bytes(), ec)
        .expect("payload fits in a QR code");
    let width = code.width();
    let dark = code
        .to_colors()
        .into_iter()
        .map(|c| c == qrcode::Color::Dark)
        .collect();
    (dark, width)
}

/// Luma image of `size` x `size` pixels with the code (plus quiet zone)
/// centred at the largest whole-pixel module size that fits
pub fn render(data: &str, ec: qrcode::EcLevel, size: usize) -> Vec<u8> {
    let (modules, width) = encode(data, ec);
    let total = width + 2 * QUIET_ZONE;
    let scale = (size / total).max(1);
    let offset = (size.saturating_sub(total * scale)) / 2 + QUIET_ZONE * scale;

    let mut pixels = vec![255u8; size * size];
    for my in 0..width {
        for mx in 0..width {
            if !modules[my * width + mx] {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    let (x, y) = (offset + mx * scale + dx, offset + my * scale + dy);
                    if x < size && y < size {
                        pixels[y * size + x] = 0;
                    }
                }
            }
        }
    }
    pixels
}

/// Frame wrapping a square luma image
pub fn frame(pixels: Vec<u8>, size: usize) -> Frame {
    Frame::from_luma(size, size, pixels).expect("square luma buffer")
}

/// Rendered code as a frame
pub fn code_frame(data: &str, size: usize) -> Frame {
    frame(render(data, qrcode::EcLevel::M, size), size)
}

/// Place a square image onto an `out` x `out` white canvas, rotated by
/// `degrees` about its centre and tilted: the right edge is shortened by the
/// `tilt` fraction as if turned away from the camera.
pub fn warp(src: &[u8], size: usize, out: usize, degrees: f32, tilt: f32) -> Vec<u8> {
    let s = size as f32;
    let half = s / 2.0;
    let shrink = half * tilt;
    // corners relative to the centre: tl, tr, bl, br
    let placed = [
        (-half, -half),
        (half, -half + shrink),
        (-half, half),
        (half, half - shrink),
    ];
    let (sin, cos) = degrees.to_radians().sin_cos();
    let c = out as f32 / 2.0;
    let dst = placed.map(|(x, y)| Point::new(c + x * cos - y * sin, c + x * sin + y * cos));
    let src_corners = [
        Point::new(0.0, 0.0),
        Point::new(s, 0.0),
        Point::new(0.0, s),
        Point::new(s, s),
    ];
    let back = PerspectiveTransform::from_points(&dst, &src_corners).expect("non-degenerate quad");

    let mut pixels = vec![255u8; out * out];
    for y in 0..out {
        for x in 0..out {
            let p = back.transform(&Point::new(x as f32 + 0.5, y as f32 + 0.5));
            if !p.is_finite() || p.x < 0.0 || p.y < 0.0 || p.x >= s || p.y >= s {
                continue;
            }
            pixels[y * out + x] = src[p.y as usize * size + p.x as usize];
        }
    }
    pixels
}

/// Deterministic xorshift noise
pub fn noise(size: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..size * size)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}
