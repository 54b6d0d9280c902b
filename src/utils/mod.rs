//! Image-processing helpers for the decoder:
//! - Grayscale conversion (RGB/RGBA to luminance)
//! - Binarization (Otsu and local-mean adaptive)
//! - Geometry (perspective transforms)

pub mod binarization;
pub mod geometry;
pub mod grayscale;
