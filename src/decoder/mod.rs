//! QR code decoding modules
//!
//! Everything after a module grid has been sampled from the image:
//! - Format and version information (BCH protected)
//! - Unmasking and zig-zag codeword extraction
//! - Block de-interleaving and Reed-Solomon correction
//! - Segment parsing (numeric, alphanumeric, byte, ECI)

/// Bit-level reading and codeword extraction from the grid
pub mod bitstream;
/// De-interleaving and per-block correction
pub mod blocks;
/// Format information extraction (mask pattern, EC level)
pub mod format;
/// Function module mask builder (finder/timing/format/alignment/version)
pub mod function_mask;
/// Data mode decoders (numeric, alphanumeric, byte)
pub mod modes;
/// Grid-level decoder that wires the stages together
pub mod qr_decoder;
/// Reed-Solomon error correction
pub mod reed_solomon;
/// Segment parsing into payload bytes and text
pub mod segments;
/// Per-version tables (ECC blocks, alignment positions, count widths)
pub mod tables;
/// Mask removal
pub mod unmask;
/// Version information extraction (versions 7-40)
pub mod version;

pub use qr_decoder::{DecodedGrid, QrDecoder};
pub use segments::Payload;
