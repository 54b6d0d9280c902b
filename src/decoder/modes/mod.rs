//! Segment payload decoders, one per data mode:
//! - Numeric: digits 0-9 in groups of three
//! - Alphanumeric: 45-character set in pairs
//! - Byte: raw 8-bit data

pub mod alphanumeric;
pub mod byte;
pub mod numeric;
