/// Byte mode (0100): eight bits per character
use crate::decoder::bitstream::BitReader;

/// ECI assignment number for UTF-8
pub const ECI_UTF8: u32 = 26;

pub struct ByteDecoder;

impl ByteDecoder {
    pub fn decode(reader: &mut BitReader<'_>, count: usize) -> Option<Vec<u8>> {
        (0..count).map(|_| reader.read_bits(8).map(|b| b as u8)).collect()
    }

    /// Text for a byte segment.
    ///
    /// UTF-8 when declared by ECI or when the bytes happen to be valid UTF-8,
    /// otherwise ISO-8859-1, whose code points equal the byte values.
    pub fn to_text(bytes: &[u8], eci: Option<u32>) -> String {
        if eci == Some(ECI_UTF8) {
            return String::from_utf8_lossy(bytes).into_owned();
        }
        match std::str::from_utf8(bytes) {
            Ok(text) => text.to_owned(),
            Err(_) => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}
