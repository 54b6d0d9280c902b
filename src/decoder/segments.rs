/// Segment parsing: corrected data codewords to payload bytes and text
use crate::decoder::bitstream::BitReader;
use crate::decoder::modes::{
    alphanumeric::AlphanumericDecoder, byte::ByteDecoder, numeric::NumericDecoder,
};
use crate::decoder::tables::char_count_bits;
use tracing::trace;

const MODE_TERMINATOR: u32 = 0b0000;
const MODE_NUMERIC: u32 = 0b0001;
const MODE_ALPHANUMERIC: u32 = 0b0010;
const MODE_STRUCTURED_APPEND: u32 = 0b0011;
const MODE_BYTE: u32 = 0b0100;
const MODE_FNC1_FIRST: u32 = 0b0101;
const MODE_ECI: u32 = 0b0111;
const MODE_KANJI: u32 = 0b1000;
const MODE_FNC1_SECOND: u32 = 0b1001;

/// Decoded payload: raw bytes across all segments plus their text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload {
    pub data: Vec<u8>,
    pub content: String,
}

/// Parse every segment up to the terminator (or the end of the stream).
///
/// Returns `None` for unknown modes, Kanji, truncated segments and
/// out-of-range values; a partially read payload is never returned.
pub fn parse_segments(data_codewords: &[u8], version: u8) -> Option<Payload> {
    let mut reader = BitReader::new(data_codewords);
    let mut payload = Payload::default();
    let mut eci: Option<u32> = None;

    while reader.available() >= 4 {
        let mode = reader.read_bits(4)?;
        match mode {
            MODE_TERMINATOR => break,
            MODE_NUMERIC | MODE_ALPHANUMERIC => {
                let count = reader.read_bits(char_count_bits(mode as u8, version)?)? as usize;
                let text = if mode == MODE_NUMERIC {
                    NumericDecoder::decode(&mut reader, count)?
                } else {
                    AlphanumericDecoder::decode(&mut reader, count)?
                };
                payload.data.extend_from_slice(text.as_bytes());
                payload.content.push_str(&text);
            }
            MODE_BYTE => {
                let count = reader.read_bits(char_count_bits(mode as u8, version)?)? as usize;
                let bytes = ByteDecoder::decode(&mut reader, count)?;
                payload.content.push_str(&ByteDecoder::to_text(&bytes, eci));
                payload.data.extend_from_slice(&bytes);
            }
            MODE_ECI => {
                let designator = read_eci_designator(&mut reader)?;
                trace!(designator, "ECI segment");
                eci = Some(designator);
            }
            MODE_STRUCTURED_APPEND => {
                // symbol index, total and parity; this symbol is decoded alone
                reader.read_bits(16)?;
            }
            MODE_FNC1_FIRST => {}
            MODE_FNC1_SECOND => {
                reader.read_bits(8)?;
            }
            MODE_KANJI => {
                trace!("kanji segment not supported");
                return None;
            }
            _ => {
                trace!(mode, "unknown segment mode");
                return None;
            }
        }
    }

    Some(payload)
}

/// One to three bytes; the leading bits of the first byte give the length
fn read_eci_designator(reader: &mut BitReader<'_>) -> Option<u32> {
    let first = reader.read_bits(8)?;
    if first & 0x80 == 0 {
        Some(first & 0x7F)
    } else if first & 0xC0 == 0x80 {
        Some(((first & 0x3F) << 8) | reader.read_bits(8)?)
    } else if first & 0xE0 == 0xC0 {
        Some(((first & 0x1F) << 16) | reader.read_bits(16)?)
    } else {
        None
    }
}
