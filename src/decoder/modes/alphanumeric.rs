/// Alphanumeric mode (0010): 0-9, A-Z, space, $%*+-./:
use crate::decoder::bitstream::BitReader;

const ALPHANUMERIC_TABLE: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Pairs take 11 bits (45 * a + b), a trailing single takes 6
pub struct AlphanumericDecoder;

impl AlphanumericDecoder {
    pub fn decode(reader: &mut BitReader<'_>, count: usize) -> Option<String> {
        let mut result = String::with_capacity(count);
        let mut remaining = count;

        while remaining >= 2 {
            let value = reader.read_bits(11)? as usize;
            if value >= 45 * 45 {
                return None;
            }
            result.push(ALPHANUMERIC_TABLE[value / 45] as char);
            result.push(ALPHANUMERIC_TABLE[value % 45] as char);
            remaining -= 2;
        }
        if remaining == 1 {
            let value = reader.read_bits(6)? as usize;
            result.push(*ALPHANUMERIC_TABLE.get(value)? as char);
        }

        Some(result)
    }
}
