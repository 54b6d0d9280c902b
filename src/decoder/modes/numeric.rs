/// Numeric mode (0001): three digits per 10 bits, remainder in 7 or 4 bits
use crate::decoder::bitstream::BitReader;

pub struct NumericDecoder;

impl NumericDecoder {
    /// Decode `count` digits; `None` on truncation or a group out of range
    pub fn decode(reader: &mut BitReader<'_>, count: usize) -> Option<String> {
        let mut result = String::with_capacity(count);
        let mut remaining = count;

        while remaining > 0 {
            let group = remaining.min(3);
            let (bits, limit) = match group {
                3 => (10, 1000),
                2 => (7, 100),
                _ => (4, 10),
            };
            let value = reader.read_bits(bits)?;
            if value >= limit {
                return None;
            }
            result.push_str(&format!("{value:0width$}", width = group));
            remaining -= group;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_groups() {
        // "01234567": 012 | 345 | 67
        // 0000001100 0101011001 1000011 (padded)
        let bytes = [0b0000_0011, 0b0001_0101, 0b1001_1000, 0b0110_0000];
        let mut reader = BitReader::new(&bytes);
        assert_eq!(
            NumericDecoder::decode(&mut reader, 8).as_deref(),
            Some("01234567")
        );
    }

    #[test]
    fn test_numeric_rejects_out_of_range_group() {
        // 1111111111 = 1023 is not a three-digit group
        let bytes = [0xFF, 0xC0];
        let mut reader = BitReader::new(&bytes);
        assert_eq!(NumericDecoder::decode(&mut reader, 3), None);
    }

    #[test]
    fn test_numeric_truncated() {
        let mut reader = BitReader::new(&[0x00]);
        assert_eq!(NumericDecoder::decode(&mut reader, 3), None);
    }
}
