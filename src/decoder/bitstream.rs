/// Codeword extraction and bit-level reading
use crate::decoder::function_mask::FunctionMask;
use crate::models::BitMatrix;

/// Read the codeword stream from an unmasked grid.
///
/// Column pairs are walked right to left, skipping the vertical timing
/// column, alternating upward and downward; within a pair the right column
/// comes first. Trailing remainder bits that do not fill a byte are dropped.
pub fn read_codewords(matrix: &BitMatrix, func: &FunctionMask) -> Vec<u8> {
    let size = func.size();
    let mut codewords = Vec::with_capacity(size * size / 8);
    let mut current = 0u8;
    let mut filled = 0;

    let mut upward = true;
    let mut right = size as isize - 1;
    while right > 0 {
        if right == 6 {
            right -= 1;
        }
        for step in 0..size {
            let y = if upward { size - 1 - step } else { step };
            for x in [right as usize, right as usize - 1] {
                if func.is_function(x, y) {
                    continue;
                }
                current = (current << 1) | matrix.get(x, y) as u8;
                filled += 1;
                if filled == 8 {
                    codewords.push(current);
                    current = 0;
                    filled = 0;
                }
            }
        }
        upward = !upward;
        right -= 2;
    }

    codewords
}

/// MSB-first reader over a byte slice
pub struct BitReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn available(&self) -> usize {
        (self.bytes.len() * 8).saturating_sub(self.offset)
    }

    /// Read `n` (at most 32) bits; `None` if the stream is shorter
    pub fn read_bits(&mut self, n: usize) -> Option<u32> {
        if n > 32 || n > self.available() {
            return None;
        }
        let mut value = 0u32;
        for _ in 0..n {
            let byte = self.bytes[self.offset / 8];
            let bit = (byte >> (7 - self.offset % 8)) & 1;
            value = (value << 1) | bit as u32;
            self.offset += 1;
        }
        Some(value)
    }
}
