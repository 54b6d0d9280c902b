/// Block de-interleaving and per-block error correction
use crate::decoder::reed_solomon::ReedSolomonDecoder;
use crate::decoder::tables::{ec_block_info, total_codewords};
use crate::models::ECLevel;
use tracing::trace;

/// Split the interleaved codeword stream into blocks, correct each one and
/// return the concatenated data codewords.
///
/// Data codewords are interleaved column-wise across blocks (short blocks
/// first, long blocks carry one extra trailing codeword), followed by the
/// ECC codewords interleaved the same way.
pub fn deinterleave_and_correct(
    codewords: &[u8],
    version: u8,
    ec_level: ECLevel,
) -> Option<Vec<u8>> {
    let info = ec_block_info(version, ec_level)?;
    let total = total_codewords(version);
    if codewords.len() < total {
        return None;
    }
    let ecc_total = info.num_blocks * info.ecc_per_block;
    let data_total = total.checked_sub(ecc_total)?;

    let num_long_blocks = data_total % info.num_blocks;
    let num_short_blocks = info.num_blocks - num_long_blocks;
    let short_len = data_total / info.num_blocks;
    let data_len = |b: usize| short_len + (b >= num_short_blocks) as usize;

    let mut blocks: Vec<Vec<u8>> = (0..info.num_blocks)
        .map(|b| Vec::with_capacity(data_len(b) + info.ecc_per_block))
        .collect();

    let mut stream = codewords[..total].iter().copied();
    for i in 0..=short_len {
        for (b, block) in blocks.iter_mut().enumerate() {
            if i < data_len(b) {
                block.push(stream.next()?);
            }
        }
    }
    for _ in 0..info.ecc_per_block {
        for block in blocks.iter_mut() {
            block.push(stream.next()?);
        }
    }

    let rs = ReedSolomonDecoder::new(info.ecc_per_block);
    let mut data_out = Vec::with_capacity(data_total);
    for (b, block) in blocks.iter_mut().enumerate() {
        match rs.decode(block) {
            Ok(0) => {}
            Ok(fixed) => trace!(block = b, fixed, "corrected codewords"),
            Err(err) => {
                trace!(block = b, %err, "block uncorrectable");
                return None;
            }
        }
        data_out.extend_from_slice(&block[..data_len(b)]);
    }

    Some(data_out)
}
