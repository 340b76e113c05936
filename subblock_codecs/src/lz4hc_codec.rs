use lz4::block::{compress_to_buffer, CompressionMode};
use lz4_flex::block::get_maximum_output_size;
use subblock_core::format::ALGORITHM_LZ4HC;
use subblock_core::BlockCodec;

use crate::lz4_codec::{uncompress_lz4_block, LZ4_MAX_INPUT_SIZE};

/// LZ4 high-compression block codec.
///
/// Slower to compress than [`Lz4Codec`](crate::Lz4Codec) but produces smaller
/// blocks in the same format, so decoding is just as fast.
///
/// Best for: write-once, read-many data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4HcCodec;

impl Lz4HcCodec {
    pub const MIN_BLOCK_SIZE: u64 = 64;
    pub const DEFAULT_LEVEL: i32 = 9;
    pub const MAX_LEVEL: i32 = 16;
}

impl BlockCodec for Lz4HcCodec {
    fn id(&self) -> u16 {
        ALGORITHM_LZ4HC
    }

    fn name(&self) -> &'static str {
        "lz4hc"
    }

    fn min_block_size(&self) -> u64 {
        Self::MIN_BLOCK_SIZE
    }

    fn max_block_size(&self) -> u64 {
        LZ4_MAX_INPUT_SIZE
    }

    fn default_level(&self) -> i32 {
        Self::DEFAULT_LEVEL
    }

    fn max_level(&self) -> i32 {
        Self::MAX_LEVEL
    }

    fn max_compressed_size(&self, raw_size: usize) -> usize {
        // Larger than LZ4_compressBound() for every input length.
        get_maximum_output_size(raw_size)
    }

    fn compress_block(&self, dst: &mut [u8], src: &[u8], level: i32) -> anyhow::Result<usize> {
        if src.len() as u64 > LZ4_MAX_INPUT_SIZE {
            anyhow::bail!("lz4hc: invalid input size {}", src.len());
        }
        let mode = CompressionMode::HIGHCOMPRESSION(level.clamp(1, Self::MAX_LEVEL));
        Ok(compress_to_buffer(src, Some(mode), false, dst).unwrap_or(0))
    }

    fn uncompress_block(&self, dst: &mut [u8], src: &[u8]) -> anyhow::Result<usize> {
        uncompress_lz4_block(dst, src)
    }
}
