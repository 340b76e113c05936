use subblock_core::format::ALGORITHM_ZSTD;
use subblock_core::BlockCodec;

use crate::lz4_codec::LZ4_MAX_INPUT_SIZE;

/// Zstandard block codec.
///
/// Each subblock is one independent zstd frame compressed at the level chosen
/// by the engine (default: 3).
///
/// Best for: general text, JSON, logs, mixed structured data.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZstdCodec;

impl ZstdCodec {
    pub const MIN_BLOCK_SIZE: u64 = 64;
    pub const MAX_BLOCK_SIZE: u64 = LZ4_MAX_INPUT_SIZE;
    pub const DEFAULT_LEVEL: i32 = 3;
    pub const MAX_LEVEL: i32 = 22;
}

impl BlockCodec for ZstdCodec {
    fn id(&self) -> u16 {
        ALGORITHM_ZSTD
    }

    fn name(&self) -> &'static str {
        "zstd"
    }

    fn min_block_size(&self) -> u64 {
        Self::MIN_BLOCK_SIZE
    }

    fn max_block_size(&self) -> u64 {
        Self::MAX_BLOCK_SIZE
    }

    fn default_level(&self) -> i32 {
        Self::DEFAULT_LEVEL
    }

    fn max_level(&self) -> i32 {
        Self::MAX_LEVEL
    }

    fn max_compressed_size(&self, raw_size: usize) -> usize {
        zstd::zstd_safe::compress_bound(raw_size)
    }

    fn compress_block(&self, dst: &mut [u8], src: &[u8], level: i32) -> anyhow::Result<usize> {
        if src.len() as u64 > Self::MAX_BLOCK_SIZE {
            anyhow::bail!("zstd: invalid input size {}", src.len());
        }
        let level = level.clamp(1, Self::MAX_LEVEL);
        Ok(zstd::bulk::compress_to_buffer(src, dst, level).unwrap_or(0))
    }

    fn uncompress_block(&self, dst: &mut [u8], src: &[u8]) -> anyhow::Result<usize> {
        // The frame carries its own content size; a frame that does not fit
        // in `dst` is reported as a failed decode.
        Ok(zstd::bulk::decompress_to_buffer(src, dst).unwrap_or(0))
    }
}
