use lz4_flex::block::{compress_into, decompress_into, get_maximum_output_size};
use subblock_core::format::ALGORITHM_LZ4;
use subblock_core::BlockCodec;

/// Largest input the LZ4 block format accepts (`LZ4_MAX_INPUT_SIZE`).
pub const LZ4_MAX_INPUT_SIZE: u64 = 0x7E00_0000;

/// LZ4 block codec, fast mode.
///
/// Fastest decompression of all bundled codecs. `lz4_flex` has a single
/// compression speed, so levels are accepted but do not change the output.
///
/// Best for: hot data, low-latency workloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl Lz4Codec {
    pub const MIN_BLOCK_SIZE: u64 = 64;
    pub const DEFAULT_LEVEL: i32 = 64;
    pub const MAX_LEVEL: i32 = 64;
}

impl BlockCodec for Lz4Codec {
    fn id(&self) -> u16 {
        ALGORITHM_LZ4
    }

    fn name(&self) -> &'static str {
        "lz4"
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
        get_maximum_output_size(raw_size)
    }

    fn compress_block(&self, dst: &mut [u8], src: &[u8], _level: i32) -> anyhow::Result<usize> {
        if src.len() as u64 > LZ4_MAX_INPUT_SIZE {
            anyhow::bail!("lz4: invalid input size {}", src.len());
        }
        Ok(compress_into(src, dst).unwrap_or(0))
    }

    fn uncompress_block(&self, dst: &mut [u8], src: &[u8]) -> anyhow::Result<usize> {
        uncompress_lz4_block(dst, src)
    }
}

/// Decode one raw LZ4 block. Shared with [`Lz4HcCodec`](crate::Lz4HcCodec):
/// high-compression output is plain LZ4 block data.
pub(crate) fn uncompress_lz4_block(dst: &mut [u8], src: &[u8]) -> anyhow::Result<usize> {
    if src.len() > i32::MAX as usize || dst.len() > i32::MAX as usize {
        anyhow::bail!("lz4: invalid buffer size (input {}, output {})", src.len(), dst.len());
    }
    Ok(decompress_into(src, dst).unwrap_or(0))
}
