use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use subblock_core::format::ALGORITHM_DEFLATE;
use subblock_core::BlockCodec;

/// Zlib/deflate block codec.
///
/// Each subblock becomes one complete zlib stream (header, deflate data,
/// Adler-32 trailer), so any subblock can be decoded on its own.
///
/// Best for: general data where ratio matters more than decode speed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateCodec;

impl DeflateCodec {
    pub const MIN_BLOCK_SIZE: u64 = 64;
    /// Zlib counts stream lengths in 32 bits.
    pub const MAX_BLOCK_SIZE: u64 = u32::MAX as u64 - 1;
    pub const DEFAULT_LEVEL: i32 = 6;
    pub const MAX_LEVEL: i32 = 9;
}

impl BlockCodec for DeflateCodec {
    fn id(&self) -> u16 {
        ALGORITHM_DEFLATE
    }

    fn name(&self) -> &'static str {
        "zlib"
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
        // zlib's compressBound()
        raw_size + (raw_size >> 12) + (raw_size >> 14) + (raw_size >> 25) + 13
    }

    fn compress_block(&self, dst: &mut [u8], src: &[u8], level: i32) -> anyhow::Result<usize> {
        if src.len() as u64 > Self::MAX_BLOCK_SIZE {
            anyhow::bail!("deflate: invalid input size {}", src.len());
        }
        let level = level.clamp(1, Self::MAX_LEVEL) as u32;
        let mut stream = Compress::new(Compression::new(level), true);
        match stream.compress(src, dst, FlushCompress::Finish) {
            Ok(Status::StreamEnd) => Ok(stream.total_out() as usize),
            // Output did not fit: not compressible within the bound.
            Ok(_) | Err(_) => Ok(0),
        }
    }

    fn uncompress_block(&self, dst: &mut [u8], src: &[u8]) -> anyhow::Result<usize> {
        if dst.len() as u64 > Self::MAX_BLOCK_SIZE {
            anyhow::bail!("deflate: invalid output size {}", dst.len());
        }
        let mut stream = Decompress::new(true);
        match stream.decompress(src, dst, FlushDecompress::Finish) {
            Ok(Status::StreamEnd) => Ok(stream.total_out() as usize),
            Ok(_) | Err(_) => Ok(0),
        }
    }
}
