mod deflate_codec;
mod lz4_codec;
mod lz4hc_codec;
mod zstd_codec;

pub use deflate_codec::DeflateCodec;
pub use lz4_codec::{Lz4Codec, LZ4_MAX_INPUT_SIZE};
pub use lz4hc_codec::Lz4HcCodec;
pub use zstd_codec::ZstdCodec;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use subblock_core::format::{ALGORITHM_DEFLATE, ALGORITHM_LZ4, ALGORITHM_LZ4HC, ALGORITHM_ZSTD};
use subblock_core::BlockCodec;

/// Every bundled codec, selectable by ID or name.
///
/// Dispatch is a plain `match`, so an engine built over `Algorithm` needs no
/// trait objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Deflate,
    Lz4,
    Lz4Hc,
    Zstd,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [Algorithm::Deflate, Algorithm::Lz4, Algorithm::Lz4Hc, Algorithm::Zstd];

    /// Resolve an algorithm from its on-disk ID.
    ///
    /// Called when opening an existing container, so the engine can be built
    /// with the right codec automatically.
    pub fn from_id(id: u16) -> anyhow::Result<Self> {
        match id {
            ALGORITHM_DEFLATE => Ok(Algorithm::Deflate),
            ALGORITHM_LZ4 => Ok(Algorithm::Lz4),
            ALGORITHM_LZ4HC => Ok(Algorithm::Lz4Hc),
            ALGORITHM_ZSTD => Ok(Algorithm::Zstd),
            _ => anyhow::bail!(
                "unknown algorithm id {}; supported: 1 (zlib), 2 (lz4), 3 (lz4hc), 4 (zstd)",
                id
            ),
        }
    }
}

impl FromStr for Algorithm {
    type Err = anyhow::Error;

    fn from_str(name: &str) -> anyhow::Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "deflate" | "zlib" | "z" => Ok(Algorithm::Deflate),
            "lz4" | "l" => Ok(Algorithm::Lz4),
            "lz4hc" | "lz4-hc" | "hc" => Ok(Algorithm::Lz4Hc),
            "zstd" | "zs" => Ok(Algorithm::Zstd),
            other => anyhow::bail!(
                "unknown algorithm '{}'. Valid options: deflate, lz4, lz4hc, zstd",
                other
            ),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! dispatch {
    ($self:expr, $codec:ident => $call:expr) => {
        match $self {
            Algorithm::Deflate => {
                let $codec = DeflateCodec;
                $call
            }
            Algorithm::Lz4 => {
                let $codec = Lz4Codec;
                $call
            }
            Algorithm::Lz4Hc => {
                let $codec = Lz4HcCodec;
                $call
            }
            Algorithm::Zstd => {
                let $codec = ZstdCodec;
                $call
            }
        }
    };
}

impl BlockCodec for Algorithm {
    fn id(&self) -> u16 {
        dispatch!(self, c => c.id())
    }

    fn name(&self) -> &'static str {
        dispatch!(self, c => c.name())
    }

    fn min_block_size(&self) -> u64 {
        dispatch!(self, c => c.min_block_size())
    }

    fn max_block_size(&self) -> u64 {
        dispatch!(self, c => c.max_block_size())
    }

    fn default_level(&self) -> i32 {
        dispatch!(self, c => c.default_level())
    }

    fn max_level(&self) -> i32 {
        dispatch!(self, c => c.max_level())
    }

    fn max_compressed_size(&self, raw_size: usize) -> usize {
        dispatch!(self, c => c.max_compressed_size(raw_size))
    }

    fn compress_block(&self, dst: &mut [u8], src: &[u8], level: i32) -> anyhow::Result<usize> {
        dispatch!(self, c => c.compress_block(dst, src, level))
    }

    fn uncompress_block(&self, dst: &mut [u8], src: &[u8]) -> anyhow::Result<usize> {
        dispatch!(self, c => c.uncompress_block(dst, src))
    }
}
