use serde::{Deserialize, Serialize};

use crate::codec::BlockCodec;

/// Upper bound accepted for [`CompressionOptions::max_processors`].
pub const MAX_PROCESSORS: u32 = 1024;

/// Largest item size accepted for byte shuffling.
pub const MAX_ITEM_SIZE: u32 = 128;

/// Caller-supplied configuration for one compress or uncompress call.
///
/// Decompression must use the same `shuffle` and `item_size` values that were
/// used to compress; the other fields only affect how the work is done.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CompressionOptions {
    /// Algorithm-specific level. Zero or negative selects the codec default.
    pub level: i32,
    /// Bytes per subblock. Out-of-range values (including zero) select the
    /// codec's maximum block size.
    pub subblock_size: u64,
    /// Byte-shuffle the whole buffer before splitting.
    pub shuffle: bool,
    /// Element stride for shuffling; 1 disables it.
    pub item_size: u32,
    /// Store an xxh3-64 checksum of every subblock payload.
    pub checksums: bool,
    /// Allow more than one worker thread.
    pub parallel: bool,
    pub max_processors: u32,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            level: 0,
            subblock_size: 0,
            shuffle: true,
            item_size: 1,
            checksums: true,
            parallel: true,
            max_processors: available_processors(),
        }
    }
}

impl CompressionOptions {
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn with_subblock_size(mut self, size: u64) -> Self {
        self.subblock_size = size;
        self
    }

    pub fn with_shuffle(mut self, enable: bool) -> Self {
        self.shuffle = enable;
        self
    }

    pub fn with_item_size(mut self, item_size: u32) -> Self {
        self.item_size = item_size.clamp(1, MAX_ITEM_SIZE);
        self
    }

    pub fn with_checksums(mut self, enable: bool) -> Self {
        self.checksums = enable;
        self
    }

    /// Enable or disable parallel processing. A `max_processors` of zero
    /// keeps the current limit.
    pub fn with_parallel(mut self, enable: bool, max_processors: u32) -> Self {
        self.parallel = enable;
        if max_processors > 0 {
            self.max_processors = max_processors.min(MAX_PROCESSORS);
        }
        self
    }

    /// The level actually passed to the codec.
    pub fn effective_level<C: BlockCodec + ?Sized>(&self, codec: &C) -> i32 {
        if self.level <= 0 {
            codec.default_level()
        } else {
            self.level.clamp(1, codec.max_level().max(1))
        }
    }

    /// The subblock size actually used to split the input.
    pub fn effective_subblock_size<C: BlockCodec + ?Sized>(&self, codec: &C) -> u64 {
        if self.subblock_size < codec.min_block_size() || self.subblock_size > codec.max_block_size() {
            codec.max_block_size()
        } else {
            self.subblock_size
        }
    }

    /// The shuffle stride actually used, clamped to `1..=MAX_ITEM_SIZE`.
    ///
    /// `item_size` is a public field and may arrive unclamped from a struct
    /// literal or a config file; the engines and the container only read it
    /// through here.
    pub fn effective_item_size(&self) -> usize {
        self.item_size.clamp(1, MAX_ITEM_SIZE) as usize
    }

    /// Whether shuffling applies with these options.
    pub fn shuffles(&self) -> bool {
        self.shuffle && self.effective_item_size() > 1
    }
}

fn available_processors() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
        .clamp(1, MAX_PROCESSORS)
}

/// Performance figures for one compress or uncompress call.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceReport {
    /// Relative size reduction, e.g. 0.25 for a 25% reduction. Negative when
    /// the encoded form is larger than the input.
    pub size_reduction: f64,
    /// Processing rate in MiB per second.
    pub throughput_mib_s: f64,
    pub threads_used: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_engine_conventions() {
        let o = CompressionOptions::default();
        assert_eq!(o.level, 0);
        assert_eq!(o.subblock_size, 0);
        assert!(o.shuffle && o.checksums && o.parallel);
        assert_eq!(o.item_size, 1);
        assert!(!o.shuffles());
        assert!(o.max_processors >= 1 && o.max_processors <= MAX_PROCESSORS);
    }

    #[test]
    fn setters_clamp() {
        let o = CompressionOptions::default()
            .with_item_size(0)
            .with_parallel(true, 5000);
        assert_eq!(o.item_size, 1);
        assert_eq!(o.max_processors, MAX_PROCESSORS);

        let o = o.with_item_size(1000).with_parallel(false, 0);
        assert_eq!(o.item_size, MAX_ITEM_SIZE);
        assert!(!o.parallel);
        assert_eq!(o.max_processors, MAX_PROCESSORS);
    }

    #[test]
    fn unclamped_fields_are_clamped_on_use() {
        let o = CompressionOptions {
            item_size: 200,
            ..Default::default()
        };
        assert_eq!(o.effective_item_size(), MAX_ITEM_SIZE as usize);
        assert!(o.shuffles());

        let o = CompressionOptions {
            item_size: 0,
            ..Default::default()
        };
        assert_eq!(o.effective_item_size(), 1);
        assert!(!o.shuffles());
    }
}
