use crate::format::{LIST_OVERHEAD, SUBBLOCK_OVERHEAD};

/// One independently compressed-or-stored contiguous run of the original
/// buffer.
///
/// `payload.len() == uncompressed_size` marks a stored subblock (raw bytes);
/// a shorter payload is compressed data that must uncompress to exactly
/// `uncompressed_size` bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subblock {
    pub uncompressed_size: u64,
    pub payload: Vec<u8>,
    /// xxh3-64 of `payload`, or 0 when checksums are disabled.
    pub checksum: u64,
}

impl Subblock {
    #[inline]
    pub fn is_stored(&self) -> bool {
        self.payload.len() as u64 == self.uncompressed_size
    }

    #[inline]
    pub fn is_compressed(&self) -> bool {
        (self.payload.len() as u64) < self.uncompressed_size
    }
}

/// Ordered subblocks representing one buffer. Empty means the buffer was not
/// worth compressing and must be stored verbatim.
pub type SubblockList = Vec<Subblock>;

/// Sum of `uncompressed_size` over `subblocks`, or `None` on overflow.
pub fn total_uncompressed_size(subblocks: &[Subblock]) -> Option<u64> {
    subblocks
        .iter()
        .try_fold(0u64, |acc, s| acc.checked_add(s.uncompressed_size))
}

/// Byte offset of every subblock within the reassembled buffer.
pub fn destination_offsets(subblocks: &[Subblock]) -> Vec<u64> {
    let mut offset = 0u64;
    subblocks
        .iter()
        .map(|s| {
            let at = offset;
            offset += s.uncompressed_size;
            at
        })
        .collect()
}

/// Encoded size of `subblocks` as framed by the container: payloads plus a
/// fixed table entry per subblock plus the subblock count.
pub fn estimated_encoded_size(subblocks: &[Subblock]) -> u64 {
    let payload: u64 = subblocks.iter().map(|s| s.payload.len() as u64).sum();
    payload + subblocks.len() as u64 * SUBBLOCK_OVERHEAD + LIST_OVERHEAD
}
