/// Capability contract implemented by every block compression algorithm.
///
/// The engine never looks inside a codec: it only asks for block-size and
/// level bounds, sizes scratch buffers with [`max_compressed_size`], and calls
/// the two primitives on independent, contiguous byte ranges.
///
/// Both primitives follow the same convention:
/// - `Ok(n)` with `n > 0` is the number of bytes written at the start of `dst`.
/// - `Ok(0)` means "could not compress / uncompress". This is not an error for
///   compression (the engine falls back to a stored subblock).
/// - `Err(_)` is an algorithm fault such as an unsupported input length.
///
/// Implementations must never report success for partially valid output.
///
/// [`max_compressed_size`]: BlockCodec::max_compressed_size
pub trait BlockCodec: Send + Sync {
    /// Stable algorithm ID stored in the container header.
    fn id(&self) -> u16;

    /// Human-readable algorithm name, used as the prefix of every error.
    fn name(&self) -> &'static str;

    /// Smallest subblock, in bytes, this algorithm will attempt to compress.
    fn min_block_size(&self) -> u64;

    /// Largest contiguous block, in bytes, this algorithm can compress.
    fn max_block_size(&self) -> u64;

    fn default_level(&self) -> i32;

    fn max_level(&self) -> i32;

    /// Worst-case output length when compressing `raw_size` bytes.
    fn max_compressed_size(&self, raw_size: usize) -> usize;

    /// Compress `src` into `dst` at `level` (already resolved to `1..=max_level`).
    fn compress_block(&self, dst: &mut [u8], src: &[u8], level: i32) -> anyhow::Result<usize>;

    /// Uncompress `src` into `dst`, whose length is the expected output size.
    fn uncompress_block(&self, dst: &mut [u8], src: &[u8]) -> anyhow::Result<usize>;
}
