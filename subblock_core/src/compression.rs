use crate::codec::BlockCodec;
use crate::error::{Error, ErrorKind};
use crate::options::CompressionOptions;

/// A block codec paired with the options for compress and uncompress calls.
///
/// The compression engine lives in [`compress`](crate::compress) and the
/// decompression engine in [`uncompress`](crate::uncompress); both are
/// methods on this type. A `Compression` holds no mutable state, so one value
/// can serve any number of calls.
#[derive(Debug, Clone)]
pub struct Compression<C> {
    pub(crate) codec: C,
    pub(crate) options: CompressionOptions,
}

impl<C: BlockCodec> Compression<C> {
    pub fn new(codec: C, options: CompressionOptions) -> Self {
        Self { codec, options }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn options(&self) -> &CompressionOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: CompressionOptions) {
        self.options = options;
    }

    pub(crate) fn fail(&self, kind: ErrorKind) -> Error {
        Error::single(self.codec.name(), kind)
    }

    /// Reject codecs whose block-size bounds cannot split any buffer.
    pub(crate) fn check_codec(&self) -> Result<(), Error> {
        let (min, max) = (self.codec.min_block_size(), self.codec.max_block_size());
        if min == 0 || min > max || usize::try_from(max).is_err() {
            return Err(self.fail(ErrorKind::InvalidBlockSize {
                size: self.options.subblock_size,
                min,
                max,
            }));
        }
        Ok(())
    }
}

impl<C: BlockCodec + Default> Default for Compression<C> {
    fn default() -> Self {
        Self::new(C::default(), CompressionOptions::default())
    }
}

/// `(raw - encoded) / raw`, negative when the encoded form is larger.
pub(crate) fn size_reduction(raw: u64, encoded: u64) -> f64 {
    if raw == 0 {
        return 0.0;
    }
    (raw as f64 - encoded as f64) / raw as f64
}

/// Bytes per second expressed in MiB/s.
pub(crate) fn throughput_mib_s(bytes: u64, elapsed: std::time::Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        bytes as f64 / secs / (1024.0 * 1024.0)
    } else {
        0.0
    }
}
