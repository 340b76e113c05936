use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::format::{
    ContainerHeader, SubblockEntry, FLAG_CHECKSUMS, FLAG_SHUFFLED, FLAG_VERBATIM, FORMAT_VERSION,
    HEADER_SIZE, SUBBLOCK_ENTRY_SIZE,
};
use crate::options::CompressionOptions;
use crate::subblock::{total_uncompressed_size, Subblock};

/// What a container carries after its header.
#[derive(Debug, Clone, Copy)]
pub enum Body<'a> {
    /// The result of a successful compress call.
    Subblocks(&'a [Subblock]),
    /// The raw buffer, stored because compression was not beneficial.
    Verbatim(&'a [u8]),
}

impl Body<'_> {
    /// Header describing this body as produced by `algorithm` with `options`.
    pub fn header(&self, algorithm: u16, options: &CompressionOptions) -> ContainerHeader {
        match self {
            Body::Subblocks(subblocks) => {
                let mut flags = 0;
                if options.checksums {
                    flags |= FLAG_CHECKSUMS;
                }
                if options.shuffles() {
                    flags |= FLAG_SHUFFLED;
                }
                ContainerHeader {
                    version: FORMAT_VERSION,
                    algorithm,
                    flags,
                    item_size: options.effective_item_size() as u16,
                    subblock_count: subblocks.len() as u64,
                    raw_size: total_uncompressed_size(subblocks).unwrap_or(u64::MAX),
                }
            }
            Body::Verbatim(raw) => ContainerHeader {
                version: FORMAT_VERSION,
                algorithm,
                flags: FLAG_VERBATIM,
                item_size: 1,
                subblock_count: 0,
                raw_size: raw.len() as u64,
            },
        }
    }
}

/// Writer for subblock containers.
///
/// # Layout written
/// ```text
/// [HEADER: 32 bytes]
/// [SUBBLOCK TABLE: 24 bytes × N]         ← absent for verbatim bodies
/// [PAYLOAD 0] [PAYLOAD 1] ... [PAYLOAD N-1]   or the raw buffer
/// ```
pub struct Writer<W: Write> {
    inner: W,
}

impl Writer<BufWriter<File>> {
    /// Create (or truncate) a container file at `path`.
    pub fn create(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write `header` followed by `body` and flush. Returns the number of
    /// bytes written.
    pub fn finish(mut self, header: &ContainerHeader, body: Body<'_>) -> anyhow::Result<u64> {
        self.inner.write_all(&header.to_bytes())?;
        let mut written = HEADER_SIZE;

        match body {
            Body::Subblocks(subblocks) => {
                if header.has_flag(FLAG_VERBATIM) || header.subblock_count != subblocks.len() as u64 {
                    anyhow::bail!(
                        "header announces {} subblocks (flags 0x{:04x}) but body has {}",
                        header.subblock_count,
                        header.flags,
                        subblocks.len()
                    );
                }

                // ── Subblock table ─────────────────────────────────────────
                for s in subblocks {
                    let entry = SubblockEntry {
                        uncompressed_size: s.uncompressed_size,
                        payload_len: s.payload.len() as u64,
                        checksum: s.checksum,
                    };
                    self.inner.write_all(&entry.to_bytes())?;
                }
                written += subblocks.len() as u64 * SUBBLOCK_ENTRY_SIZE;

                // ── Payloads ───────────────────────────────────────────────
                for s in subblocks {
                    self.inner.write_all(&s.payload)?;
                    written += s.payload.len() as u64;
                }
            }
            Body::Verbatim(raw) => {
                if !header.has_flag(FLAG_VERBATIM) || header.raw_size != raw.len() as u64 {
                    anyhow::bail!("header does not describe a verbatim body of {} bytes", raw.len());
                }
                self.inner.write_all(raw)?;
                written += raw.len() as u64;
            }
        }

        self.inner.flush()?;
        Ok(written)
    }
}
