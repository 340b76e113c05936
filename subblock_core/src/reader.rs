use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::format::{
    ContainerHeader, SubblockEntry, FLAG_CHECKSUMS, FLAG_SHUFFLED, FLAG_VERBATIM, FORMAT_VERSION,
    HEADER_SIZE, SUBBLOCK_ENTRY_SIZE,
};
use crate::options::{CompressionOptions, MAX_ITEM_SIZE};
use crate::subblock::Subblock;

/// Body of a container, as read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    Subblocks(Vec<Subblock>),
    Verbatim(Vec<u8>),
}

/// Reader for subblock containers.
///
/// # Open sequence
/// 1. Read the 32-byte header (magic, version, algorithm, flags).
/// 2. Unless the body is verbatim, load the subblock table
///    (`24 bytes × subblock_count`) and check it against `raw_size`.
///
/// Payloads are only read by [`read_contents`](Reader::read_contents).
pub struct Reader<R: Read> {
    inner: R,
    header: ContainerHeader,
    entries: Vec<SubblockEntry>,
}

impl Reader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read> Reader<R> {
    pub fn new(mut inner: R) -> anyhow::Result<Self> {
        // ── Read and validate header ────────────────────────────────────────
        let mut header_buf = [0u8; HEADER_SIZE as usize];
        inner.read_exact(&mut header_buf)?;
        let header = ContainerHeader::from_bytes(&header_buf)?;

        if header.version != FORMAT_VERSION {
            anyhow::bail!(
                "unsupported container version {} (only version {} is supported)",
                header.version,
                FORMAT_VERSION
            );
        }
        if header.has_flag(FLAG_SHUFFLED) && !(2..=MAX_ITEM_SIZE).contains(&u32::from(header.item_size)) {
            anyhow::bail!(
                "shuffled container has item size {} (allowed 2..={})",
                header.item_size,
                MAX_ITEM_SIZE
            );
        }
        if header.has_flag(FLAG_VERBATIM) && header.subblock_count != 0 {
            anyhow::bail!("verbatim container announces {} subblocks", header.subblock_count);
        }

        // ── Load subblock table ─────────────────────────────────────────────
        // Capacity is capped: the count comes from untrusted input.
        let mut entries = Vec::with_capacity(header.subblock_count.min(1 << 16) as usize);
        let mut entry_buf = [0u8; SUBBLOCK_ENTRY_SIZE as usize];
        let mut raw_total = 0u64;
        for idx in 0..header.subblock_count {
            inner.read_exact(&mut entry_buf)?;
            let entry = SubblockEntry::from_bytes(&entry_buf)?;
            if entry.payload_len == 0 || entry.payload_len > entry.uncompressed_size {
                anyhow::bail!(
                    "subblock {} has payload length {} for {} uncompressed bytes",
                    idx,
                    entry.payload_len,
                    entry.uncompressed_size
                );
            }
            raw_total = raw_total
                .checked_add(entry.uncompressed_size)
                .ok_or_else(|| anyhow::anyhow!("subblock sizes overflow"))?;
            entries.push(entry);
        }
        if !header.has_flag(FLAG_VERBATIM) && raw_total != header.raw_size {
            anyhow::bail!(
                "subblock table covers {} bytes but header says {}",
                raw_total,
                header.raw_size
            );
        }

        Ok(Self {
            inner,
            header,
            entries,
        })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// Access the subblock table (for inspection).
    pub fn entries(&self) -> &[SubblockEntry] {
        &self.entries
    }

    pub fn is_verbatim(&self) -> bool {
        self.header.has_flag(FLAG_VERBATIM)
    }

    /// Total uncompressed size in bytes.
    pub fn raw_size(&self) -> u64 {
        self.header.raw_size
    }

    /// Total size of the body in bytes (excluding header and table).
    pub fn payload_size(&self) -> u64 {
        if self.is_verbatim() {
            self.header.raw_size
        } else {
            self.entries.iter().map(|e| e.payload_len).sum()
        }
    }

    /// Compression ratio (raw / payload).
    pub fn ratio(&self) -> f64 {
        let payload = self.payload_size();
        if payload == 0 {
            return 1.0;
        }
        self.raw_size() as f64 / payload as f64
    }

    /// Options needed to uncompress this container. Only the fields recorded
    /// in the header are meaningful; the rest keep their defaults.
    ///
    /// The item size was range-checked when the header was read, so it is
    /// carried over exactly.
    pub fn options(&self) -> CompressionOptions {
        let shuffled = self.header.has_flag(FLAG_SHUFFLED);
        CompressionOptions {
            checksums: self.header.has_flag(FLAG_CHECKSUMS),
            shuffle: shuffled,
            item_size: if shuffled { u32::from(self.header.item_size) } else { 1 },
            ..CompressionOptions::default()
        }
    }

    /// Read the body: every payload, or the raw buffer for verbatim containers.
    pub fn read_contents(mut self) -> anyhow::Result<Contents> {
        if self.is_verbatim() {
            let raw = read_exactly(&mut self.inner, self.header.raw_size, "verbatim body")?;
            return Ok(Contents::Verbatim(raw));
        }

        let mut subblocks = Vec::with_capacity(self.entries.len());
        for (idx, entry) in self.entries.iter().enumerate() {
            let payload = read_exactly(&mut self.inner, entry.payload_len, "subblock payload")
                .map_err(|e| e.context(format!("subblock {idx}")))?;
            subblocks.push(Subblock {
                uncompressed_size: entry.uncompressed_size,
                payload,
                checksum: entry.checksum,
            });
        }
        Ok(Contents::Subblocks(subblocks))
    }
}

/// Read exactly `len` bytes without trusting `len` for the allocation.
fn read_exactly<R: Read>(inner: &mut R, len: u64, what: &str) -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    inner.take(len).read_to_end(&mut buf)?;
    if buf.len() as u64 != len {
        anyhow::bail!("truncated {}: expected {} bytes, found {}", what, len, buf.len());
    }
    Ok(buf)
}
