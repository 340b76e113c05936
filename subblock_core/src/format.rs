/// Magic bytes of a subblock container, version 1.
pub const MAGIC: &[u8; 8] = b"SUBBLK1\n";

pub const FORMAT_VERSION: u16 = 1;

/// Fixed size of the container header in bytes.
///   magic[8] + version:u16 + algorithm:u16 + flags:u16 + item_size:u16
///   + subblock_count:u64 + raw_size:u64
///   = 8 + 2 + 2 + 2 + 2 + 8 + 8 = 32
pub const HEADER_SIZE: u64 = 32;

/// Size of each entry in the subblock table, in bytes.
///   uncompressed_size:u64 + payload_len:u64 + checksum:u64 = 24
pub const SUBBLOCK_ENTRY_SIZE: u64 = 24;

/// Per-subblock framing cost charged by the incompressibility guard.
pub const SUBBLOCK_OVERHEAD: u64 = SUBBLOCK_ENTRY_SIZE;

/// Per-list framing cost charged by the incompressibility guard (the
/// subblock count).
pub const LIST_OVERHEAD: u64 = 8;

// ── Flags ──────────────────────────────────────────────────────────────────

/// Subblocks carry xxh3-64 checksums of their payloads.
pub const FLAG_CHECKSUMS: u16 = 1 << 0;

/// The raw buffer was byte-shuffled with `item_size` before splitting.
pub const FLAG_SHUFFLED: u16 = 1 << 1;

/// Compression was not beneficial: the body is the raw buffer, no table.
pub const FLAG_VERBATIM: u16 = 1 << 2;

// ── Algorithm IDs ──────────────────────────────────────────────────────────

pub const ALGORITHM_DEFLATE: u16 = 1;
pub const ALGORITHM_LZ4: u16 = 2;
pub const ALGORITHM_LZ4HC: u16 = 3;
pub const ALGORITHM_ZSTD: u16 = 4;

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded representation of the 32-byte container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub version: u16,
    pub algorithm: u16,
    pub flags: u16,
    /// Shuffle stride; meaningful only with [`FLAG_SHUFFLED`].
    pub item_size: u16,
    pub subblock_count: u64,
    /// Total uncompressed length of the buffer.
    pub raw_size: u64,
}

impl ContainerHeader {
    /// Serialize to exactly `HEADER_SIZE` bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[..8].copy_from_slice(MAGIC);
        buf[8..10].copy_from_slice(&self.version.to_le_bytes());
        buf[10..12].copy_from_slice(&self.algorithm.to_le_bytes());
        buf[12..14].copy_from_slice(&self.flags.to_le_bytes());
        buf[14..16].copy_from_slice(&self.item_size.to_le_bytes());
        buf[16..24].copy_from_slice(&self.subblock_count.to_le_bytes());
        buf[24..32].copy_from_slice(&self.raw_size.to_le_bytes());
        buf
    }

    /// Deserialize from `HEADER_SIZE` bytes, checking the magic.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE as usize]) -> anyhow::Result<Self> {
        if &buf[..8] != MAGIC {
            anyhow::bail!("invalid magic bytes: not a subblock container");
        }
        Ok(Self {
            version: u16::from_le_bytes(buf[8..10].try_into()?),
            algorithm: u16::from_le_bytes(buf[10..12].try_into()?),
            flags: u16::from_le_bytes(buf[12..14].try_into()?),
            item_size: u16::from_le_bytes(buf[14..16].try_into()?),
            subblock_count: u64::from_le_bytes(buf[16..24].try_into()?),
            raw_size: u64::from_le_bytes(buf[24..32].try_into()?),
        })
    }

    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }
}

// ── Subblock table entry ────────────────────────────────────────────────────

/// One entry of the subblock table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubblockEntry {
    pub uncompressed_size: u64,
    pub payload_len: u64,
    /// xxh3-64 of the payload, 0 when checksums are disabled.
    pub checksum: u64,
}

impl SubblockEntry {
    /// Serialize to exactly `SUBBLOCK_ENTRY_SIZE` bytes.
    pub fn to_bytes(&self) -> [u8; SUBBLOCK_ENTRY_SIZE as usize] {
        let mut buf = [0u8; SUBBLOCK_ENTRY_SIZE as usize];
        buf[0..8].copy_from_slice(&self.uncompressed_size.to_le_bytes());
        buf[8..16].copy_from_slice(&self.payload_len.to_le_bytes());
        buf[16..24].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Deserialize from `SUBBLOCK_ENTRY_SIZE` bytes.
    pub fn from_bytes(buf: &[u8; SUBBLOCK_ENTRY_SIZE as usize]) -> anyhow::Result<Self> {
        Ok(Self {
            uncompressed_size: u64::from_le_bytes(buf[0..8].try_into()?),
            payload_len: u64::from_le_bytes(buf[8..16].try_into()?),
            checksum: u64::from_le_bytes(buf[16..24].try_into()?),
        })
    }
}
