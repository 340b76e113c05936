mod buffer;
pub mod codec;
pub mod compress;
pub mod compression;
pub mod error;
pub mod format;
pub mod options;
pub mod reader;
pub mod shuffle;
pub mod subblock;
pub mod threads;
pub mod uncompress;
pub mod writer;

pub use codec::BlockCodec;
pub use compression::Compression;
pub use error::{Error, ErrorKind, Result};
pub use format::{ContainerHeader, SubblockEntry, HEADER_SIZE, MAGIC};
pub use options::{CompressionOptions, PerformanceReport};
pub use reader::{Contents, Reader};
pub use subblock::{Subblock, SubblockList};
pub use writer::{Body, Writer};
