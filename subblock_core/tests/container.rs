/// Container writer/reader tests over in-memory buffers.
use std::io::Cursor;

use subblock_codecs::{Algorithm, ZstdCodec};
use subblock_core::format::{FLAG_CHECKSUMS, FLAG_SHUFFLED, FLAG_VERBATIM};
use subblock_core::{BlockCodec, Body, Compression, CompressionOptions, Contents, Reader, Writer, HEADER_SIZE};

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i / 4) % 251) as u8).collect()
}

fn write_to_vec(header: &subblock_core::ContainerHeader, body: Body<'_>) -> Vec<u8> {
    let mut buf = Vec::new();
    let written = Writer::new(&mut buf).finish(header, body).unwrap();
    assert_eq!(written, buf.len() as u64);
    buf
}

#[test]
fn test_subblock_container_roundtrip() {
    let data = sample(200_000);
    let options = CompressionOptions::default()
        .with_subblock_size(16 * 1024)
        .with_shuffle(true)
        .with_item_size(4);
    let engine = Compression::new(ZstdCodec, options.clone());
    let subblocks = engine.compress(&data).unwrap();
    assert!(!subblocks.is_empty());

    let body = Body::Subblocks(&subblocks);
    let header = body.header(ZstdCodec.id(), &options);
    assert!(header.has_flag(FLAG_CHECKSUMS));
    assert!(header.has_flag(FLAG_SHUFFLED));
    let file = write_to_vec(&header, body);

    let reader = Reader::new(Cursor::new(&file)).unwrap();
    assert!(!reader.is_verbatim());
    assert_eq!(reader.raw_size(), data.len() as u64);
    assert_eq!(reader.entries().len(), subblocks.len());
    assert_eq!(
        HEADER_SIZE + 24 * subblocks.len() as u64 + reader.payload_size(),
        file.len() as u64
    );
    assert!(reader.ratio() > 1.0);
    assert_eq!(Algorithm::from_id(reader.header().algorithm).unwrap(), Algorithm::Zstd);

    let restored_options = reader.options();
    assert!(restored_options.shuffles());
    assert_eq!(restored_options.item_size, 4);

    let decoder = Compression::new(Algorithm::Zstd, restored_options);
    match reader.read_contents().unwrap() {
        Contents::Subblocks(read) => {
            assert_eq!(read, subblocks);
            assert_eq!(decoder.uncompress(&read).unwrap(), data);
        }
        Contents::Verbatim(_) => panic!("expected subblocks"),
    }
}

#[test]
fn test_verbatim_container_roundtrip() {
    let raw = b"too short to be worth compressing".to_vec();
    let body = Body::Verbatim(&raw);
    let header = body.header(Algorithm::Lz4.id(), &CompressionOptions::default());
    assert!(header.has_flag(FLAG_VERBATIM));
    let file = write_to_vec(&header, body);
    assert_eq!(file.len() as u64, HEADER_SIZE + raw.len() as u64);

    let reader = Reader::new(Cursor::new(file)).unwrap();
    assert!(reader.is_verbatim());
    assert!(reader.entries().is_empty());
    assert_eq!(reader.read_contents().unwrap(), Contents::Verbatim(raw));
}

#[test]
fn test_writer_rejects_mismatched_header() {
    let raw = vec![1u8; 10];
    let verbatim = Body::Verbatim(&raw);
    let header = verbatim.header(1, &CompressionOptions::default());

    let err = Writer::new(Vec::new())
        .finish(&header, Body::Subblocks(&[]))
        .unwrap_err();
    assert!(err.to_string().contains("header announces"));
}

#[test]
fn test_reader_rejects_damaged_files() {
    let data = sample(50_000);
    let options = CompressionOptions::default().with_subblock_size(4096);
    let subblocks = Compression::new(Algorithm::Lz4, options.clone()).compress(&data).unwrap();
    let body = Body::Subblocks(&subblocks);
    let file = write_to_vec(&body.header(Algorithm::Lz4.id(), &options), body);

    // Bad magic.
    let mut bad_magic = file.clone();
    bad_magic[0] ^= 0xFF;
    assert!(Reader::new(Cursor::new(bad_magic)).is_err());

    // Truncated table.
    let short_table = &file[..HEADER_SIZE as usize + 10];
    assert!(Reader::new(Cursor::new(short_table)).is_err());

    // Truncated payload: the table loads, the body does not.
    let truncated = &file[..file.len() - 1];
    let reader = Reader::new(Cursor::new(truncated)).unwrap();
    let err = reader.read_contents().unwrap_err();
    assert!(format!("{err:#}").contains("truncated subblock payload"));
}

#[test]
fn test_oversized_item_size_survives_the_container() {
    let data = sample(128 * 1000);
    let options = CompressionOptions {
        item_size: 200,
        subblock_size: 8192,
        ..CompressionOptions::default()
    };
    let engine = Compression::new(Algorithm::Deflate, options.clone());
    let subblocks = engine.compress(&data).unwrap();
    assert!(!subblocks.is_empty());

    let body = Body::Subblocks(&subblocks);
    let header = body.header(Algorithm::Deflate.id(), &options);
    assert!(header.has_flag(FLAG_SHUFFLED));
    assert_eq!(header.item_size, 128);
    let file = write_to_vec(&header, body);

    let reader = Reader::new(Cursor::new(&file)).unwrap();
    let restored = reader.options();
    assert_eq!(restored.effective_item_size(), options.effective_item_size());

    let decoder = Compression::new(Algorithm::Deflate, restored);
    match reader.read_contents().unwrap() {
        Contents::Subblocks(read) => assert_eq!(decoder.uncompress(&read).unwrap(), data),
        Contents::Verbatim(_) => panic!("expected subblocks"),
    }
}

#[test]
fn test_reader_rejects_out_of_range_item_size() {
    let data = sample(64 * 1024);
    let options = CompressionOptions::default().with_item_size(4);
    let subblocks = Compression::new(Algorithm::Lz4, options.clone()).compress(&data).unwrap();
    let body = Body::Subblocks(&subblocks);
    let file = write_to_vec(&body.header(Algorithm::Lz4.id(), &options), body);

    for bad in [0u16, 1, 129, 200, u16::MAX] {
        let mut damaged = file.clone();
        damaged[14..16].copy_from_slice(&bad.to_le_bytes());
        let err = Reader::new(Cursor::new(damaged)).err().expect("item size must be rejected");
        assert!(err.to_string().contains("item size"), "{err}");
    }
}
