//! Failure handling with a scripted codec: faults, oversized output, worker
//! panics, allocation failure, and bad capability bounds.
use std::sync::atomic::{AtomicUsize, Ordering};

use subblock_core::{BlockCodec, Compression, CompressionOptions, ErrorKind, Subblock};

const POISON: u8 = 0xEE;
const PANIC: u8 = 0xDD;
const OVERRUN: u8 = 0xCC;

/// Encodes constant blocks as their single repeated byte and refuses
/// everything else. Blocks starting with a marker byte misbehave on purpose.
#[derive(Debug, Clone, Copy)]
struct ScriptedCodec {
    min_block: u64,
}

impl Default for ScriptedCodec {
    fn default() -> Self {
        Self { min_block: 16 }
    }
}

impl BlockCodec for ScriptedCodec {
    fn id(&self) -> u16 {
        0xFF
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn min_block_size(&self) -> u64 {
        self.min_block
    }

    fn max_block_size(&self) -> u64 {
        1 << 20
    }

    fn default_level(&self) -> i32 {
        1
    }

    fn max_level(&self) -> i32 {
        1
    }

    fn max_compressed_size(&self, raw_size: usize) -> usize {
        raw_size
    }

    fn compress_block(&self, dst: &mut [u8], src: &[u8], _level: i32) -> anyhow::Result<usize> {
        match src[0] {
            POISON => anyhow::bail!("poisoned block"),
            PANIC => panic!("codec panicked"),
            OVERRUN => return Ok(dst.len() + 1),
            _ => {}
        }
        if src.iter().all(|&b| b == src[0]) {
            dst[0] = src[0];
            Ok(1)
        } else {
            Ok(0)
        }
    }

    fn uncompress_block(&self, dst: &mut [u8], src: &[u8]) -> anyhow::Result<usize> {
        if src.len() != 1 || src[0] == POISON {
            anyhow::bail!("cannot decode {} bytes", src.len());
        }
        dst.fill(src[0]);
        Ok(dst.len())
    }
}

/// Asks for an impossible scratch buffer and counts how often it is asked.
#[derive(Debug, Default)]
struct GreedyCodec {
    bound_requests: AtomicUsize,
}

impl BlockCodec for GreedyCodec {
    fn id(&self) -> u16 {
        0xFE
    }

    fn name(&self) -> &'static str {
        "greedy"
    }

    fn min_block_size(&self) -> u64 {
        16
    }

    fn max_block_size(&self) -> u64 {
        1 << 20
    }

    fn default_level(&self) -> i32 {
        1
    }

    fn max_level(&self) -> i32 {
        1
    }

    fn max_compressed_size(&self, _raw_size: usize) -> usize {
        self.bound_requests.fetch_add(1, Ordering::SeqCst);
        usize::MAX
    }

    fn compress_block(&self, _dst: &mut [u8], _src: &[u8], _level: i32) -> anyhow::Result<usize> {
        panic!("no scratch buffer can exist");
    }

    fn uncompress_block(&self, _dst: &mut [u8], _src: &[u8]) -> anyhow::Result<usize> {
        Ok(0)
    }
}

fn blocks(markers: &[u8], block: usize) -> Vec<u8> {
    markers.iter().flat_map(|&m| std::iter::repeat(m).take(block)).collect()
}

fn engine(parallel: bool) -> Compression<ScriptedCodec> {
    let options = CompressionOptions::default()
        .with_subblock_size(64)
        .with_parallel(parallel, 4);
    Compression::new(ScriptedCodec::default(), options)
}

#[test]
fn test_scripted_codec_roundtrip() {
    let data = blocks(&(0..80).map(|i| i as u8).collect::<Vec<_>>(), 64);
    let engine = engine(true);
    let (subblocks, report) = engine.compress_with_report(&data).unwrap();
    assert_eq!(subblocks.len(), 80);
    assert_eq!(report.threads_used, 4);
    assert!(subblocks.iter().all(|s| s.payload.len() == 1));
    assert_eq!(engine.uncompress(&subblocks).unwrap(), data);
}

#[test]
fn test_codec_faults_are_collected_from_every_worker() {
    let mut markers = vec![1u8; 64];
    markers[3] = POISON;
    markers[50] = POISON;
    let data = blocks(&markers, 64);

    for parallel in [false, true] {
        let err = engine(parallel).compress(&data).unwrap_err();
        assert_eq!(err.algorithm(), "scripted");
        assert_eq!(
            err.failures(),
            &[
                ErrorKind::CodecFault { offset: 3 * 64, message: "poisoned block".into() },
                ErrorKind::CodecFault { offset: 50 * 64, message: "poisoned block".into() },
            ]
        );
        let msg = err.to_string();
        assert!(msg.starts_with("scripted compression: codec fault at offset 192: poisoned block\n"));
    }
}

#[test]
fn test_codec_writing_past_the_bound_is_a_compression_failure() {
    let data = blocks(&[1, OVERRUN, 2], 64);
    let err = engine(false).compress(&data).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::CompressionFailure { offset: 64, size: 64 });
}

#[test]
fn test_worker_panic_becomes_unknown_worker_error() {
    let mut markers = vec![7u8; 64];
    markers[40] = PANIC;
    let data = blocks(&markers, 64);

    for parallel in [false, true] {
        let err = engine(parallel).compress(&data).unwrap_err();
        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.kind(), &ErrorKind::UnknownWorkerError("codec panicked".into()));
    }
}

#[test]
fn test_decode_faults_are_reported_per_subblock() {
    let subblocks = vec![
        Subblock { uncompressed_size: 64, payload: vec![1], checksum: 0 },
        Subblock { uncompressed_size: 64, payload: vec![POISON], checksum: 0 },
        Subblock { uncompressed_size: 64, payload: vec![2], checksum: 0 },
        Subblock { uncompressed_size: 64, payload: vec![3, 3], checksum: 0 },
    ];
    let err = engine(false).uncompress(&subblocks).unwrap_err();
    assert_eq!(
        err.failures(),
        &[
            ErrorKind::CodecFault { offset: 64, message: "cannot decode 1 bytes".into() },
            ErrorKind::CodecFault { offset: 192, message: "cannot decode 2 bytes".into() },
        ]
    );
}

#[test]
fn test_stored_subblocks_never_reach_the_codec() {
    let subblocks = vec![
        Subblock { uncompressed_size: 3, payload: vec![POISON, POISON, POISON], checksum: 0 },
        Subblock { uncompressed_size: 64, payload: vec![9], checksum: 0 },
    ];
    let out = engine(false).uncompress(&subblocks).unwrap();
    assert_eq!(&out[..3], &[POISON; 3]);
    assert!(out[3..].iter().all(|&b| b == 9));
}

#[test]
fn test_invalid_codec_bounds_are_rejected() {
    let broken = Compression::new(ScriptedCodec { min_block: 0 }, CompressionOptions::default());
    let err = broken.compress(b"some bytes").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidBlockSize { min: 0, .. }));

    let inverted = Compression::new(ScriptedCodec { min_block: 1 << 21 }, CompressionOptions::default());
    assert!(matches!(
        inverted.compress(b"some bytes").unwrap_err().kind(),
        ErrorKind::InvalidBlockSize { .. }
    ));
}

#[test]
fn test_out_of_memory_ends_the_worker_range() {
    let oom = ErrorKind::OutOfMemory { requested: usize::MAX as u64 };
    let data = vec![3u8; 64 * 10];

    let serial = Compression::new(
        GreedyCodec::default(),
        CompressionOptions::default().with_subblock_size(64).with_parallel(false, 0),
    );
    let err = serial.compress(&data).unwrap_err();
    assert_eq!(err.failures(), &[oom.clone()]);
    assert_eq!(serial.codec().bound_requests.load(Ordering::SeqCst), 1);

    // 81 units over 4 workers: one failure per worker, the rest skipped.
    let data = vec![3u8; 64 * 80];
    let parallel = Compression::new(
        GreedyCodec::default(),
        CompressionOptions::default().with_subblock_size(64).with_parallel(true, 4),
    );
    let err = parallel.compress(&data).unwrap_err();
    assert_eq!(err.failures(), &[oom.clone(), oom.clone(), oom.clone(), oom]);
    assert_eq!(parallel.codec().bound_requests.load(Ordering::SeqCst), 4);
}
