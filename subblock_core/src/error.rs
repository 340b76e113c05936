//! Error types for the compression and decompression engines.
//!
//! Workers never unwind across the thread boundary. Each one returns its
//! failures as values; the orchestrator joins every worker and only then folds
//! all collected failures, in work-range order, into a single [`Error`].

use thiserror::Error;

/// A single failure detected while compressing or uncompressing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("invalid input buffer: {0}")]
    InvalidBuffer(String),

    #[error("invalid subblock size {size} (allowed {min}..={max})")]
    InvalidBlockSize { size: u64, min: u64, max: u64 },

    #[error("failed to compress subblock data (offset={offset} usize={size})")]
    CompressionFailure { offset: u64, size: u64 },

    #[error("invalid compressed subblock data (index={index} usize={size} csize={payload_len})")]
    SubblockCorruption { index: usize, size: u64, payload_len: u64 },

    #[error("subblock checksum mismatch (offset={offset}, expected {expected:016x}, got {actual:016x})")]
    ChecksumMismatch { offset: u64, expected: u64, actual: u64 },

    #[error("insufficient uncompression buffer length (required {required}, available {available})")]
    InsufficientOutputBuffer { required: u64, available: u64 },

    #[error("uncompressed subblock size mismatch (offset={offset}, expected {expected}, got {actual})")]
    DecompressionSizeMismatch { offset: u64, expected: u64, actual: u64 },

    #[error("codec fault at offset {offset}: {message}")]
    CodecFault { offset: u64, message: String },

    #[error("out of memory (requested {requested} bytes)")]
    OutOfMemory { requested: u64 },

    #[error("unknown worker error: {0}")]
    UnknownWorkerError(String),
}

/// Aggregate failure of a whole compress or uncompress call.
///
/// The message is the algorithm name followed by one line per failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{algorithm} compression: {}", join_lines(.failures))]
pub struct Error {
    algorithm: &'static str,
    failures: Vec<ErrorKind>,
}

impl Error {
    /// Only built from a non-empty failure list, so [`kind`](Self::kind)
    /// always has a first failure.
    pub(crate) fn new(algorithm: &'static str, failures: Vec<ErrorKind>) -> Self {
        debug_assert!(!failures.is_empty());
        Self { algorithm, failures }
    }

    pub fn single(algorithm: &'static str, kind: ErrorKind) -> Self {
        Self::new(algorithm, vec![kind])
    }

    pub fn algorithm(&self) -> &'static str {
        self.algorithm
    }

    /// Every failure collected for this call, in subblock order.
    pub fn failures(&self) -> &[ErrorKind] {
        &self.failures
    }

    /// The first failure in subblock order.
    pub fn kind(&self) -> &ErrorKind {
        &self.failures[0]
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of one worker's range of subblocks.
pub(crate) type WorkerResult<T> = std::result::Result<T, Vec<ErrorKind>>;

fn join_lines(failures: &[ErrorKind]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fold per-worker outcomes into one result, preserving work-range order.
///
/// All workers have already been joined when this runs, so either every
/// worker succeeded or the call fails with every failure that was seen.
pub(crate) fn collect_workers<T>(
    algorithm: &'static str,
    outcomes: Vec<WorkerResult<T>>,
) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(value) => values.push(value),
            Err(mut errs) => failures.append(&mut errs),
        }
    }
    if failures.is_empty() {
        Ok(values)
    } else {
        Err(Error::new(algorithm, failures))
    }
}

/// Describe a worker panic payload for [`ErrorKind::UnknownWorkerError`].
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown error".to_string()
    }
}
