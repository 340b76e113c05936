//! Decompression engine: validate, verify checksums, and decode subblocks in
//! parallel into disjoint regions of the destination buffer.

use std::ops::Range;
use std::time::Instant;

use log::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::buffer::try_zeroed;
use crate::codec::BlockCodec;
use crate::compression::{size_reduction, throughput_mib_s, Compression};
use crate::error::{collect_workers, ErrorKind, Result, WorkerResult};
use crate::options::PerformanceReport;
use crate::shuffle::unshuffle_in_place;
use crate::subblock::{destination_offsets, estimated_encoded_size, total_uncompressed_size, Subblock};
use crate::threads::{fork_join, partition, thread_count};

impl<C: BlockCodec> Compression<C> {
    /// Uncompress `subblocks` into a newly allocated buffer of exactly the
    /// total uncompressed size.
    pub fn uncompress(&self, subblocks: &[Subblock]) -> Result<Vec<u8>> {
        if subblocks.is_empty() {
            return Ok(Vec::new());
        }
        let total = self.validate(subblocks)?;
        let mut out = try_zeroed(total).map_err(|kind| self.fail(kind))?;
        self.uncompress_into(subblocks, &mut out)?;
        Ok(out)
    }

    /// Uncompress `subblocks` into the start of `destination` and return the
    /// number of bytes written.
    ///
    /// An empty list writes nothing and succeeds. Corrupt subblock records, a
    /// destination shorter than the total uncompressed size, or a checksum
    /// mismatch fail the call before any byte of `destination` is written.
    /// If decoding itself fails, the destination content is unspecified.
    pub fn uncompress_into(&self, subblocks: &[Subblock], destination: &mut [u8]) -> Result<usize> {
        self.uncompress_into_with_report(subblocks, destination)
            .map(|(written, _)| written)
    }

    /// Like [`uncompress_into`](Self::uncompress_into), also measuring
    /// performance.
    pub fn uncompress_into_with_report(
        &self,
        subblocks: &[Subblock],
        destination: &mut [u8],
    ) -> Result<(usize, PerformanceReport)> {
        if subblocks.is_empty() {
            return Ok((0, PerformanceReport::default()));
        }

        let total = self.validate(subblocks)?;
        if destination.len() < total {
            return Err(self.fail(ErrorKind::InsufficientOutputBuffer {
                required: total as u64,
                available: destination.len() as u64,
            }));
        }

        let started = Instant::now();

        let offsets = destination_offsets(subblocks);
        let threads = thread_count(&self.options, subblocks.len());
        let ranges = partition(subblocks.len(), threads);
        debug!(
            "{}: uncompressing {} subblocks into {} bytes ({} thread(s))",
            self.codec.name(),
            subblocks.len(),
            total,
            threads
        );

        if subblocks.iter().any(|s| s.checksum != 0) {
            let outcomes = fork_join(ranges.clone(), |range| {
                verify_range(subblocks, &offsets, range)
            });
            collect_workers(self.codec.name(), outcomes)?;
        }

        let mut jobs = Vec::with_capacity(ranges.len());
        let mut rest = &mut destination[..total];
        for range in ranges {
            let start = offsets[range.start] as usize;
            let end = offsets.get(range.end).map_or(total, |&o| o as usize);
            let (region, tail) = std::mem::take(&mut rest).split_at_mut(end - start);
            rest = tail;
            jobs.push((range, region));
        }

        let outcomes = fork_join(jobs, |(range, region)| {
            self.uncompress_range(subblocks, &offsets, range, region)
        });
        collect_workers(self.codec.name(), outcomes)?;

        if self.options.shuffles() {
            unshuffle_in_place(&mut destination[..total], self.options.effective_item_size())
                .map_err(|kind| self.fail(kind))?;
        }

        let report = PerformanceReport {
            size_reduction: size_reduction(total as u64, estimated_encoded_size(subblocks)),
            throughput_mib_s: throughput_mib_s(total as u64, started.elapsed()),
            threads_used: threads as u32,
        };
        Ok((total, report))
    }

    /// Check every subblock record and return the total uncompressed size.
    fn validate(&self, subblocks: &[Subblock]) -> Result<usize> {
        for (index, s) in subblocks.iter().enumerate() {
            if s.payload.is_empty() || s.uncompressed_size == 0 || s.payload.len() as u64 > s.uncompressed_size {
                return Err(self.fail(ErrorKind::SubblockCorruption {
                    index,
                    size: s.uncompressed_size,
                    payload_len: s.payload.len() as u64,
                }));
            }
        }
        total_uncompressed_size(subblocks)
            .and_then(|total| usize::try_from(total).ok())
            .ok_or_else(|| {
                self.fail(ErrorKind::InvalidBuffer(
                    "total uncompressed size does not fit in memory".to_string(),
                ))
            })
    }

    /// Worker body: decode every subblock in `range` into `region`, which
    /// starts at the destination offset of the range's first subblock.
    fn uncompress_range(
        &self,
        subblocks: &[Subblock],
        offsets: &[u64],
        range: Range<usize>,
        region: &mut [u8],
    ) -> WorkerResult<()> {
        let base = offsets[range.start];
        let mut failures = Vec::new();

        for index in range {
            let s = &subblocks[index];
            let offset = offsets[index];
            let at = (offset - base) as usize;
            let dst = &mut region[at..at + s.uncompressed_size as usize];

            if s.is_compressed() {
                match self.codec.uncompress_block(dst, &s.payload) {
                    Ok(n) if n as u64 == s.uncompressed_size => {}
                    Ok(n) => failures.push(ErrorKind::DecompressionSizeMismatch {
                        offset,
                        expected: s.uncompressed_size,
                        actual: n as u64,
                    }),
                    Err(e) => failures.push(ErrorKind::CodecFault {
                        offset,
                        message: format!("{e:#}"),
                    }),
                }
            } else {
                dst.copy_from_slice(&s.payload);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }
}

/// Checksum pass: compare every nonzero checksum in `range` with the payload.
fn verify_range(subblocks: &[Subblock], offsets: &[u64], range: Range<usize>) -> WorkerResult<()> {
    let failures: Vec<ErrorKind> = range
        .filter_map(|index| {
            let s = &subblocks[index];
            if s.checksum == 0 {
                return None;
            }
            let actual = xxh3_64(&s.payload);
            (actual != s.checksum).then(|| ErrorKind::ChecksumMismatch {
                offset: offsets[index],
                expected: s.checksum,
                actual,
            })
        })
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}
