//! Compression engine: split, compress in parallel, checksum, and decide
//! whether the result is worth keeping.

use std::borrow::Cow;
use std::ops::Range;
use std::time::Instant;

use log::{debug, trace};
use xxhash_rust::xxh3::xxh3_64;

use crate::buffer::{grow, try_copy};
use crate::codec::BlockCodec;
use crate::compression::{size_reduction, throughput_mib_s, Compression};
use crate::error::{collect_workers, ErrorKind, Result, WorkerResult};
use crate::options::PerformanceReport;
use crate::shuffle::shuffle;
use crate::subblock::{estimated_encoded_size, Subblock, SubblockList};
use crate::threads::{fork_join, partition, thread_count};

/// How one buffer is cut into work units.
///
/// Unit `i < full` covers `subblock_size` bytes at `i * subblock_size`; the
/// last unit (`i == full`) covers the `remainder` and is skipped when empty.
#[derive(Debug, Clone, Copy)]
struct SplitPlan {
    level: i32,
    subblock_size: u64,
    full: u64,
    remainder: u64,
}

impl SplitPlan {
    fn units(&self) -> usize {
        (self.full + 1) as usize
    }

    fn unit_size(&self, unit: usize) -> u64 {
        if (unit as u64) < self.full {
            self.subblock_size
        } else {
            self.remainder
        }
    }
}

impl<C: BlockCodec> Compression<C> {
    /// Compress `data` into an ordered list of subblocks.
    ///
    /// An empty list means either that `data` is empty or that compression
    /// was not beneficial; in both cases the caller should store the buffer
    /// verbatim.
    pub fn compress(&self, data: &[u8]) -> Result<SubblockList> {
        self.compress_with_report(data).map(|(subblocks, _)| subblocks)
    }

    /// Like [`compress`](Self::compress), also measuring performance.
    ///
    /// The report describes the work done even when the result is discarded
    /// as not worth compressing.
    pub fn compress_with_report(&self, data: &[u8]) -> Result<(SubblockList, PerformanceReport)> {
        if data.is_empty() {
            return Ok((SubblockList::new(), PerformanceReport::default()));
        }
        self.check_codec()?;

        let size = data.len() as u64;
        let subblock_size = self.options.effective_subblock_size(&self.codec);
        let plan = SplitPlan {
            level: self.options.effective_level(&self.codec),
            subblock_size,
            full: size / subblock_size,
            remainder: size % subblock_size,
        };

        let started = Instant::now();

        let data: Cow<'_, [u8]> = if self.options.shuffles() {
            let shuffled = shuffle(data, self.options.effective_item_size()).map_err(|kind| self.fail(kind))?;
            Cow::Owned(shuffled)
        } else {
            Cow::Borrowed(data)
        };

        let units = plan.units();
        let threads = thread_count(&self.options, units);
        debug!(
            "{}: compressing {} bytes as {} x {} + {} (level {}, {} thread(s))",
            self.codec.name(),
            size,
            plan.full,
            plan.subblock_size,
            plan.remainder,
            plan.level,
            threads
        );

        let outcomes = fork_join(partition(units, threads), |range| {
            self.compress_range(&plan, &data, range)
        });
        let subblocks: SubblockList = collect_workers(self.codec.name(), outcomes)?
            .into_iter()
            .flatten()
            .collect();

        let encoded = estimated_encoded_size(&subblocks);
        let report = PerformanceReport {
            size_reduction: size_reduction(size, encoded),
            throughput_mib_s: throughput_mib_s(size, started.elapsed()),
            threads_used: threads as u32,
        };

        if encoded >= size {
            debug!(
                "{}: not worth compressing ({} bytes encoded >= {} raw)",
                self.codec.name(),
                encoded,
                size
            );
            return Ok((SubblockList::new(), report));
        }

        debug!(
            "{}: {} subblocks, {} -> {} bytes",
            self.codec.name(),
            subblocks.len(),
            size,
            encoded
        );
        Ok((subblocks, report))
    }

    /// Worker body: compress every unit in `range`, in order.
    ///
    /// A failing unit is recorded and the worker moves on; running out of
    /// memory ends the range.
    fn compress_range(&self, plan: &SplitPlan, data: &[u8], range: Range<usize>) -> WorkerResult<Vec<Subblock>> {
        let mut subblocks = Vec::with_capacity(range.len());
        let mut failures = Vec::new();
        let mut scratch = Vec::new();

        for unit in range {
            let len = plan.unit_size(unit);
            if len == 0 {
                continue;
            }
            let offset = unit as u64 * plan.subblock_size;
            let raw = &data[offset as usize..(offset + len) as usize];

            match self.compress_unit(plan.level, offset, raw, &mut scratch) {
                Ok(subblock) => {
                    trace!(
                        "subblock {} at {}: {} -> {} bytes",
                        unit,
                        offset,
                        len,
                        subblock.payload.len()
                    );
                    subblocks.push(subblock);
                }
                Err(kind @ ErrorKind::OutOfMemory { .. }) => {
                    failures.push(kind);
                    break;
                }
                Err(kind) => failures.push(kind),
            }
        }

        if failures.is_empty() {
            Ok(subblocks)
        } else {
            Err(failures)
        }
    }

    /// Compress one unit, falling back to a stored subblock when it is too
    /// small for the codec or does not shrink.
    fn compress_unit(
        &self,
        level: i32,
        offset: u64,
        raw: &[u8],
        scratch: &mut Vec<u8>,
    ) -> std::result::Result<Subblock, ErrorKind> {
        let mut payload = None;

        if raw.len() as u64 >= self.codec.min_block_size() {
            let bound = self.codec.max_compressed_size(raw.len());
            grow(scratch, bound)?;
            let written = self
                .codec
                .compress_block(&mut scratch[..bound], raw, level)
                .map_err(|e| ErrorKind::CodecFault {
                    offset,
                    message: format!("{e:#}"),
                })?;
            if written > bound {
                return Err(ErrorKind::CompressionFailure {
                    offset,
                    size: raw.len() as u64,
                });
            }
            if written > 0 && written < raw.len() {
                payload = Some(try_copy(&scratch[..written])?);
            }
        }

        let payload = match payload {
            Some(compressed) => compressed,
            None => try_copy(raw)?,
        };
        let checksum = if self.options.checksums {
            xxh3_64(&payload)
        } else {
            0
        };

        Ok(Subblock {
            uncompressed_size: raw.len() as u64,
            payload,
            checksum,
        })
    }
}
