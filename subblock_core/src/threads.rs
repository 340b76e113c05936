//! Work partitioning for the fork-join engines.

use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crate::error::{panic_message, ErrorKind, WorkerResult};
use crate::options::CompressionOptions;

/// Minimum number of work units a thread must receive before another thread
/// is added.
pub const DEFAULT_OVERHEAD_FLOOR: usize = 16;

/// Number of threads a workload of `units` justifies, ignoring processor
/// limits: one thread per `overhead_floor` units, at least one.
pub fn threads_for(units: usize, overhead_floor: usize) -> usize {
    (units / overhead_floor.max(1)).max(1)
}

/// Threads to use for `units` work units under `options`.
pub fn thread_count(options: &CompressionOptions, units: usize) -> usize {
    if !options.parallel {
        return 1;
    }
    let cap = options.max_processors.max(1) as usize;
    cap.min(threads_for(units, DEFAULT_OVERHEAD_FLOOR))
}

/// Split `0..units` into `threads` contiguous, ordered, non-overlapping
/// ranges. Every range has `units / threads` elements except the last, which
/// absorbs the remainder.
pub fn partition(units: usize, threads: usize) -> Vec<Range<usize>> {
    let threads = threads.clamp(1, units.max(1));
    let per_thread = units / threads;
    (0..threads)
        .map(|i| {
            let start = i * per_thread;
            let end = if i + 1 < threads { start + per_thread } else { units };
            start..end
        })
        .collect()
}

/// Run `work` once per job and return the outcomes in job order.
///
/// A single job runs on the calling thread; otherwise every job gets its own
/// scoped thread and all of them are joined before returning. A panicking
/// worker is reported as [`ErrorKind::UnknownWorkerError`].
pub(crate) fn fork_join<I, T, F>(jobs: Vec<I>, work: F) -> Vec<WorkerResult<T>>
where
    I: Send,
    T: Send,
    F: Fn(I) -> WorkerResult<T> + Sync,
{
    let lost = |payload: Box<dyn Any + Send>| -> WorkerResult<T> {
        Err(vec![ErrorKind::UnknownWorkerError(panic_message(payload.as_ref()))])
    };

    if jobs.len() == 1 {
        return jobs
            .into_iter()
            .map(|job| panic::catch_unwind(AssertUnwindSafe(|| work(job))).unwrap_or_else(lost))
            .collect();
    }

    thread::scope(|scope| {
        let work = &work;
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| scope.spawn(move || work(job)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(lost))
            .collect()
    })
}
