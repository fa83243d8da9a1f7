//! Load-balanced job dispatch over a fixed worker set.

use std::sync::atomic::{AtomicU32, Ordering};

use super::future::JobFuture;
use super::thread::{JobContainer, JobThread};
use crate::util::atomic;

/// A fixed pool of job worker threads
///
/// The worker count is set at construction and never changes; replacing
/// the system is the only way to resize it. Dropping the system drains
/// every queue, then shuts the workers down.
pub struct JobSystem {
    threads: Box<[JobThread]>,
    /// Round-robin cursor for tie-breaking, one past the last choice
    next: AtomicU32,
}

impl JobSystem {
    /// Spawn `thread_count` workers
    ///
    /// # Panics
    ///
    /// Panics when `thread_count` is zero or a worker thread cannot be
    /// spawned.
    pub fn new(thread_count: usize) -> Self {
        assert!(thread_count > 0, "job system needs at least one worker");
        log::debug!("job system starting {thread_count} workers");
        Self {
            threads: (0..thread_count).map(JobThread::spawn).collect(),
            next: AtomicU32::new(0),
        }
    }

    /// Spawn one worker per available core, leaving one for the caller
    pub fn with_default_threads() -> Self {
        Self::new(Self::default_thread_count())
    }

    /// Worker count [`JobSystem::with_default_threads`] would use
    pub fn default_thread_count() -> usize {
        num_cpus::get().saturating_sub(1).max(1)
    }

    /// Number of workers
    #[inline]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Dispatch `job` to the optimal worker, returning its future
    ///
    /// The job runs exactly once, from start to end, on its worker.
    /// FIFO relative to other jobs on the same worker only.
    pub fn run_job<R, F>(&self, job: F) -> JobFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (future, promise) = JobFuture::channel();
        let container = JobContainer::new(move || promise.complete(job()));
        self.optimal_thread().enqueue(container);
        future
    }

    /// Block until every worker is idle and every queue is empty
    pub fn wait_idle(&self) {
        atomic::yield_until(|| self.threads.iter().all(JobThread::is_idle));
    }

    /// Pick the worker for the next job
    ///
    /// The first fully idle worker wins outright. Otherwise the worker
    /// with the shortest queue wins, ties resolved by scanning from one
    /// past the previous choice; the cursor is stored for next time.
    fn optimal_thread(&self) -> &JobThread {
        for thread in self.threads.iter() {
            if thread.is_idle() {
                return thread;
            }
        }

        let count = self.threads.len();
        let start = self.next.load(Ordering::Relaxed) as usize % count;
        let mut best_index = start;
        let mut best_len = usize::MAX;
        for offset in 0..count {
            let index = (start + offset) % count;
            let len = self.threads[index].queued_len();
            if len < best_len {
                best_index = index;
                best_len = len;
            }
        }

        self.next
            .store(((best_index + 1) % count) as u32, Ordering::Relaxed);
        &self.threads[best_index]
    }
}

impl Drop for JobSystem {
    /// Drain, then shut down; never cancels dispatched jobs
    fn drop(&mut self) {
        self.wait_idle();
        log::debug!("job system shutting down {} workers", self.threads.len());
        // JobThread::drop signals each kill flag and joins
    }
}
