//! Worker threads consuming per-thread ring queues.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use super::ring_queue::RingQueue;

/// Jobs each worker can hold before dispatch must back off
pub const JOB_QUEUE_CAPACITY: usize = 8192;

/// A queued unit of work: invoke once, then gone
///
/// A boxed callable carries the bound arguments and the future handle in
/// its captures; invoking it runs the job and delivers the result.
pub(crate) struct JobContainer {
    invoke: Box<dyn FnOnce() + Send>,
}

impl JobContainer {
    pub fn new<F: FnOnce() + Send + 'static>(job: F) -> Self {
        Self {
            invoke: Box::new(job),
        }
    }

    pub fn invoke(self) {
        (self.invoke)();
    }
}

/// State shared between a worker thread and its dispatcher
struct ThreadShared {
    /// Incoming jobs; swapped wholesale into the worker's active ring
    queue: Mutex<RingQueue<JobContainer>>,
    wake: Condvar,
    /// The worker is between collecting jobs and finishing its batch
    is_executing: AtomicBool,
    /// Observed on the next wake; the worker returns once drained
    pending_kill: AtomicBool,
    /// Mirror of the queue length so the dispatcher can rank workers
    /// without taking every lock
    queued: AtomicUsize,
}

/// One worker: an OS thread plus its queue and flags
pub(crate) struct JobThread {
    shared: Arc<ThreadShared>,
    handle: Option<JoinHandle<()>>,
}

impl JobThread {
    /// Spawn the worker thread
    pub fn spawn(index: usize) -> Self {
        let shared = Arc::new(ThreadShared {
            queue: Mutex::new(RingQueue::with_capacity(JOB_QUEUE_CAPACITY)),
            wake: Condvar::new(),
            is_executing: AtomicBool::new(false),
            pending_kill: AtomicBool::new(false),
            queued: AtomicUsize::new(0),
        });

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("keel-job-{index}"))
            .spawn(move || worker_loop(&worker))
            .expect("failed to spawn job worker thread");
        log::debug!("job worker {index} spawned");

        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Hand a job to this worker and wake it
    ///
    /// # Panics
    ///
    /// Panics when the worker's ring is full; a dispatcher queueing
    /// thousands of jobs faster than any worker drains them is a logic
    /// error, not a recoverable condition.
    pub fn enqueue(&self, job: JobContainer) {
        {
            let mut queue = self.shared.queue.lock();
            queue.push(job);
            self.shared.queued.store(queue.len(), Ordering::Release);
        }
        self.shared.wake.notify_one();
    }

    /// Whether the worker is mid-batch
    #[inline]
    pub fn is_executing(&self) -> bool {
        self.shared.is_executing.load(Ordering::Acquire)
    }

    /// Jobs waiting in the queued ring (dispatcher-visible mirror)
    #[inline]
    pub fn queued_len(&self) -> usize {
        self.shared.queued.load(Ordering::Acquire)
    }

    /// Neither executing nor holding queued jobs
    ///
    /// Reads the queue mirror before the executing flag: the worker sets
    /// `is_executing` before zeroing the mirror, so a batch in flight is
    /// visible through one or the other.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.queued_len() == 0 && !self.is_executing()
    }
}

impl Drop for JobThread {
    /// Signal the kill flag and join; queued jobs still drain first
    fn drop(&mut self) {
        self.shared.pending_kill.store(true, Ordering::Release);
        self.shared.wake.notify_one();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("job worker thread panicked");
            }
        }
    }
}

/// The worker loop: sleep, swap the queued ring into the active ring
/// under one lock, run every job outside it, recheck, sleep again.
fn worker_loop(shared: &ThreadShared) {
    let mut active: RingQueue<JobContainer> = RingQueue::with_capacity(JOB_QUEUE_CAPACITY);

    loop {
        {
            let mut queue = shared.queue.lock();
            while queue.is_empty() && !shared.pending_kill.load(Ordering::Acquire) {
                shared.wake.wait(&mut queue);
            }
            if queue.is_empty() {
                // Kill observed with nothing left to drain
                return;
            }
            shared.is_executing.store(true, Ordering::Release);
            queue.drain_into(&mut active);
            shared.queued.store(0, Ordering::Release);
        }

        while let Some(job) = active.pop() {
            job.invoke();
        }

        // Batch done; only sleep when nothing arrived meanwhile
        let queue = shared.queue.lock();
        if queue.is_empty() {
            shared.is_executing.store(false, Ordering::Release);
        }
    }
}
