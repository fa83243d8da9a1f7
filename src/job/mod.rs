//! Cooperative job system: worker threads, ring queues, blocking futures.
//!
//! A [`JobSystem`] owns a fixed set of worker threads, each with its own
//! mutex-guarded ring queue. [`JobSystem::run_job`] picks the least
//! loaded worker, enqueues a type-erased closure, and hands back a
//! [`JobFuture`] that the producing worker completes. Futures block by
//! yielding, not by suspending; this is a thread pool, not an async
//! runtime.
//!
//! Jobs queued to the same worker run in FIFO order; jobs on different
//! workers have no relative ordering. There is no cancellation: a
//! dispatched job always runs, and dropping the system drains every
//! queue before the workers shut down.
//!
//! # Example
//!
//! ```
//! use keel::job::JobSystem;
//!
//! let jobs = JobSystem::new(4);
//! let future = jobs.run_job(|| 6 * 7);
//! assert_eq!(future.wait(), 42);
//! ```

mod future;
mod ring_queue;
mod system;
mod thread;

pub use future::JobFuture;
pub use ring_queue::RingQueue;
pub use system::JobSystem;
pub use thread::JOB_QUEUE_CAPACITY;
