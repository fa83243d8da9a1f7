//! Lock-free counting and polling shared by the allocator handles and
//! the job system.
//!
//! Two concerns in this crate coordinate across threads without taking
//! a lock: tracked allocators audit how many
//! [`AllocatorRef`](crate::alloc::AllocatorRef) handles are alive, and
//! waiters (a future awaiting its job, the job system draining its
//! workers) poll a condition until it flips. Keeping both here keeps
//! the memory-ordering choices in one place: counter updates retry a
//! weak CAS with acquire/release ordering, and polling yields the
//! thread between checks instead of spinning hot.

use std::sync::atomic::{AtomicU32, Ordering};

/// Record one more live handle, returning the previous count
pub fn fetch_increment(counter: &AtomicU32) -> u32 {
    // fetch_update retries a weak CAS until the closure's value sticks.
    match counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
        count.checked_add(1)
    }) {
        Ok(previous) => previous,
        Err(count) => panic!("handle refcount overflow at {count}"),
    }
}

/// Release one live handle, returning the previous count
///
/// # Panics
///
/// Panics on underflow: a release with no matching retain is a
/// bookkeeping bug in the caller, not a recoverable state.
pub fn fetch_decrement(counter: &AtomicU32) -> u32 {
    match counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
        count.checked_sub(1)
    }) {
        Ok(previous) => previous,
        Err(_) => panic!("handle refcount underflow: release without a matching retain"),
    }
}

/// Yield the current thread until `condition` holds
///
/// The job system blocks this way rather than on an OS primitive: a
/// pending result is produced by a running worker, so the wait is
/// bounded by the queue in front of it.
pub fn yield_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    while !condition() {
        std::thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_increment_decrement() {
        let counter = AtomicU32::new(0);
        assert_eq!(fetch_increment(&counter), 0);
        assert_eq!(fetch_increment(&counter), 1);
        assert_eq!(fetch_decrement(&counter), 2);
        assert_eq!(counter.load(Ordering::Acquire), 1);
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn test_decrement_underflow_panics() {
        let counter = AtomicU32::new(0);
        fetch_decrement(&counter);
    }

    #[test]
    fn test_concurrent_increment() {
        let counter = Arc::new(AtomicU32::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        fetch_increment(&counter);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.load(Ordering::Acquire), 8000);
    }

    #[test]
    fn test_yield_until_observes_other_thread() {
        let flag = Arc::new(AtomicU32::new(0));
        let setter = {
            let flag = Arc::clone(&flag);
            thread::spawn(move || flag.store(1, Ordering::Release))
        };

        yield_until(|| flag.load(Ordering::Acquire) == 1);
        setter.join().unwrap();
    }
}
