//! Blocking futures carrying job results across threads.

use std::sync::Arc;

use crate::sync::Mutex;

/// Shared between the worker (writer) and the waiter (reader)
struct FutureState<T> {
    ready: bool,
    value: Option<T>,
}

/// The yet-to-be-written result of a job
///
/// Exactly one waiter consumes the value: [`JobFuture::wait`] takes the
/// future by value, spins on `try_lock` yielding the thread between
/// polls, and moves the result out once the worker has set the ready
/// flag. The mutex release on the worker side makes the value visible
/// to the waiter with no extra synchronisation.
pub struct JobFuture<T> {
    state: Arc<Mutex<FutureState<T>>>,
}

impl<T> JobFuture<T> {
    /// A future and the promise that completes it
    pub(crate) fn channel() -> (JobFuture<T>, JobPromise<T>) {
        let state = Arc::new(Mutex::new(FutureState {
            ready: false,
            value: None,
        }));
        (
            JobFuture {
                state: Arc::clone(&state),
            },
            JobPromise { state },
        )
    }

    /// Whether the result has been delivered
    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    /// Block until the result arrives, then move it out
    ///
    /// Blocks by yielding, not by OS-waiting; a job runs from start to
    /// end on its worker, so the wait is bounded by the queue ahead of
    /// it.
    pub fn wait(self) -> T {
        loop {
            if let Some(mut state) = self.state.try_lock() {
                if state.ready {
                    return state.value.take().expect("job future value already taken");
                }
            }
            std::thread::yield_now();
        }
    }
}

/// Worker-side handle that delivers the result
pub(crate) struct JobPromise<T> {
    state: Arc<Mutex<FutureState<T>>>,
}

impl<T> JobPromise<T> {
    /// Write the value and flip the ready flag
    pub fn complete(self, value: T) {
        let mut state = self.state.lock();
        debug_assert!(!state.ready, "job promise completed twice");
        state.value = Some(value);
        state.ready = true;
    }
}
