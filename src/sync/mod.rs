//! Thin mutex and reader-writer wrappers with drop guards.
//!
//! [`Mutex`] and [`RwLock`] hold their protected value inline and hand
//! out guards that release on drop and deref to the data. They are thin
//! newtypes over `parking_lot`: non-reentrant, no poisoning, writer
//! preference delegated to the platform primitive. The job system and
//! the global string registry are built on these.
//!
//! # Example
//!
//! ```
//! use keel::sync::Mutex;
//!
//! let counter = Mutex::new(0u64);
//! *counter.lock() += 1;
//! assert_eq!(*counter.lock(), 1);
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};

/// Mutual exclusion holding `T` inline
pub struct Mutex<T> {
    inner: parking_lot::Mutex<T>,
}

impl<T> Mutex<T> {
    /// Wrap `value` in an unlocked mutex
    #[inline]
    pub const fn new(value: T) -> Self {
        Self {
            inner: parking_lot::Mutex::new(value),
        }
    }

    /// Block until the lock is held
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        MutexGuard {
            inner: self.inner.lock(),
        }
    }

    /// Take the lock only if it is free
    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.inner.try_lock().map(|inner| MutexGuard { inner })
    }

    /// Access the value without locking (requires exclusive borrow)
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// Consume the mutex, returning the value
    #[inline]
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_tuple("Mutex").field(&*guard).finish(),
            None => f.write_str("Mutex(<locked>)"),
        }
    }
}

/// Exclusive access to a [`Mutex`]'s value; unlocks on drop
pub struct MutexGuard<'a, T> {
    inner: parking_lot::MutexGuard<'a, T>,
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

/// Many-reader / one-writer lock holding `T` inline
pub struct RwLock<T> {
    inner: parking_lot::RwLock<T>,
}

impl<T> RwLock<T> {
    /// Wrap `value` in an unlocked rw-lock
    #[inline]
    pub const fn new(value: T) -> Self {
        Self {
            inner: parking_lot::RwLock::new(value),
        }
    }

    /// Block until shared read access is held
    #[inline]
    pub fn read(&self) -> ReadGuard<'_, T> {
        ReadGuard {
            inner: self.inner.read(),
        }
    }

    /// Block until exclusive write access is held
    #[inline]
    pub fn write(&self) -> WriteGuard<'_, T> {
        WriteGuard {
            inner: self.inner.write(),
        }
    }

    /// Take read access only if no writer holds or awaits the lock
    #[inline]
    pub fn try_read(&self) -> Option<ReadGuard<'_, T>> {
        self.inner.try_read().map(|inner| ReadGuard { inner })
    }

    /// Take write access only if the lock is free
    #[inline]
    pub fn try_write(&self) -> Option<WriteGuard<'_, T>> {
        self.inner.try_write().map(|inner| WriteGuard { inner })
    }

    /// Access the value without locking (requires exclusive borrow)
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// Consume the lock, returning the value
    #[inline]
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default> Default for RwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for RwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_read() {
            Some(guard) => f.debug_tuple("RwLock").field(&*guard).finish(),
            None => f.write_str("RwLock(<locked>)"),
        }
    }
}

/// Shared access to an [`RwLock`]'s value; unlocks on drop
pub struct ReadGuard<'a, T> {
    inner: parking_lot::RwLockReadGuard<'a, T>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.inner
    }
}

/// Exclusive access to an [`RwLock`]'s value; unlocks on drop
pub struct WriteGuard<'a, T> {
    inner: parking_lot::RwLockWriteGuard<'a, T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_mutex_basic() {
        let m = Mutex::new(5);
        {
            let mut guard = m.lock();
            *guard += 1;
        }
        assert_eq!(*m.lock(), 6);
        assert_eq!(m.into_inner(), 6);
    }

    #[test]
    fn test_try_lock_contended() {
        let m = Mutex::new(());
        let held = m.lock();
        assert!(m.try_lock().is_none());
        drop(held);
        assert!(m.try_lock().is_some());
    }

    #[test]
    fn test_mutex_exclusion() {
        // At most one holder at a time, observed via a shadow counter.
        let m = Arc::new(Mutex::new(0u64));
        let holders = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&m);
                let holders = Arc::clone(&holders);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let mut guard = m.lock();
                        assert_eq!(holders.fetch_add(1, Ordering::SeqCst), 0);
                        *guard += 1;
                        holders.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*m.lock(), 8000);
    }

    #[test]
    fn test_rwlock_many_readers() {
        let lock = Arc::new(RwLock::new(7));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    let guard = lock.read();
                    thread::sleep(Duration::from_millis(5));
                    *guard
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 7);
        }
    }

    #[test]
    fn test_rwlock_writer_excludes_readers() {
        let lock = RwLock::new(1);
        let writing = lock.write();
        assert!(lock.try_read().is_none());
        assert!(lock.try_write().is_none());
        drop(writing);
        assert!(lock.try_read().is_some());
    }

    #[test]
    fn test_rwlock_write_visible_to_readers() {
        let lock = Arc::new(RwLock::new(0));
        {
            *lock.write() = 42;
        }
        assert_eq!(*lock.read(), 42);
    }

    #[test]
    fn test_get_mut_bypasses_locking() {
        let mut m = Mutex::new(3);
        *m.get_mut() = 4;
        assert_eq!(*m.lock(), 4);
    }
}
