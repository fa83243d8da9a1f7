//! Leak- and misuse-detecting allocator for tests.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{global_heap, Allocator};
use crate::error::AllocResult;
use crate::util::atomic;

/// Bookkeeping for one live allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LiveAllocation {
    size: usize,
    align: usize,
}

/// Allocator that audits every allocation it hands out
///
/// Tracks reference counts: every [`AllocatorRef`](super::AllocatorRef)
/// pointing at it registers itself, so a handle outliving the allocator
/// is caught at drop.
///
/// Fatal conditions (panics):
/// - freeing a pointer twice
/// - freeing a pointer this allocator never produced
/// - freeing with a size or alignment different from the allocation
/// - dropping the allocator while allocations are live (leak)
/// - dropping the allocator while refs are outstanding
pub struct TestingAllocator {
    /// ptr -> recorded layout for every outstanding allocation
    live: Mutex<FxHashMap<usize, LiveAllocation>>,
    /// Every pointer that has been freed and not re-issued since
    freed: Mutex<FxHashSet<usize>>,
    /// Live AllocatorRef handles
    ref_count: AtomicU32,
    /// Total successful allocations over the allocator's lifetime
    total_allocations: AtomicUsize,
    /// Bytes currently outstanding
    bytes_in_use: AtomicUsize,
}

impl TestingAllocator {
    /// Create a fresh allocator with no outstanding state
    pub fn new() -> Self {
        Self {
            live: Mutex::new(FxHashMap::default()),
            freed: Mutex::new(FxHashSet::default()),
            ref_count: AtomicU32::new(0),
            total_allocations: AtomicUsize::new(0),
            bytes_in_use: AtomicUsize::new(0),
        }
    }

    /// Number of allocations currently outstanding
    pub fn live_allocations(&self) -> usize {
        self.live.lock().len()
    }

    /// Bytes currently outstanding
    pub fn bytes_in_use(&self) -> usize {
        self.bytes_in_use.load(Ordering::Relaxed)
    }

    /// Total successful allocations so far
    pub fn total_allocations(&self) -> usize {
        self.total_allocations.load(Ordering::Relaxed)
    }

    /// Number of live [`AllocatorRef`](super::AllocatorRef) handles
    pub fn ref_count(&self) -> u32 {
        self.ref_count.load(Ordering::Acquire)
    }
}

impl Default for TestingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator for TestingAllocator {
    fn alloc(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        let ptr = global_heap().alloc(layout)?;
        let addr = ptr.as_ptr() as usize;

        self.live.lock().insert(
            addr,
            LiveAllocation {
                size: layout.size(),
                align: layout.align(),
            },
        );
        // The heap may re-issue a freed address; it is live again now.
        self.freed.lock().remove(&addr);

        self.total_allocations.fetch_add(1, Ordering::Relaxed);
        self.bytes_in_use.fetch_add(layout.size(), Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        let addr = ptr.as_ptr() as usize;

        assert!(
            !self.freed.lock().contains(&addr),
            "double free of {addr:#x} ({} bytes, align {})",
            layout.size(),
            layout.align()
        );

        let recorded = self.live.lock().remove(&addr).unwrap_or_else(|| {
            panic!("free of foreign pointer {addr:#x}: not allocated by this allocator")
        });
        assert_eq!(
            recorded,
            LiveAllocation {
                size: layout.size(),
                align: layout.align()
            },
            "free of {addr:#x} with mismatched layout: allocated as {}/{}, freed as {}/{}",
            recorded.size,
            recorded.align,
            layout.size(),
            layout.align()
        );

        self.freed.lock().insert(addr);
        self.bytes_in_use.fetch_sub(layout.size(), Ordering::Relaxed);

        global_heap().dealloc(ptr, layout);
    }

    fn tracks_ref_count(&self) -> bool {
        true
    }

    fn inc_ref(&self) {
        atomic::fetch_increment(&self.ref_count);
    }

    fn dec_ref(&self) {
        atomic::fetch_decrement(&self.ref_count);
    }
}

impl Drop for TestingAllocator {
    fn drop(&mut self) {
        let live = self.live.get_mut();
        assert!(
            live.is_empty(),
            "TestingAllocator dropped with {} live allocations ({} bytes leaked)",
            live.len(),
            self.bytes_in_use.load(Ordering::Relaxed)
        );

        let refs = self.ref_count.load(Ordering::Acquire);
        assert!(
            refs == 0,
            "TestingAllocator dropped with {refs} outstanding AllocatorRef handles"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: usize, align: usize) -> Layout {
        Layout::from_size_align(size, align).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let alloc = TestingAllocator::new();
        let l = layout(64, 16);

        let ptr = alloc.alloc(l).unwrap();
        assert_eq!(alloc.live_allocations(), 1);
        assert_eq!(alloc.bytes_in_use(), 64);
        assert_eq!(ptr.as_ptr() as usize % 16, 0);

        unsafe { alloc.dealloc(ptr, l) };
        assert_eq!(alloc.live_allocations(), 0);
        assert_eq!(alloc.bytes_in_use(), 0);
        assert_eq!(alloc.total_allocations(), 1);
    }

    #[test]
    #[should_panic(expected = "double free")]
    fn test_double_free_panics() {
        let alloc = TestingAllocator::new();
        let l = layout(32, 8);
        let ptr = alloc.alloc(l).unwrap();
        unsafe {
            alloc.dealloc(ptr, l);
            alloc.dealloc(ptr, l);
        }
    }

    #[test]
    #[should_panic(expected = "foreign pointer")]
    fn test_foreign_free_panics() {
        let alloc = TestingAllocator::new();
        let l = layout(32, 8);
        let ptr = global_heap().alloc(l).unwrap();
        unsafe { alloc.dealloc(ptr, l) };
    }

    #[test]
    #[should_panic(expected = "mismatched layout")]
    fn test_mismatched_layout_panics() {
        let alloc = TestingAllocator::new();
        let ptr = alloc.alloc(layout(32, 8)).unwrap();
        unsafe { alloc.dealloc(ptr, layout(16, 8)) };
    }

    #[test]
    #[should_panic(expected = "live allocations")]
    fn test_leak_panics_on_drop() {
        let alloc = TestingAllocator::new();
        let _leaked = alloc.alloc(layout(8, 8)).unwrap();
        drop(alloc);
    }

    #[test]
    fn test_address_reuse_is_not_double_free() {
        let alloc = TestingAllocator::new();
        let l = layout(48, 8);

        // Free then allocate repeatedly; if the heap re-issues the same
        // address, the allocator must treat it as live again.
        for _ in 0..16 {
            let ptr = alloc.alloc(l).unwrap();
            unsafe { alloc.dealloc(ptr, l) };
        }
        assert_eq!(alloc.live_allocations(), 0);
    }
}
