//! Allocator interface and reference-counted allocator handles.
//!
//! Every heap-owning structure in this crate is parameterised by an
//! [`AllocatorRef`] rather than reaching for the global allocator
//! directly. The reference decides at construction time whether the
//! allocator wants its handles counted ([`Allocator::tracks_ref_count`])
//! and maintains the count across clones and drops; the common case (the
//! global heap) never touches an atomic.
//!
//! # Contract
//!
//! `alloc` returns memory aligned to the requested layout or fails with
//! [`AllocError::OutOfMemory`]. `dealloc` must receive the exact layout
//! the allocation was made with; handing back a different size or
//! alignment is undefined behaviour on the system allocator and a loud
//! panic on the [`TestingAllocator`].
//!
//! # Thread Safety
//!
//! Allocators are `Send + Sync`; a single allocator instance may serve
//! containers on many threads at once.

mod heap;
mod testing;

pub use heap::{global_heap, HeapAllocator};
pub use testing::TestingAllocator;

use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::error::AllocResult;

/// Polymorphic allocation capability
///
/// Implementations provide raw memory; typed helpers live on
/// [`AllocatorRef`]. The refcount hooks are no-ops unless
/// `tracks_ref_count` returns true.
pub trait Allocator: Send + Sync {
    /// Allocate `layout.size()` bytes aligned to `layout.align()`
    ///
    /// The returned pointer is non-null and uninitialised.
    fn alloc(&self, layout: Layout) -> AllocResult<NonNull<u8>>;

    /// Release memory previously returned by [`Allocator::alloc`]
    ///
    /// # Safety
    ///
    /// `ptr` must come from `alloc` on this allocator with this exact
    /// `layout`, and must not have been freed already.
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout);

    /// Whether holders of an [`AllocatorRef`] to this allocator must
    /// maintain its reference count
    fn tracks_ref_count(&self) -> bool {
        false
    }

    /// Register one additional live handle (tracked allocators only)
    fn inc_ref(&self) {}

    /// Release one live handle (tracked allocators only)
    fn dec_ref(&self) {}
}

/// A shared, optionally counted handle to an [`Allocator`]
///
/// Containers own one of these and route every allocation through it.
/// The null ref exists so empty containers can be built in `const`
/// contexts; allocating through a null ref is a logic error.
///
/// # Lifetime discipline
///
/// Construction from a tracked allocator calls `inc_ref` exactly once.
/// `Clone` increments again; `Drop` decrements; moves transfer the
/// handle without refcount traffic. For untracked allocators (the global
/// heap) none of the hooks fire.
pub struct AllocatorRef {
    inner: Option<Arc<dyn Allocator>>,
    tracked: bool,
}

impl AllocatorRef {
    /// An empty reference; usable only as a placeholder
    pub const fn null() -> Self {
        Self {
            inner: None,
            tracked: false,
        }
    }

    /// Wrap an allocator, consulting [`Allocator::tracks_ref_count`]
    pub fn new(allocator: Arc<dyn Allocator>) -> Self {
        let tracked = allocator.tracks_ref_count();
        if tracked {
            allocator.inc_ref();
        }
        Self {
            inner: Some(allocator),
            tracked,
        }
    }

    /// Reference to the process-wide heap allocator
    ///
    /// The fast path: the heap allocator is untracked, so clones of this
    /// ref never touch an atomic.
    pub fn global_heap() -> Self {
        Self {
            inner: Some(global_heap().clone()),
            tracked: false,
        }
    }

    /// True for [`AllocatorRef::null`]
    #[inline]
    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    /// Whether this handle participates in reference counting
    #[inline]
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// Allocate raw bytes
    ///
    /// # Panics
    ///
    /// Panics if the reference is null.
    pub fn alloc(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        self.allocator().alloc(layout)
    }

    /// Release raw bytes
    ///
    /// # Safety
    ///
    /// Same contract as [`Allocator::dealloc`].
    pub unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        self.allocator().dealloc(ptr, layout);
    }

    /// Allocate an uninitialised buffer of `count` elements of `T`
    ///
    /// `align` must be a multiple of `align_of::<T>()`; container code
    /// uses this to over-align SIMD-searchable buffers to 64 bytes.
    pub fn alloc_buffer<T>(&self, count: usize, align: usize) -> AllocResult<NonNull<T>> {
        let layout = Self::buffer_layout::<T>(count, align);
        Ok(self.alloc(layout)?.cast())
    }

    /// Release a buffer from [`AllocatorRef::alloc_buffer`]
    ///
    /// # Safety
    ///
    /// `count` and `align` must match the original allocation exactly.
    pub unsafe fn dealloc_buffer<T>(&self, ptr: NonNull<T>, count: usize, align: usize) {
        let layout = Self::buffer_layout::<T>(count, align);
        self.dealloc(ptr.cast(), layout);
    }

    fn buffer_layout<T>(count: usize, align: usize) -> Layout {
        assert!(
            align % std::mem::align_of::<T>() == 0,
            "buffer alignment {align} is not a multiple of the element alignment"
        );
        let size = std::mem::size_of::<T>()
            .checked_mul(count)
            .expect("buffer size overflows usize");
        Layout::from_size_align(size, align).expect("invalid buffer layout")
    }

    fn allocator(&self) -> &dyn Allocator {
        self.inner
            .as_deref()
            .expect("allocation through a null AllocatorRef")
    }
}

impl Default for AllocatorRef {
    fn default() -> Self {
        Self::null()
    }
}

impl Clone for AllocatorRef {
    fn clone(&self) -> Self {
        if self.tracked {
            self.allocator().inc_ref();
        }
        Self {
            inner: self.inner.clone(),
            tracked: self.tracked,
        }
    }
}

impl Drop for AllocatorRef {
    fn drop(&mut self) {
        if self.tracked {
            if let Some(allocator) = self.inner.as_deref() {
                allocator.dec_ref();
            }
        }
    }
}

impl PartialEq for AllocatorRef {
    /// Identity comparison: two refs are equal when they point at the
    /// same allocator instance (or are both null).
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for AllocatorRef {}

impl fmt::Debug for AllocatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            None => f.write_str("AllocatorRef(null)"),
            Some(alloc) => write!(
                f,
                "AllocatorRef({:p}, tracked: {})",
                Arc::as_ptr(alloc),
                self.tracked
            ),
        }
    }
}
