//! keel - Foundation Containers and Concurrency Primitives
//!
//! ============================================================================
//! CRATE OVERVIEW
//! ============================================================================
//!
//! keel is a foundation layer for systems programming: the containers,
//! strings, synchronization, and concurrency pieces an application would
//! otherwise pull from the standard library, with four distinguishing
//! properties:
//!
//! 1. PLUGGABLE ALLOCATORS
//!    Every heap-owning structure is parameterised by an
//!    [`AllocatorRef`], an optionally reference-counted handle threaded
//!    through all allocations. The [`TestingAllocator`] turns leaks,
//!    double frees, and dangling handles into loud test failures.
//!
//! 2. SIMD-ACCELERATED HOT PATHS
//!    Element find, byte comparison, and hash-map probing dispatch once
//!    per process to the best available kernel ([`simd::level`]) and
//!    fall back to scalar everywhere else.
//!
//! 3. SWISS-TABLE HASHING
//!    [`HashMap`] stores a 7-bit tag per slot and probes whole groups
//!    with a broadcast compare: tombstone-free, cache-friendly, and
//!    rehash never re-hashes a key.
//!
//! 4. SSO STRINGS WITH GLOBAL INTERNING
//!    [`Utf8String`] keeps up to 30 bytes inline and tracks both byte
//!    and code-point lengths; [`GlobalString`] compresses process-wide
//!    immutable strings into 4-byte ids behind a reader-writer lock.
//!
//! # Module map
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`alloc`] | `Allocator` trait, heap/testing allocators, `AllocatorRef` |
//! | [`simd`] | runtime kernel dispatch: find, compare, tag scan |
//! | [`array`] | `Array<T>` growable sequence |
//! | [`map`] | `HashMap<K, V>` Swiss-table |
//! | [`string`] | `Utf8String`, formatting, conversion, `GlobalString` |
//! | [`sync`] | `Mutex`/`RwLock` with drop guards |
//! | [`job`] | worker threads, ring queues, blocking futures |
//!
//! # Example
//!
//! ```
//! use keel::{Array, HashMap, JobSystem, Utf8String};
//!
//! let mut words: Array<Utf8String> = Array::new();
//! words.push(Utf8String::from("systems"));
//!
//! let mut index: HashMap<Utf8String, usize> = HashMap::new();
//! index.insert(words[0].clone(), 0);
//!
//! let jobs = JobSystem::new(2);
//! let future = jobs.run_job(|| 2 + 2);
//! assert_eq!(future.wait(), 4);
//! ```
//!
//! # Errors and panics
//!
//! Recoverable failures (allocation, UTF-8 validation, format/parse) are
//! `Result`s from the `try_` and validating constructors; the plain
//! variants treat allocation failure as fatal. Misuse (double frees,
//! out-of-bounds indices, ring overflow, refcount underflow) panics
//! with context.

pub mod alloc;
pub mod array;
pub mod error;
pub mod job;
pub mod map;
pub mod simd;
pub mod string;
pub mod sync;
pub mod util;

pub use alloc::{global_heap, Allocator, AllocatorRef, HeapAllocator, TestingAllocator};
pub use array::Array;
pub use error::{AllocError, FormatError, ParseError, Utf8Error};
pub use job::{JobFuture, JobSystem};
pub use map::HashMap;
pub use string::{GlobalString, ToUtf8, Utf8String};
pub use sync::{Mutex, RwLock};

static_assertions::assert_impl_all!(AllocatorRef: Send, Sync);
static_assertions::assert_impl_all!(Array<u8>: Send, Sync);
static_assertions::assert_impl_all!(HashMap<u64, u64>: Send, Sync);
static_assertions::assert_impl_all!(JobSystem: Send, Sync);
