//! Utf8String - Small-string-optimised UTF-8 text.
//!
//! A [`Utf8String`] starts life inline: up to 30 bytes of content live
//! directly in the value, null-terminated, with no allocation. The first
//! append that would not fit moves the content into a heap buffer whose
//! capacity is always a multiple of 64; from then on the string stays
//! heap-backed even if it shrinks, reusing its allocation. Every byte of
//! a buffer past the used range is zero, so the used range is always
//! null-terminated as well.
//!
//! The string tracks both its byte count ([`Utf8String::bytes_used`])
//! and its code-point count ([`Utf8String::len`]); both are maintained
//! on every edit. All content is valid UTF-8: the checked constructors
//! ([`Utf8String::from_bytes`]) validate, everything else builds on
//! already-valid text.
//!
//! Heap buffers come from the global heap allocator and are released on
//! drop.
//!
//! # Example
//!
//! ```
//! use keel::string::Utf8String;
//!
//! let mut greeting = Utf8String::from("Hallo");
//! greeting += ", Übergrößenträger";
//! assert_eq!(greeting.len(), 23);       // code points
//! assert_eq!(greeting.bytes_used(), 27); // bytes
//! assert_eq!(greeting.find("größ"), Some(12));
//! ```

pub mod convert;
pub mod format;
pub mod global;
pub mod utf8;

pub use convert::ToUtf8;
pub use format::format;
pub use global::GlobalString;

use std::alloc::Layout;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign};
use std::ptr::{self, NonNull};
use std::str::FromStr;

use crate::alloc::{global_heap, Allocator};
use crate::array::Probe;
use crate::error::{ParseError, Utf8Result};
use crate::simd;

/// Maximum content bytes stored inline
pub const SSO_CAPACITY: usize = 30;

/// Heap buffers are 64-byte aligned and sized in 64-byte multiples
const HEAP_ALIGN: usize = 64;

enum Rep {
    /// Inline storage: `buf[..bytes]` is content, everything after is
    /// zero (which doubles as the terminator)
    Sso {
        buf: [u8; SSO_CAPACITY + 1],
        bytes: u8,
        chars: u8,
    },
    /// Heap storage: `cap` is a multiple of 64, `[bytes, cap)` is zero
    Heap {
        ptr: NonNull<u8>,
        cap: usize,
        bytes: usize,
        chars: usize,
    },
}

/// An SSO UTF-8 string with cached byte and code-point lengths
pub struct Utf8String {
    rep: Rep,
}

// SAFETY: the heap buffer is uniquely owned.
unsafe impl Send for Utf8String {}
unsafe impl Sync for Utf8String {}

impl Utf8String {
    /// Empty string, inline, no allocation
    #[inline]
    pub const fn new() -> Self {
        Self {
            rep: Rep::Sso {
                buf: [0; SSO_CAPACITY + 1],
                bytes: 0,
                chars: 0,
            },
        }
    }

    /// Empty string with room for `capacity` content bytes
    pub fn with_capacity(capacity: usize) -> Self {
        let mut out = Self::new();
        if capacity > SSO_CAPACITY {
            out.ensure_capacity(capacity);
        }
        out
    }

    /// Build from raw bytes, validating UTF-8
    pub fn from_bytes(bytes: &[u8]) -> Utf8Result<Self> {
        let chars = utf8::validate(bytes)?;
        let mut out = Self::with_capacity(bytes.len());
        out.push_valid(bytes, chars);
        Ok(out)
    }

    /// Code-point count
    #[inline]
    pub fn len(&self) -> usize {
        match self.rep {
            Rep::Sso { chars, .. } => chars as usize,
            Rep::Heap { chars, .. } => chars,
        }
    }

    /// Content size in bytes
    #[inline]
    pub fn bytes_used(&self) -> usize {
        match self.rep {
            Rep::Sso { bytes, .. } => bytes as usize,
            Rep::Heap { bytes, .. } => bytes,
        }
    }

    /// Content capacity in bytes before the next reallocation
    #[inline]
    pub fn capacity(&self) -> usize {
        match self.rep {
            Rep::Sso { .. } => SSO_CAPACITY,
            // One byte is reserved for the terminator
            Rep::Heap { cap, .. } => cap - 1,
        }
    }

    /// True when no content is stored
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes_used() == 0
    }

    /// True while the content still lives inline
    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self.rep, Rep::Sso { .. })
    }

    /// Content bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.rep {
            Rep::Sso { buf, bytes, .. } => &buf[..*bytes as usize],
            Rep::Heap { ptr, bytes, .. } => {
                // SAFETY: [0, bytes) of the heap buffer is initialised content.
                unsafe { std::slice::from_raw_parts(ptr.as_ptr(), *bytes) }
            }
        }
    }

    /// Content as `&str`
    #[inline]
    pub fn as_str(&self) -> &str {
        // SAFETY: every constructor and edit preserves UTF-8 validity.
        unsafe { std::str::from_utf8_unchecked(self.as_bytes()) }
    }

    /// Append already-valid text
    pub fn push_str(&mut self, text: &str) {
        self.push_valid(text.as_bytes(), utf8::char_count(text));
    }

    /// Append one code point
    pub fn push(&mut self, ch: char) {
        let mut buf = [0u8; 4];
        self.push_valid(ch.encode_utf8(&mut buf).as_bytes(), 1);
    }

    /// Drop all content, keeping the representation and capacity
    pub fn clear(&mut self) {
        match &mut self.rep {
            Rep::Sso { buf, bytes, chars } => {
                buf[..*bytes as usize].fill(0);
                *bytes = 0;
                *chars = 0;
            }
            Rep::Heap { ptr, bytes, chars, .. } => {
                // SAFETY: the used range is within the buffer; zeroing
                // restores the padded-with-zero invariant.
                unsafe {
                    ptr::write_bytes(ptr.as_ptr(), 0, *bytes);
                }
                *bytes = 0;
                *chars = 0;
            }
        }
    }

    /// Byte index of the leftmost occurrence of `ch`
    ///
    /// ASCII needles use the byte-broadcast kernel; multi-byte code
    /// points go through the substring scan.
    pub fn find_char(&self, ch: char) -> Option<usize> {
        if ch.is_ascii() {
            return simd::find_u8(self.as_bytes(), ch as u8);
        }
        let mut buf = [0u8; 4];
        self.find(ch.encode_utf8(&mut buf))
    }

    /// Byte index of the leftmost occurrence of `needle`
    ///
    /// Scans for the needle's first byte, then confirms the remainder
    /// bytewise. An empty needle matches at 0.
    pub fn find(&self, needle: &str) -> Option<usize> {
        let haystack = self.as_bytes();
        let needle = needle.as_bytes();
        if needle.is_empty() {
            return Some(0);
        }
        if needle.len() > haystack.len() {
            return None;
        }

        let first = needle[0];
        let mut base = 0;
        while base + needle.len() <= haystack.len() {
            let offset = simd::find_u8(&haystack[base..=haystack.len() - needle.len()], first)?;
            let start = base + offset;
            if simd::bytes_equal(&haystack[start..start + needle.len()], needle) {
                return Some(start);
            }
            base = start + 1;
        }
        None
    }

    /// Whether `needle` occurs anywhere in the content
    #[inline]
    pub fn contains(&self, needle: &str) -> bool {
        self.find(needle).is_some()
    }

    /// Whether the content begins with `prefix`
    #[inline]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.as_str().starts_with(prefix)
    }

    /// Whether the content ends with `suffix`
    #[inline]
    pub fn ends_with(&self, suffix: &str) -> bool {
        self.as_str().ends_with(suffix)
    }

    /// Copy out the byte range `[start, end)` as a new string
    ///
    /// # Panics
    ///
    /// Panics when the range is out of bounds or either end splits a
    /// code point.
    pub fn substring(&self, start: usize, end: usize) -> Utf8String {
        let text = self.as_str();
        assert!(
            start <= end && end <= text.len(),
            "substring range {start}..{end} out of bounds (bytes_used {})",
            text.len()
        );
        assert!(
            text.is_char_boundary(start) && text.is_char_boundary(end),
            "substring range {start}..{end} splits a code point"
        );
        Utf8String::from(&text[start..end])
    }

    /// Parse the content as `F`
    pub fn parse<F: FromStr>(&self) -> Result<F, ParseError> {
        self.as_str().parse().map_err(|_| ParseError {
            input: self.as_str().to_string(),
            target: std::any::type_name::<F>(),
        })
    }

    /// Append pre-validated bytes with a known code-point count
    fn push_valid(&mut self, bytes: &[u8], chars: usize) {
        if bytes.is_empty() {
            return;
        }
        let used = self.bytes_used();
        self.ensure_capacity(used + bytes.len());

        match &mut self.rep {
            Rep::Sso {
                buf,
                bytes: len,
                chars: count,
            } => {
                buf[*len as usize..*len as usize + bytes.len()].copy_from_slice(bytes);
                *len += bytes.len() as u8;
                *count += chars as u8;
            }
            Rep::Heap {
                ptr,
                bytes: len,
                chars: count,
                ..
            } => {
                // SAFETY: ensure_capacity reserved room including the
                // terminator; the tail beyond the new length stays zero.
                unsafe {
                    ptr::copy_nonoverlapping(
                        bytes.as_ptr(),
                        ptr.as_ptr().add(*len),
                        bytes.len(),
                    );
                }
                *len += bytes.len();
                *count += chars;
            }
        }
    }

    /// Make room for `required` content bytes plus the terminator
    ///
    /// The inline-to-heap transition happens here and is permanent.
    fn ensure_capacity(&mut self, required: usize) {
        match &mut self.rep {
            Rep::Sso { .. } if required <= SSO_CAPACITY => {}
            Rep::Sso { buf, bytes, chars } => {
                let content_len = *bytes as usize;
                let char_count = *chars as usize;
                let cap = Self::round_to_block(required + 1);
                let ptr = Self::alloc_zeroed(cap);
                // SAFETY: fresh zeroed buffer at least content_len long.
                unsafe {
                    ptr::copy_nonoverlapping(buf.as_ptr(), ptr.as_ptr(), content_len);
                }
                self.rep = Rep::Heap {
                    ptr,
                    cap,
                    bytes: content_len,
                    chars: char_count,
                };
            }
            Rep::Heap { ptr, cap, bytes, .. } => {
                if required < *cap {
                    return;
                }
                // Overallocate 1.5x so repeated appends amortise
                let target = (required + 1).max(*cap + *cap / 2);
                let new_cap = Self::round_to_block(target);
                let new_ptr = Self::alloc_zeroed(new_cap);
                // SAFETY: both buffers valid; old [0, bytes) initialised.
                unsafe {
                    ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), *bytes);
                    Self::release(*ptr, *cap);
                }
                *ptr = new_ptr;
                *cap = new_cap;
            }
        }
    }

    /// Heap capacities are whole 64-byte blocks
    #[inline]
    const fn round_to_block(bytes: usize) -> usize {
        (bytes + HEAP_ALIGN - 1) & !(HEAP_ALIGN - 1)
    }

    fn alloc_zeroed(cap: usize) -> NonNull<u8> {
        debug_assert!(cap % HEAP_ALIGN == 0);
        let layout = Layout::from_size_align(cap, HEAP_ALIGN).expect("invalid string layout");
        let ptr = global_heap()
            .alloc(layout)
            .unwrap_or_else(|e| panic!("string allocation failed: {e}"));
        // SAFETY: freshly allocated cap bytes; zeroing establishes the
        // padded-with-zero invariant.
        unsafe {
            ptr::write_bytes(ptr.as_ptr(), 0, cap);
        }
        ptr
    }

    /// # Safety
    ///
    /// `ptr`/`cap` must describe a live buffer from [`Self::alloc_zeroed`].
    unsafe fn release(ptr: NonNull<u8>, cap: usize) {
        let layout = Layout::from_size_align(cap, HEAP_ALIGN).expect("invalid string layout");
        global_heap().dealloc(ptr, layout);
    }
}

impl Drop for Utf8String {
    fn drop(&mut self) {
        if let Rep::Heap { ptr, cap, .. } = self.rep {
            // SAFETY: the buffer is owned and matches its allocation.
            unsafe {
                Self::release(ptr, cap);
            }
        }
    }
}

impl Default for Utf8String {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Utf8String {
    fn clone(&self) -> Self {
        Self::from(self.as_str())
    }
}

impl From<&str> for Utf8String {
    fn from(text: &str) -> Self {
        let mut out = Self::with_capacity(text.len());
        out.push_str(text);
        out
    }
}

impl From<&String> for Utf8String {
    fn from(text: &String) -> Self {
        Self::from(text.as_str())
    }
}

impl From<char> for Utf8String {
    fn from(ch: char) -> Self {
        let mut out = Self::new();
        out.push(ch);
        out
    }
}

impl FromStr for Utf8String {
    type Err = std::convert::Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(text))
    }
}

impl PartialEq for Utf8String {
    /// Inline strings compare whole buffers (their zeroed tails make
    /// that exact); everything else takes the byte-length fast path and
    /// SIMD byte equality.
    fn eq(&self, other: &Self) -> bool {
        match (&self.rep, &other.rep) {
            (
                Rep::Sso { buf: a, bytes: ba, .. },
                Rep::Sso { buf: b, bytes: bb, .. },
            ) => ba == bb && a == b,
            _ => {
                self.bytes_used() == other.bytes_used()
                    && simd::bytes_equal(self.as_bytes(), other.as_bytes())
            }
        }
    }
}

impl Eq for Utf8String {}

impl PartialEq<str> for Utf8String {
    fn eq(&self, other: &str) -> bool {
        self.bytes_used() == other.len() && simd::bytes_equal(self.as_bytes(), other.as_bytes())
    }
}

impl PartialEq<&str> for Utf8String {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}

impl PartialOrd for Utf8String {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Utf8String {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Hash for Utf8String {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for Utf8String {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Utf8String {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl AddAssign<&str> for Utf8String {
    fn add_assign(&mut self, rhs: &str) {
        self.push_str(rhs);
    }
}

impl AddAssign<char> for Utf8String {
    fn add_assign(&mut self, rhs: char) {
        self.push(rhs);
    }
}

impl AddAssign<&Utf8String> for Utf8String {
    fn add_assign(&mut self, rhs: &Utf8String) {
        self.push_str(rhs.as_str());
    }
}

impl Add<&str> for Utf8String {
    type Output = Utf8String;

    fn add(mut self, rhs: &str) -> Utf8String {
        self.push_str(rhs);
        self
    }
}

impl Add<char> for Utf8String {
    type Output = Utf8String;

    fn add(mut self, rhs: char) -> Utf8String {
        self.push(rhs);
        self
    }
}

impl Add<&Utf8String> for Utf8String {
    type Output = Utf8String;

    fn add(mut self, rhs: &Utf8String) -> Utf8String {
        self.push_str(rhs.as_str());
        self
    }
}

/// Reverse concatenation: the character becomes the prefix
impl Add<&Utf8String> for char {
    type Output = Utf8String;

    fn add(self, rhs: &Utf8String) -> Utf8String {
        let mut out = Utf8String::with_capacity(self.len_utf8() + rhs.bytes_used());
        out.push(self);
        out.push_str(rhs.as_str());
        out
    }
}

/// Reverse concatenation: the literal becomes the prefix
impl Add<&Utf8String> for &str {
    type Output = Utf8String;

    fn add(self, rhs: &Utf8String) -> Utf8String {
        let mut out = Utf8String::with_capacity(self.len() + rhs.bytes_used());
        out.push_str(self);
        out.push_str(rhs.as_str());
        out
    }
}

// Arrays of strings fall back to the scalar probe.
impl Probe for Utf8String {}

static_assertions::assert_impl_all!(Utf8String: Send, Sync);
static_assertions::const_assert!(std::mem::size_of::<Utf8String>() <= 48);
