//! Core error types for keel operations.
//!
//! Recoverable failures (allocation, UTF-8 validation, format and parse
//! errors) are returned as `Result`s. Logic errors (double frees,
//! refcount underflow, ring-queue overflow, out-of-bounds indexing) are
//! bugs in the caller and panic with a contextual message instead.

use thiserror::Error;

/// Error type for allocation failures
///
/// The only recoverable allocator error. Bookkeeping violations detected
/// by [`TestingAllocator`](crate::alloc::TestingAllocator) are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The underlying allocator could not satisfy the request
    #[error("out of memory: allocation of {size} bytes (align {align}) failed")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
        /// Requested alignment in bytes
        align: usize,
    },
}

/// Error type for UTF-8 validation failures
///
/// Produced by the validating string constructors. The offset always
/// points at the first byte of the rejected sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Utf8Error {
    /// A byte that cannot start a UTF-8 sequence
    #[error("invalid UTF-8 lead byte {byte:#04x} at offset {offset}")]
    InvalidLeadByte { byte: u8, offset: usize },

    /// A continuation position holding a non-continuation byte
    #[error("invalid UTF-8 continuation byte {byte:#04x} at offset {offset}")]
    InvalidContinuation { byte: u8, offset: usize },

    /// The input ends in the middle of a multi-byte sequence
    #[error("truncated UTF-8 sequence starting at offset {offset}")]
    Truncated { offset: usize },

    /// Overlong encoding, surrogate, or value above U+10FFFF
    #[error("overlong or out-of-range UTF-8 sequence at offset {offset}")]
    InvalidScalar { offset: usize },
}

impl Utf8Error {
    /// Byte offset of the first rejected byte
    pub fn offset(&self) -> usize {
        match *self {
            Utf8Error::InvalidLeadByte { offset, .. }
            | Utf8Error::InvalidContinuation { offset, .. }
            | Utf8Error::Truncated { offset }
            | Utf8Error::InvalidScalar { offset } => offset,
        }
    }
}

/// Error type for string formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Placeholder count does not match the supplied argument count
    #[error("format string expects {placeholders} arguments, {args} supplied")]
    ArityMismatch { placeholders: usize, args: usize },

    /// A `{` without a matching `}` (write `{{` for a literal brace)
    #[error("unmatched brace in format string at byte {offset}")]
    UnmatchedBrace { offset: usize },
}

/// Error type for string-to-value conversions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {input:?} as {target}")]
pub struct ParseError {
    /// The text that failed to parse
    pub input: String,
    /// Name of the requested target type
    pub target: &'static str,
}

/// Result alias for allocating operations
pub type AllocResult<T> = std::result::Result<T, AllocError>;

/// Result alias for UTF-8 validating constructors
pub type Utf8Result<T> = std::result::Result<T, Utf8Error>;
