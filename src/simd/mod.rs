//! Runtime-dispatched search and compare kernels.
//!
//! The hot paths of the containers and strings funnel through this
//! module: element find (broadcast + compare + movemask), bytewise
//! equality, and the hash map's tag-metadata scan. The kernel level is
//! detected once per process ([`level`]) and every call site branches on
//! the cached result; the scalar path is the definition, the vector path
//! an equivalent acceleration.
//!
//! Kernels never read outside the given slices. Vector loops cover the
//! full chunks and a scalar tail finishes the remainder, so buffers need
//! no over-read slack to be searchable.

#[cfg(target_arch = "x86_64")]
mod x86;

use std::sync::OnceLock;

/// Kernel family selected at runtime
///
/// AVX-512 is deliberately absent: its intrinsics are not available on
/// stable toolchains. On non-x86 targets the level is always `Scalar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimdLevel {
    /// Portable scalar loops
    Scalar,
    /// 256-bit AVX2 kernels (x86_64, detected at runtime)
    Avx2,
}

static LEVEL: OnceLock<SimdLevel> = OnceLock::new();

/// The kernel level used by this process, detected on first call
#[inline]
pub fn level() -> SimdLevel {
    *LEVEL.get_or_init(detect)
}

#[cfg(target_arch = "x86_64")]
fn detect() -> SimdLevel {
    if std::arch::is_x86_feature_detected!("avx2") {
        SimdLevel::Avx2
    } else {
        SimdLevel::Scalar
    }
}

#[cfg(not(target_arch = "x86_64"))]
fn detect() -> SimdLevel {
    SimdLevel::Scalar
}

/// Index of the first `needle` byte in `haystack`
#[inline]
pub fn find_u8(haystack: &[u8], needle: u8) -> Option<usize> {
    #[cfg(target_arch = "x86_64")]
    if level() == SimdLevel::Avx2 {
        // SAFETY: AVX2 presence verified by level().
        return unsafe { x86::find_u8_avx2(haystack, needle) };
    }
    haystack.iter().position(|&b| b == needle)
}

/// Index of the first matching 16-bit element
#[inline]
pub fn find_u16(haystack: &[u16], needle: u16) -> Option<usize> {
    #[cfg(target_arch = "x86_64")]
    if level() == SimdLevel::Avx2 {
        // SAFETY: AVX2 presence verified by level().
        return unsafe { x86::find_u16_avx2(haystack, needle) };
    }
    haystack.iter().position(|&v| v == needle)
}

/// Index of the first matching 32-bit element
#[inline]
pub fn find_u32(haystack: &[u32], needle: u32) -> Option<usize> {
    #[cfg(target_arch = "x86_64")]
    if level() == SimdLevel::Avx2 {
        // SAFETY: AVX2 presence verified by level().
        return unsafe { x86::find_u32_avx2(haystack, needle) };
    }
    haystack.iter().position(|&v| v == needle)
}

/// Index of the first matching 64-bit element
#[inline]
pub fn find_u64(haystack: &[u64], needle: u64) -> Option<usize> {
    #[cfg(target_arch = "x86_64")]
    if level() == SimdLevel::Avx2 {
        // SAFETY: AVX2 presence verified by level().
        return unsafe { x86::find_u64_avx2(haystack, needle) };
    }
    haystack.iter().position(|&v| v == needle)
}

/// Bytewise equality of two equal-length slices
///
/// Callers guarantee `a.len() == b.len()`; string comparison performs
/// the length fast path before getting here.
#[inline]
pub fn bytes_equal(a: &[u8], b: &[u8]) -> bool {
    debug_assert_eq!(a.len(), b.len());

    #[cfg(target_arch = "x86_64")]
    if level() == SimdLevel::Avx2 {
        // SAFETY: AVX2 presence verified by level().
        return unsafe { x86::bytes_equal_avx2(a, b) };
    }
    a == b
}

/// Candidate slots matching a tag byte within a metadata array
///
/// The hash map broadcasts the 7-bit pair tag (or zero, for empty-slot
/// search) across each 16-byte chunk of group metadata and walks the
/// resulting bitmask. `tags.len()` must be a multiple of 16; group
/// capacities are.
#[inline]
pub(crate) fn match_tags(tags: &[u8], tag: u8) -> TagMatches<'_> {
    debug_assert_eq!(tags.len() % 16, 0, "tag metadata length must be a multiple of 16");
    TagMatches {
        tags,
        tag,
        chunk_start: 0,
        consumed: 0,
        mask: 0,
    }
}

/// Iterator over matching indices produced by [`match_tags`]
pub(crate) struct TagMatches<'a> {
    tags: &'a [u8],
    tag: u8,
    /// Start of the chunk the current mask belongs to
    chunk_start: usize,
    /// Bytes already converted into masks
    consumed: usize,
    mask: u32,
}

impl Iterator for TagMatches<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.mask != 0 {
                let bit = self.mask.trailing_zeros() as usize;
                self.mask &= self.mask - 1;
                return Some(self.chunk_start + bit);
            }
            if self.consumed >= self.tags.len() {
                return None;
            }
            self.chunk_start = self.consumed;
            let chunk = &self.tags[self.consumed..self.consumed + 16];
            self.mask = tag_mask16(chunk, self.tag);
            self.consumed += 16;
        }
    }
}

/// Bitmask of positions in a 16-byte chunk equal to `tag`
#[inline]
fn tag_mask16(chunk: &[u8], tag: u8) -> u32 {
    debug_assert_eq!(chunk.len(), 16);

    #[cfg(target_arch = "x86_64")]
    {
        // SSE2 is baseline on x86_64; no runtime check needed.
        // SAFETY: chunk is exactly 16 readable bytes.
        unsafe { x86::tag_mask16_sse2(chunk, tag) }
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        let mut mask = 0u32;
        for (i, &b) in chunk.iter().enumerate() {
            if b == tag {
                mask |= 1 << i;
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_is_stable() {
        assert_eq!(level(), level());
    }

    #[test]
    fn test_find_u8() {
        let data: Vec<u8> = (0u8..=255).collect();
        assert_eq!(find_u8(&data, 0), Some(0));
        assert_eq!(find_u8(&data, 100), Some(100));
        assert_eq!(find_u8(&data, 255), Some(255));
        assert_eq!(find_u8(&[], 1), None);
        assert_eq!(find_u8(&[7; 100], 8), None);
    }

    #[test]
    fn test_find_u8_returns_leftmost() {
        let mut data = vec![0u8; 100];
        data[33] = 9;
        data[90] = 9;
        assert_eq!(find_u8(&data, 9), Some(33));
    }

    #[test]
    fn test_find_wide_elements() {
        let h16: Vec<u16> = (0u16..100).collect();
        assert_eq!(find_u16(&h16, 67), Some(67));
        assert_eq!(find_u16(&h16, 1000), None);

        let h32: Vec<u32> = (0u32..100).collect();
        assert_eq!(find_u32(&h32, 99), Some(99));
        assert_eq!(find_u32(&h32, 100), None);

        let h64: Vec<u64> = (0u64..100).collect();
        assert_eq!(find_u64(&h64, 0), Some(0));
        assert_eq!(find_u64(&h64, u64::MAX), None);
    }

    #[test]
    fn test_find_in_unaligned_tails() {
        // Lengths straddling the 32-byte chunk boundary
        for len in [1usize, 15, 16, 17, 31, 32, 33, 63, 64, 65] {
            let mut data = vec![0u8; len];
            data[len - 1] = 42;
            assert_eq!(find_u8(&data, 42), Some(len - 1), "len {len}");
        }
    }

    #[test]
    fn test_bytes_equal() {
        let a: Vec<u8> = (0..200).map(|i| (i % 251) as u8).collect();
        let mut b = a.clone();
        assert!(bytes_equal(&a, &b));

        b[197] ^= 1;
        assert!(!bytes_equal(&a, &b));

        assert!(bytes_equal(&[], &[]));
    }

    #[test]
    fn test_match_tags() {
        let mut tags = [0u8; 32];
        tags[3] = 0x85;
        tags[17] = 0x85;
        tags[31] = 0x85;

        let hits: Vec<usize> = match_tags(&tags, 0x85).collect();
        assert_eq!(hits, vec![3, 17, 31]);
    }

    #[test]
    fn test_match_tags_zero_finds_empty_slots() {
        let mut tags = [0x90u8; 16];
        tags[5] = 0;
        tags[12] = 0;

        let empties: Vec<usize> = match_tags(&tags, 0).collect();
        assert_eq!(empties, vec![5, 12]);
    }

    #[test]
    fn test_match_tags_no_hits() {
        let tags = [0x81u8; 48];
        assert_eq!(match_tags(&tags, 0x82).count(), 0);
        assert_eq!(match_tags(&tags, 0x81).count(), 48);
    }
}
