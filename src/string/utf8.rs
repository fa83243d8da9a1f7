//! UTF-8 validation by lead-byte classification.
//!
//! The validating string constructors walk the input once, classifying
//! each lead byte (1/2/3/4-byte sequence) and checking the trailing
//! bytes, rejecting overlong encodings, surrogates, and values past
//! U+10FFFF. The walk also produces the code-point count the string
//! caches.

use crate::error::{Utf8Error, Utf8Result};

#[inline]
fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Validate `bytes` as UTF-8, returning the code-point count
pub fn validate(bytes: &[u8]) -> Utf8Result<usize> {
    let mut chars = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let lead = bytes[i];

        let len = if lead < 0x80 {
            1
        } else if lead & 0xE0 == 0xC0 {
            2
        } else if lead & 0xF0 == 0xE0 {
            3
        } else if lead & 0xF8 == 0xF0 {
            4
        } else {
            return Err(Utf8Error::InvalidLeadByte {
                byte: lead,
                offset: i,
            });
        };

        if i + len > bytes.len() {
            return Err(Utf8Error::Truncated { offset: i });
        }

        for (k, &byte) in bytes[i + 1..i + len].iter().enumerate() {
            if !is_continuation(byte) {
                return Err(Utf8Error::InvalidContinuation {
                    byte,
                    offset: i + 1 + k,
                });
            }
        }

        match len {
            2 => {
                // C0/C1 encode ASCII in two bytes
                if lead < 0xC2 {
                    return Err(Utf8Error::InvalidScalar { offset: i });
                }
            }
            3 => {
                let second = bytes[i + 1];
                // E0 A0..BF is the shortest 3-byte range; ED A0..BF are
                // the surrogates
                if (lead == 0xE0 && second < 0xA0) || (lead == 0xED && second >= 0xA0) {
                    return Err(Utf8Error::InvalidScalar { offset: i });
                }
            }
            4 => {
                let second = bytes[i + 1];
                // F0 90.. is the shortest 4-byte range; F4 8F.. is the
                // last scalar, U+10FFFF
                if (lead == 0xF0 && second < 0x90)
                    || lead > 0xF4
                    || (lead == 0xF4 && second > 0x8F)
                {
                    return Err(Utf8Error::InvalidScalar { offset: i });
                }
            }
            _ => {}
        }

        chars += 1;
        i += len;
    }

    Ok(chars)
}

/// Code-point count of already-validated text
#[inline]
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}
