//! Placeholder formatting into a single pre-sized buffer.
//!
//! [`format`] parses a format string with `{}` placeholders (`{{` and
//! `}}` escape literal braces), validates the placeholder count against
//! the argument count, renders every argument through [`ToUtf8`], and
//! assembles the result into one allocation sized to the sum of all
//! pieces. A result that fits inline never allocates.
//!
//! The [`str_format!`](crate::str_format) macro wraps the call for the
//! common case where the format string is a known-good literal.

use super::convert::ToUtf8;
use super::Utf8String;
use crate::error::FormatError;

enum Piece<'a> {
    Literal(&'a str),
    Arg(usize),
}

/// Render `args` into `fmt`, one `{}` per argument
///
/// ```
/// use keel::string::format;
///
/// let out = format("{} + {} = {}", &[&1, &2, &3]).unwrap();
/// assert_eq!(out, "1 + 2 = 3");
/// ```
pub fn format(fmt: &str, args: &[&dyn ToUtf8]) -> Result<Utf8String, FormatError> {
    let bytes = fmt.as_bytes();
    let mut pieces: Vec<Piece<'_>> = Vec::new();
    let mut placeholders = 0usize;
    let mut literal_start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                if bytes.get(i + 1) == Some(&b'{') {
                    // Keep the first brace as literal text, skip the second
                    pieces.push(Piece::Literal(&fmt[literal_start..=i]));
                    i += 2;
                    literal_start = i;
                } else if bytes.get(i + 1) == Some(&b'}') {
                    if literal_start < i {
                        pieces.push(Piece::Literal(&fmt[literal_start..i]));
                    }
                    pieces.push(Piece::Arg(placeholders));
                    placeholders += 1;
                    i += 2;
                    literal_start = i;
                } else {
                    return Err(FormatError::UnmatchedBrace { offset: i });
                }
            }
            b'}' => {
                if bytes.get(i + 1) == Some(&b'}') {
                    pieces.push(Piece::Literal(&fmt[literal_start..=i]));
                    i += 2;
                    literal_start = i;
                } else {
                    return Err(FormatError::UnmatchedBrace { offset: i });
                }
            }
            _ => i += 1,
        }
    }
    if literal_start < fmt.len() {
        pieces.push(Piece::Literal(&fmt[literal_start..]));
    }

    if placeholders != args.len() {
        return Err(FormatError::ArityMismatch {
            placeholders,
            args: args.len(),
        });
    }

    let rendered: Vec<Utf8String> = args.iter().map(|arg| arg.to_utf8()).collect();
    let total: usize = pieces
        .iter()
        .map(|piece| match piece {
            Piece::Literal(text) => text.len(),
            Piece::Arg(index) => rendered[*index].bytes_used(),
        })
        .sum();

    let mut out = Utf8String::with_capacity(total);
    for piece in &pieces {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Arg(index) => out.push_str(rendered[*index].as_str()),
        }
    }
    Ok(out)
}

/// Format with inline arguments, panicking on a malformed format string
///
/// ```
/// use keel::str_format;
///
/// let out = str_format!("num1: {}, num2: {}", 5, 5.0);
/// assert_eq!(out, "num1: 5, num2: 5.0");
/// ```
#[macro_export]
macro_rules! str_format {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::string::format($fmt, &[$(&$arg as &dyn $crate::string::ToUtf8),*])
            .expect("malformed format string")
    };
}
