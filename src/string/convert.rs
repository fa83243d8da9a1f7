//! Per-type string conversion.
//!
//! [`ToUtf8`] is the extensible conversion the formatter consumes: any
//! type that can render itself into a [`Utf8String`] can appear as a
//! format argument. Integer output is minimal decimal with a leading
//! `-` for negatives. Float output always carries a decimal point
//! (`"0.0"`, never `"0"`), renders the non-finite values as `inf` /
//! `-inf` / `nan`, and takes a precision (default 5, capped at 19)
//! whose trailing zeros are stripped down to at least one fractional
//! digit.

use super::Utf8String;

/// Default digits after the decimal point for float conversion
pub const DEFAULT_FLOAT_PRECISION: usize = 5;

/// Upper bound on requested float precision
pub const MAX_FLOAT_PRECISION: usize = 19;

/// Conversion into a [`Utf8String`]
///
/// Implement this for any type that should be usable as a
/// [`format`](super::format) argument:
///
/// ```
/// use keel::string::{ToUtf8, Utf8String};
///
/// struct Celsius(f64);
///
/// impl ToUtf8 for Celsius {
///     fn to_utf8(&self) -> Utf8String {
///         self.0.to_utf8() + "°C"
///     }
/// }
///
/// assert_eq!(Celsius(21.5).to_utf8(), "21.5°C");
/// ```
pub trait ToUtf8 {
    /// Render the value as text
    fn to_utf8(&self) -> Utf8String;
}

/// Minimal-decimal conversion of an unsigned value
pub fn unsigned_to_utf8(value: u64) -> Utf8String {
    let mut digits = [0u8; 20];
    let mut out = Utf8String::new();
    push_decimal(&mut out, value, &mut digits);
    out
}

/// Minimal-decimal conversion of a signed value
pub fn signed_to_utf8(value: i64) -> Utf8String {
    let mut digits = [0u8; 20];
    let mut out = Utf8String::new();
    if value < 0 {
        out.push('-');
    }
    push_decimal(&mut out, value.unsigned_abs(), &mut digits);
    out
}

fn push_decimal(out: &mut Utf8String, mut value: u64, digits: &mut [u8; 20]) {
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    // Decimal digits are ASCII.
    out.push_str(std::str::from_utf8(&digits[i..]).expect("decimal digits are UTF-8"));
}

/// Float conversion with explicit precision
///
/// Rounds to `precision` fractional digits (capped at
/// [`MAX_FLOAT_PRECISION`]), then strips trailing zeros while keeping at
/// least one fractional digit. `precision == 0` still yields a point:
/// `5.0`, not `5`.
pub fn float_to_utf8(value: f64, precision: usize) -> Utf8String {
    if value.is_nan() {
        return Utf8String::from("nan");
    }
    if value.is_infinite() {
        return Utf8String::from(if value < 0.0 { "-inf" } else { "inf" });
    }

    let precision = precision.min(MAX_FLOAT_PRECISION);
    let mut text = format!("{value:.precision$}");

    match text.find('.') {
        None => text.push_str(".0"),
        Some(dot) => {
            let mut end = text.len();
            while end > dot + 2 && text.as_bytes()[end - 1] == b'0' {
                end -= 1;
            }
            text.truncate(end);
        }
    }

    Utf8String::from(text.as_str())
}

macro_rules! to_utf8_signed {
    ($($ty:ty),*) => {
        $(
            impl ToUtf8 for $ty {
                #[inline]
                fn to_utf8(&self) -> Utf8String {
                    signed_to_utf8(*self as i64)
                }
            }
        )*
    };
}

macro_rules! to_utf8_unsigned {
    ($($ty:ty),*) => {
        $(
            impl ToUtf8 for $ty {
                #[inline]
                fn to_utf8(&self) -> Utf8String {
                    unsigned_to_utf8(*self as u64)
                }
            }
        )*
    };
}

to_utf8_signed!(i8, i16, i32, i64, isize);
to_utf8_unsigned!(u8, u16, u32, u64, usize);

impl ToUtf8 for f32 {
    #[inline]
    fn to_utf8(&self) -> Utf8String {
        float_to_utf8(f64::from(*self), DEFAULT_FLOAT_PRECISION)
    }
}

impl ToUtf8 for f64 {
    #[inline]
    fn to_utf8(&self) -> Utf8String {
        float_to_utf8(*self, DEFAULT_FLOAT_PRECISION)
    }
}

impl ToUtf8 for bool {
    fn to_utf8(&self) -> Utf8String {
        Utf8String::from(if *self { "true" } else { "false" })
    }
}

impl ToUtf8 for char {
    fn to_utf8(&self) -> Utf8String {
        Utf8String::from(*self)
    }
}

impl ToUtf8 for &str {
    fn to_utf8(&self) -> Utf8String {
        Utf8String::from(*self)
    }
}

impl ToUtf8 for String {
    fn to_utf8(&self) -> Utf8String {
        Utf8String::from(self.as_str())
    }
}

impl ToUtf8 for Utf8String {
    fn to_utf8(&self) -> Utf8String {
        self.clone()
    }
}
