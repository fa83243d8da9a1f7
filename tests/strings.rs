//! String Integration Tests - Utf8String, Formatting, Interning
//!
//! End-to-end checks of the string stack: SSO behaviour, formatting,
//! numeric round-trips, and the global registry.

use keel::str_format;
use keel::string::convert::{float_to_utf8, ToUtf8};
use keel::{GlobalString, Utf8String};

// ============================================================================
// LENGTH LAW
// ============================================================================

/// "Übergrößenträger": 16 code points in 20 bytes
#[test]
fn test_unicode_length_scenario() {
    let s = Utf8String::from("Übergrößenträger");
    assert_eq!(s.len(), 16);
    assert_eq!(s.bytes_used(), 20);
    assert!(s.is_inline());

    // Repeated, it crosses the 30-byte inline limit
    let mut repeated = s.clone();
    repeated += &s;
    assert_eq!(repeated.len(), 32);
    assert_eq!(repeated.bytes_used(), 40);
    assert!(!repeated.is_inline());
    assert!(repeated.len() <= repeated.bytes_used());
    assert!(repeated.bytes_used() <= repeated.capacity());
}

#[test]
fn test_length_law_holds_across_edits() {
    let mut s = Utf8String::new();
    let mut model = String::new();

    for (i, piece) in ["a", "ü", "字", "🦀", "plain ascii run", "ß"]
        .iter()
        .cycle()
        .take(60)
        .enumerate()
    {
        s.push_str(piece);
        model.push_str(piece);
        assert_eq!(s.bytes_used(), model.len(), "iteration {i}");
        assert_eq!(s.len(), model.chars().count(), "iteration {i}");
        assert!(s.len() <= s.bytes_used());
        assert!(s.bytes_used() <= s.capacity());
    }
    assert_eq!(s.as_str(), model);
}

// ============================================================================
// FORMAT
// ============================================================================

/// The formatting scenario from the interface contract
#[test]
fn test_format_scenario() {
    let num1 = 5;
    let num2 = 5.0;
    let out = str_format!(
        "num1: {}, num2: {}, multiplied: {}",
        num1,
        num2,
        num1 as f64 * num2
    );
    assert_eq!(out, "num1: 5, num2: 5.0, multiplied: 25.0");
}

#[test]
fn test_format_mixed_types() {
    let name = Utf8String::from("keel");
    let out = str_format!("{} v{} ready: {}", name, 1u32, true);
    assert_eq!(out, "keel v1 ready: true");
}

// ============================================================================
// NUMERIC ROUND-TRIPS
// ============================================================================

#[test]
fn test_int_to_string_to_int() {
    for value in [i32::MIN, -1000, -1, 0, 1, 999, i32::MAX] {
        let text = value.to_utf8();
        assert_eq!(text.parse::<i32>().unwrap(), value);
    }
    for value in [u16::MIN, 1, 30000, u16::MAX] {
        let text = value.to_utf8();
        assert_eq!(text.parse::<u16>().unwrap(), value);
    }
}

#[test]
fn test_float_formatting_contract() {
    assert_eq!(0.0f64.to_utf8(), "0.0");
    assert_eq!((-0.5f64).to_utf8(), "-0.5");
    assert_eq!(f64::INFINITY.to_utf8(), "inf");
    assert_eq!(f64::NEG_INFINITY.to_utf8(), "-inf");
    assert_eq!(f64::NAN.to_utf8(), "nan");
    assert_eq!((-123.45f32).to_utf8(), "-123.45");
    assert_eq!(float_to_utf8(8.0, 19), "8.0");
}

#[test]
fn test_float_to_string_to_float() {
    for value in [0.0f64, 1.5, -2.25, 1234.0625] {
        let text = float_to_utf8(value, 10);
        assert_eq!(text.parse::<f64>().unwrap(), value);
    }
}

// ============================================================================
// GLOBAL STRING EQUALITY
// ============================================================================

/// Interning the same text twice yields the same id
#[test]
fn test_intern_alpha_scenario() {
    let first = GlobalString::create(Utf8String::from("alpha"));
    let second = GlobalString::create(Utf8String::from("alpha"));

    assert_eq!(first, second);
    assert_eq!(first.id(), second.id());
    assert_eq!(first.to_utf8(), "alpha");
    assert_eq!(second.to_utf8(), "alpha");
}

/// Equal ids iff equal strings
#[test]
fn test_global_string_equality_law() {
    let texts = ["one", "two", "three", "one", "two"];
    let handles: Vec<GlobalString> = texts
        .iter()
        .map(|t| GlobalString::create(Utf8String::from(*t)))
        .collect();

    for (i, a) in texts.iter().enumerate() {
        for (j, b) in texts.iter().enumerate() {
            assert_eq!(handles[i] == handles[j], a == b, "{a:?} vs {b:?}");
        }
    }
}

#[test]
fn test_global_string_from_many_threads() {
    let handles: Vec<_> = (0..8)
        .map(|_| {
            std::thread::spawn(|| {
                (0..100)
                    .map(|i| {
                        GlobalString::create(Utf8String::from(
                            format!("threaded-{i}").as_str(),
                        ))
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let per_thread: Vec<Vec<GlobalString>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Every thread resolved the same text to the same id
    for other in &per_thread[1..] {
        assert_eq!(&per_thread[0], other);
    }
    // And the contents round-trip
    for (i, handle) in per_thread[0].iter().enumerate() {
        assert_eq!(handle.to_utf8(), format!("threaded-{i}").as_str());
    }
}
