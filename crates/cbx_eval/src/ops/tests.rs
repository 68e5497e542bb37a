#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

#[test]
fn number_formatting() {
    assert_eq!(number_to_string(1.0), "1");
    assert_eq!(number_to_string(-0.0), "0");
    assert_eq!(number_to_string(0.5), "0.5");
    assert_eq!(number_to_string(f64::NAN), "NaN");
    assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    assert_eq!(number_to_string(1e21), "1e+21");
    assert_eq!(number_to_string(123_456_789.0), "123456789");
}

#[test]
fn radix_formatting() {
    assert_eq!(number_to_radix_string(255.0, 16), "ff");
    assert_eq!(number_to_radix_string(-8.0, 2), "-1000");
    assert_eq!(number_to_radix_string(0.0, 36), "0");
}

#[test]
fn string_to_number_rules() {
    assert_eq!(string_to_number(""), 0.0);
    assert_eq!(string_to_number("  42  "), 42.0);
    assert_eq!(string_to_number("0x10"), 16.0);
    assert!(string_to_number("12px").is_nan());
}

#[test]
fn parse_prefixes() {
    assert_eq!(parse_int_prefix("  -17abc", None), -17.0);
    assert_eq!(parse_int_prefix("0x1f", None), 31.0);
    assert_eq!(parse_int_prefix("101", Some(2)), 5.0);
    assert!(parse_int_prefix("zz", None).is_nan());
    assert_eq!(parse_float_prefix("3.25rest"), 3.25);
    assert_eq!(parse_float_prefix("-Infinity"), f64::NEG_INFINITY);
    assert!(parse_float_prefix(".").is_nan());
}

#[test]
fn int32_wrapping() {
    assert_eq!(to_int32(4_294_967_296.0 + 5.0), 5);
    assert_eq!(to_int32(2_147_483_648.0), -2_147_483_648);
    assert_eq!(to_uint32(-1.0), 4_294_967_295);
    assert_eq!(to_int32(f64::NAN), 0);
}

#[test]
fn array_index_keys() {
    assert_eq!(array_index("0"), Some(0));
    assert_eq!(array_index("12"), Some(12));
    assert_eq!(array_index("012"), None);
    assert_eq!(array_index("-1"), None);
    assert_eq!(array_index("length"), None);
}

#[test]
fn loose_equality_of_primitives() {
    assert!(primitive_loose_equals(&Value::Null, &Value::Undefined));
    assert!(primitive_loose_equals(&Value::str("1"), &Value::Number(1.0)));
    assert!(primitive_loose_equals(&Value::Bool(true), &Value::Number(1.0)));
    assert!(!primitive_loose_equals(&Value::Null, &Value::Number(0.0)));
}

proptest! {
    #[test]
    fn integers_round_trip_through_strings(n in -1_000_000_000i64..1_000_000_000) {
        let text = number_to_string(n as f64);
        prop_assert_eq!(text.clone(), n.to_string());
        prop_assert_eq!(string_to_number(&text), n as f64);
    }

    #[test]
    fn to_int32_matches_wrapping_cast(n in any::<i64>()) {
        prop_assert_eq!(to_int32(n as f64), (n as f64 as i128).rem_euclid(1 << 32) as u32 as i32);
    }
}
