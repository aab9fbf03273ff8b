//! Property: serializing any value in the supported grammar and parsing
//! it back yields the same value, at every chunk size.

use std::sync::Arc;

use charfeed::json::{self, JsonReadOptions, JsonReader, JsonWriteOptions, Value};
use charfeed::StringCharSource;
use quickcheck::{Arbitrary, Gen, QuickCheck};

/// Local wrapper so `Arbitrary` can be implemented for the value model.
#[derive(Debug, Clone, PartialEq)]
struct ArbValue(Value);

#[derive(Debug, Copy, Clone, PartialEq)]
struct FiniteF64(f64);

impl Arbitrary for FiniteF64 {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut value = f64::arbitrary(g);
        while !value.is_finite() {
            value = f64::arbitrary(g);
        }
        Self(value)
    }
}

impl Arbitrary for ArbValue {
    fn arbitrary(g: &mut Gen) -> Self {
        fn gen_val(g: &mut Gen, depth: usize) -> Value {
            let scalar = |g: &mut Gen| match usize::arbitrary(g) % 5 {
                0 => Value::Null,
                1 => Value::Boolean(bool::arbitrary(g)),
                2 => Value::Integer(i64::arbitrary(g)),
                3 => Value::Double(FiniteF64::arbitrary(g).0),
                _ => Value::String(Arc::from(String::arbitrary(g))),
            };
            if depth == 0 {
                return scalar(g);
            }
            match usize::arbitrary(g) % 7 {
                0..=4 => scalar(g),
                5 => {
                    let len = usize::arbitrary(g) % 4;
                    Value::Array((0..len).map(|_| gen_val(g, depth - 1)).collect())
                }
                _ => {
                    let len = usize::arbitrary(g) % 4;
                    // Duplicate keys would make equality depend on lookup
                    // rules; keep keys distinct.
                    Value::Object(
                        (0..len)
                            .map(|i| {
                                let key = format!("k{i}-{}", String::arbitrary(g).replace('"', ""));
                                (Arc::from(key), gen_val(g, depth - 1))
                            })
                            .collect(),
                    )
                }
            }
        }
        let depth = usize::arbitrary(g) % 3;
        ArbValue(gen_val(g, depth))
    }
}

#[test]
fn serialize_then_parse_is_identity() {
    fn prop(value: ArbValue) -> bool {
        let text = json::write_str(&value.0, JsonWriteOptions::default()).unwrap();
        let parsed = json::read_str(&text, JsonReadOptions::default()).unwrap();
        parsed == value.0
    }
    QuickCheck::new()
        .tests(1_000)
        .quickcheck(prop as fn(ArbValue) -> bool);
}

#[test]
fn identity_holds_without_unicode_escaping() {
    fn prop(value: ArbValue) -> bool {
        let options = JsonWriteOptions {
            escape_unicode: false,
            ..Default::default()
        };
        let text = json::write_str(&value.0, options).unwrap();
        let parsed = json::read_str(&text, JsonReadOptions::default()).unwrap();
        parsed == value.0
    }
    QuickCheck::new()
        .tests(500)
        .quickcheck(prop as fn(ArbValue) -> bool);
}

#[test]
fn identity_holds_at_small_chunk_sizes() {
    fn prop(value: ArbValue, size: usize) -> bool {
        let chunk_size = 2 + size % 30;
        let text = json::write_str(&value.0, JsonWriteOptions::default()).unwrap();
        let options = JsonReadOptions {
            chunk_size,
            ..Default::default()
        };
        let mut reader = JsonReader::from_source(StringCharSource::new(&text), options).unwrap();
        reader.read().unwrap() == value.0
    }
    QuickCheck::new()
        .tests(500)
        .quickcheck(prop as fn(ArbValue, usize) -> bool);
}
