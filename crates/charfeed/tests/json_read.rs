//! JSON reader integration tests.

use std::sync::Arc;

use charfeed::json::{self, JsonFactory, JsonReadOptions, JsonReader, Value};
use charfeed::{Error, StringCharSource, SyntaxError};
use num_bigint::BigInt;

fn parse(src: &str) -> Value {
    json::read_str(src, JsonReadOptions::default()).unwrap()
}

fn parse_err(src: &str) -> Error {
    json::read_str(src, JsonReadOptions::default()).unwrap_err()
}

fn obj(entries: Vec<(&str, Value)>) -> Value {
    Value::Object(
        entries
            .into_iter()
            .map(|(k, v)| (Arc::from(k), v))
            .collect(),
    )
}

#[test]
fn literals_and_scalars() {
    assert_eq!(parse("null"), Value::Null);
    assert_eq!(parse("true"), Value::Boolean(true));
    assert_eq!(parse("false"), Value::Boolean(false));
    assert_eq!(parse("0"), Value::Integer(0));
    assert_eq!(parse("-0"), Value::Integer(0));
    assert_eq!(parse("42"), Value::Integer(42));
    assert_eq!(parse("-17"), Value::Integer(-17));
    assert_eq!(parse("1.5"), Value::Double(1.5));
    assert_eq!(parse("-2.5e2"), Value::Double(-250.0));
    assert_eq!(parse("1E2"), Value::Double(100.0));
    assert_eq!(parse("\"\""), Value::String("".into()));
    assert_eq!(parse("\"hi\""), Value::String("hi".into()));
}

#[test]
fn containers() {
    assert_eq!(parse("[]"), Value::Array(vec![]));
    assert_eq!(parse("{}"), Value::Object(vec![]));
    assert_eq!(
        parse("[1, [2, 3], {\"x\": null}]"),
        Value::Array(vec![
            Value::Integer(1),
            Value::Array(vec![Value::Integer(2), Value::Integer(3)]),
            obj(vec![("x", Value::Null)]),
        ])
    );
}

#[test]
fn object_with_default_options() {
    assert_eq!(
        parse("{\"a\": 1, \"b\": 2}"),
        obj(vec![("a", Value::Integer(1)), ("b", Value::Integer(2))])
    );
}

#[test]
fn key_fn_rewrites_keys() {
    let options = JsonReadOptions {
        key_fn: Some(|k| Arc::from(format!(":{k}"))),
        ..Default::default()
    };
    assert_eq!(
        json::read_str("{\"a\": 1, \"b\": 2}", options).unwrap(),
        obj(vec![(":a", Value::Integer(1)), (":b", Value::Integer(2))])
    );
}

#[test]
fn value_fn_elides_entries() {
    let options = JsonReadOptions {
        value_fn: Some(|k, v| if k == "a" { None } else { Some(v) }),
        ..Default::default()
    };
    assert_eq!(json::read_str("{\"a\":1}", options.clone()).unwrap(), obj(vec![]));
    assert_eq!(
        json::read_str("{\"a\":1,\"b\":2}", options).unwrap(),
        obj(vec![("b", Value::Integer(2))])
    );
}

#[test]
fn big_integer_promotion() {
    let text = "123456789012345678901234567890";
    let expect: BigInt = text.parse().unwrap();
    assert_eq!(parse(text), Value::BigInt(expect));
    // i64 boundaries stay integers.
    assert_eq!(parse("9223372036854775807"), Value::Integer(i64::MAX));
    assert_eq!(parse("-9223372036854775808"), Value::Integer(i64::MIN));
    assert!(matches!(parse("9223372036854775808"), Value::BigInt(_)));
}

#[test]
fn bigdec_preserves_the_literal() {
    let options = JsonReadOptions {
        bigdec: true,
        ..Default::default()
    };
    assert_eq!(
        json::read_str("3.141592653589793238462643383279", options).unwrap(),
        Value::BigDecimal("3.141592653589793238462643383279".into())
    );
}

#[test]
fn double_fn_overrides_real_decoding() {
    let options = JsonReadOptions {
        double_fn: Some(|text| Ok(Value::String(Arc::from(text)))),
        ..Default::default()
    };
    assert_eq!(
        json::read_str("1.25", options).unwrap(),
        Value::String("1.25".into())
    );
}

#[test]
fn string_escapes() {
    assert_eq!(
        parse(r#""\" \\ \/ \b \f \n \r \t A""#),
        Value::String("\" \\ / \u{8} \u{c} \n \r \t A".into())
    );
}

#[test]
fn surrogate_pairs_combine() {
    assert_eq!(parse(r#""😀""#), Value::String("😀".into()));
    assert_eq!(parse(r#""x𝄞y""#), Value::String("x𝄞y".into()));
    assert_eq!(parse(r#""\ud83d\ude00""#), Value::String("😀".into()));
    assert_eq!(parse(r#""\ud834\udd1e""#), Value::String("𝄞".into()));
}

#[test]
fn lone_surrogates_decode_to_replacement() {
    assert_eq!(parse(r#""\ud800""#), Value::String("\u{FFFD}".into()));
    assert_eq!(parse(r#""\udc00x""#), Value::String("\u{FFFD}x".into()));
    assert_eq!(
        parse(r#""\ud800\n""#),
        Value::String("\u{FFFD}\n".into())
    );
}

#[test]
fn multiple_top_level_values() {
    let mut reader = JsonReader::from_str("1 \"two\" [3] {\"four\": 4}", JsonReadOptions::default());
    assert_eq!(reader.read_next().unwrap(), Some(Value::Integer(1)));
    assert_eq!(reader.read_next().unwrap(), Some(Value::String("two".into())));
    assert_eq!(
        reader.read_next().unwrap(),
        Some(Value::Array(vec![Value::Integer(3)]))
    );
    assert_eq!(
        reader.read_next().unwrap(),
        Some(obj(vec![("four", Value::Integer(4))]))
    );
    assert_eq!(reader.read_next().unwrap(), None);
}

#[test]
fn reader_is_an_iterator() {
    let reader = JsonReader::from_str("1 2 3", JsonReadOptions::default());
    let values: Vec<Value> = reader.map(Result::unwrap).collect();
    assert_eq!(
        values,
        vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
    );
}

#[test]
fn eof_policies() {
    // Default: end of input raises.
    let err = json::read_str("  ", JsonReadOptions::default()).unwrap_err();
    assert!(err.is_end_of_input(), "{err}");

    let options = JsonReadOptions {
        eof_error: false,
        eof_value: Some(Value::String("done".into())),
        ..Default::default()
    };
    assert_eq!(
        json::read_str("", options).unwrap(),
        Value::String("done".into())
    );

    let options = JsonReadOptions {
        eof_error: false,
        eof_fn: Some(|| Value::Integer(-1)),
        ..Default::default()
    };
    assert_eq!(json::read_str("", options).unwrap(), Value::Integer(-1));
}

#[test]
fn eos_inside_a_structure_is_end_of_input() {
    for src in ["[1,", "{\"a\":", "\"abc", "{\"a\"", "["] {
        let err = parse_err(src);
        assert!(err.is_end_of_input(), "input {src:?} gave {err}");
    }
}

#[test]
fn malformed_documents() {
    assert!(matches!(
        parse_err("{\"a\":1,}"),
        Error::Json {
            source: SyntaxError::TrailingComma,
            ..
        }
    ));
    assert!(matches!(
        parse_err("[1,]"),
        Error::Json {
            source: SyntaxError::TrailingComma,
            ..
        }
    ));
    assert!(matches!(
        parse_err("{\"a\":1,,\"b\":2}"),
        Error::Json {
            source: SyntaxError::UnexpectedCharacter(','),
            ..
        }
    ));
    assert!(matches!(
        parse_err("{1: 2}"),
        Error::Json {
            source: SyntaxError::NonStringKey,
            ..
        }
    ));
    assert!(matches!(
        parse_err("{\"a\" 1}"),
        Error::Json {
            source: SyntaxError::ExpectedColon,
            ..
        }
    ));
    assert!(matches!(
        parse_err("truth"),
        Error::Json {
            source: SyntaxError::ExpectedLiteral("true"),
            ..
        }
    ));
    assert!(matches!(
        parse_err("01"),
        Error::Json {
            source: SyntaxError::InvalidNumber(_),
            ..
        }
    ));
    assert!(matches!(
        parse_err("1.e5"),
        Error::Json {
            source: SyntaxError::InvalidNumber(_),
            ..
        }
    ));
    assert!(matches!(
        parse_err("\"a\u{0001}b\""),
        Error::Json {
            source: SyntaxError::ControlCharacter('\u{1}'),
            ..
        }
    ));
}

#[test]
fn errors_carry_line_and_column() {
    let err = parse_err("{\n  \"a\": tru}\n");
    match err {
        Error::Json { line, column, .. } => {
            assert_eq!(line, 2);
            assert!(column >= 8, "column {column}");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn leading_bom_is_skipped() {
    assert_eq!(parse("\u{FEFF}{\"a\":1}"), obj(vec![("a", Value::Integer(1))]));
}

#[test]
fn canonical_keys_share_one_instance() {
    let v = parse("[{\"id\":1},{\"id\":2}]");
    let Value::Array(items) = v else { panic!() };
    let Value::Object(a) = &items[0] else { panic!() };
    let Value::Object(b) = &items[1] else { panic!() };
    assert!(Arc::ptr_eq(&a[0].0, &b[0].0));
}

#[test]
fn factory_shares_keys_across_parses() {
    let mut factory = JsonFactory::new(JsonReadOptions::default());
    let a = factory.parse_str("{\"shared\": 1}").unwrap();
    let b = factory.parse_str("{\"shared\": 2}").unwrap();
    let Value::Object(ea) = a else { panic!() };
    let Value::Object(eb) = b else { panic!() };
    assert!(Arc::ptr_eq(&ea[0].0, &eb[0].0));
}

#[test]
fn chunked_source_matches_in_memory() {
    let src = "{\"name\": \"grand \\\"tour\\\"\", \"legs\": [1, 2.5, 30000000000000000000], \"done\": false}";
    let expect = parse(src);
    for chunk_size in [2, 3, 7, 1024] {
        let options = JsonReadOptions {
            chunk_size,
            ..Default::default()
        };
        let mut reader =
            JsonReader::from_source(StringCharSource::new(src), options).unwrap();
        assert_eq!(reader.read().unwrap(), expect, "chunk size {chunk_size}");
    }
}

#[test]
fn async_source_matches_sync() {
    let src: String = std::iter::once("[".to_string())
        .chain((0..2000).map(|i| {
            if i == 0 {
                format!("{{\"k{i}\": {i}}}")
            } else {
                format!(",{{\"k{i}\": {i}}}")
            }
        }))
        .chain(std::iter::once("]".to_string()))
        .collect();
    let expect = parse(&src);
    let options = JsonReadOptions {
        chunk_size: 128,
        async_read: true,
        queue_depth: 4,
        ..Default::default()
    };
    let mut reader = JsonReader::from_source(StringCharSource::new(&src), options).unwrap();
    assert_eq!(reader.read().unwrap(), expect);
}

#[test]
fn crlf_input_reports_correct_lines() {
    // The source constructor normalizes CRLF, so the error lands on the
    // third line whatever the terminator style.
    let src = "{\r\n  \"a\": 1,\r\n  \"b\": tru\r\n}";
    let mut reader = JsonReader::from_source(
        StringCharSource::new(src),
        JsonReadOptions::default(),
    )
    .unwrap();
    match reader.read().unwrap_err() {
        Error::Json { line, .. } => assert_eq!(line, 3),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn reader_unusable_after_error_except_close() {
    let mut reader = JsonReader::from_str("[1,] 2", JsonReadOptions::default());
    assert!(reader.read_next().is_err());
    assert_eq!(reader.read_next().unwrap(), None);
    reader.close().unwrap();
}
