// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use yare::parameterized;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Record {
    name: String,
    size: u64,
    active: bool,
    note: Option<String>,
    scores: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Shape {
    Empty,
    Ref(String),
    Pair(i64, i64),
    Sized { width: i64, height: i64 },
}

fn record() -> Record {
    Record {
        name: "blob".to_string(),
        size: 42,
        active: true,
        note: None,
        scores: vec![1, -2, 3],
    }
}

#[test]
fn struct_round_trip() {
    let bytes = to_vec(&record()).unwrap();
    let back: Record = from_slice(&bytes).unwrap();
    assert_eq!(back, record());
}

#[test]
fn blob_carries_header() {
    let bytes = to_vec(&7i64).unwrap();
    assert!(has_header(&bytes));
    assert_eq!(&bytes[..3], &MAGIC);
}

#[test]
fn missing_header_is_rejected() {
    let err = from_slice::<i64>(&[0x03, 7, 0, 0, 0, 0, 0, 0, 0]).unwrap_err();
    assert!(matches!(err, CodecError::BadMagic));
}

#[test]
fn trailing_bytes_are_rejected() {
    let mut bytes = to_vec(&true).unwrap();
    bytes.push(0x00);
    let err = from_slice::<bool>(&bytes).unwrap_err();
    assert!(matches!(err, CodecError::TrailingBytes(1)));
}

#[test]
fn unknown_tag_is_rejected() {
    let mut bytes = MAGIC.to_vec();
    bytes.push(0x7f);
    let err = from_slice::<Value>(&bytes).unwrap_err();
    assert!(matches!(err, CodecError::UnknownTag(0x7f)));
}

#[test]
fn truncated_input_is_rejected() {
    let bytes = to_vec(&record()).unwrap();
    let err = from_slice::<Record>(&bytes[..bytes.len() - 3]).unwrap_err();
    assert!(matches!(err, CodecError::UnexpectedEof));
}

#[parameterized(
    unit = { Shape::Empty },
    newtype = { Shape::Ref("abc".to_string()) },
    tuple = { Shape::Pair(3, 4) },
    data = { Shape::Sized { width: 10, height: 20 } },
)]
fn enum_round_trip(shape: Shape) {
    let bytes = to_vec(&shape).unwrap();
    let back: Shape = from_slice(&bytes).unwrap();
    assert_eq!(back, shape);
}

#[test]
fn unit_variant_encodes_as_string() {
    let bytes = to_vec(&Shape::Empty).unwrap();
    let value = decode_value(&bytes).unwrap();
    assert_eq!(value, Value::String("empty".to_string()));
}

#[test]
fn data_variant_encodes_as_single_entry_struct() {
    let bytes = to_vec(&Shape::Ref("x".to_string())).unwrap();
    let value = decode_value(&bytes).unwrap();
    let fields = value.as_struct().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields.get("ref"), Some(&Value::String("x".to_string())));
}

#[test]
fn decode_value_recovers_type_and_data() {
    let bytes = to_vec(&record()).unwrap();
    let value = decode_value(&bytes).unwrap();
    assert_eq!(value.get("name").and_then(Value::as_str), Some("blob"));
    assert_eq!(value.get("size").and_then(Value::as_int), Some(42));
    assert_eq!(value.get("note"), Some(&Value::Null));

    let ty = value.value_type();
    match ty {
        ValueType::Struct(fields) => {
            assert_eq!(fields.get("name"), Some(&ValueType::String));
            assert_eq!(fields.get("size"), Some(&ValueType::Int));
            assert_eq!(fields.get("scores"), Some(&ValueType::Array(Box::new(ValueType::Int))));
        }
        other => panic!("expected struct type, got {other}"),
    }
}

#[test]
fn struct_fields_keep_declared_order() {
    let mut fields = IndexMap::new();
    fields.insert("zebra".to_string(), Value::Int(1));
    fields.insert("apple".to_string(), Value::Int(2));
    fields.insert("mango".to_string(), Value::Int(3));
    let bytes = to_vec(&Value::Struct(fields)).unwrap();

    let back = decode_value(&bytes).unwrap();
    let names: Vec<&str> = back.as_struct().unwrap().keys().map(String::as_str).collect();
    assert_eq!(names, ["zebra", "apple", "mango"]);
}

#[test]
fn byte_identical_encoding_for_equal_values() {
    assert_eq!(to_vec(&record()).unwrap(), to_vec(&record()).unwrap());
}

#[test]
fn bytes_value_round_trip() {
    let value = Value::Bytes(vec![0, 1, 2, 255]);
    let bytes = to_vec(&value).unwrap();
    assert_eq!(decode_value(&bytes).unwrap(), value);
}

#[test]
fn float_and_null_round_trip() {
    let value = Value::Array(vec![Value::Float(1.5), Value::Null, Value::Bool(false)]);
    let bytes = to_vec(&value).unwrap();
    assert_eq!(decode_value(&bytes).unwrap(), value);
}

#[test]
fn u64_beyond_i64_is_rejected() {
    let err = to_vec(&u64::MAX).unwrap_err();
    assert!(matches!(err, CodecError::IntOutOfRange(_)));
}

#[test]
fn map_with_non_string_keys_is_rejected() {
    let mut map = std::collections::BTreeMap::new();
    map.insert(1i64, "one");
    let err = to_vec(&map).unwrap_err();
    assert!(matches!(err, CodecError::KeyNotString));
}

#[test]
fn nested_structs_round_trip() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Outer {
        inner: Record,
        tags: IndexMap<String, String>,
    }

    let mut tags = IndexMap::new();
    tags.insert("env".to_string(), "test".to_string());
    let outer = Outer { inner: record(), tags };
    let bytes = to_vec(&outer).unwrap();
    let back: Outer = from_slice(&bytes).unwrap();
    assert_eq!(back, outer);
}
