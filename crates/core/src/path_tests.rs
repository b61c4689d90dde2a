// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    leading_dot = { ".inputs.value" },
    bare = { "inputs.value" },
)]
fn parse_accepts_optional_leading_dot(input: &str) {
    let path = DataPath::parse(input).unwrap();
    assert_eq!(path.segments(), ["inputs", "value"]);
    assert_eq!(path.to_string(), ".inputs.value");
}

#[test]
fn parse_single_segment() {
    let path = DataPath::parse(".output").unwrap();
    assert_eq!(path.segments(), ["output"]);
    assert_eq!(path.leaf(), "output");
    assert_eq!(path.parent(), None);
}

#[parameterized(
    empty = { "" },
    only_dot = { "." },
)]
fn parse_rejects_empty(input: &str) {
    assert!(DataPath::parse(input).is_err());
}

#[parameterized(
    double_dot = { ".a..b" },
    trailing_dot = { ".a.b." },
)]
fn parse_rejects_empty_segments(input: &str) {
    assert!(matches!(DataPath::parse(input), Err(PathError::EmptySegment(_))));
}

#[test]
fn parent_and_leaf() {
    let path = DataPath::parse(".a.b.c").unwrap();
    assert_eq!(path.leaf(), "c");
    assert_eq!(path.parent().unwrap().to_string(), ".a.b");
    assert_eq!(path.parent().unwrap().parent().unwrap().to_string(), ".a");
}

#[test]
fn child_appends_segment() {
    let path = DataPath::parse(".a").unwrap().child("b");
    assert_eq!(path.to_string(), ".a.b");
}

#[test]
fn display_round_trips_through_parse() {
    let path = DataPath::parse(".tasks.compute.output").unwrap();
    assert_eq!(DataPath::parse(&path.to_string()).unwrap(), path);
}
