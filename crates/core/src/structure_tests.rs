// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::codec;

fn sample() -> Structure {
    Structure::branch([
        (
            "inputs",
            Structure::branch([
                ("value", Structure::leaf(ValueType::Int)),
                ("label", Structure::leaf(ValueType::String)),
            ]),
        ),
        ("tasks", Structure::branch([("compute", Structure::leaf(ValueType::Int))])),
    ])
}

#[test]
fn at_path_finds_leaves_and_branches() {
    let structure = sample();
    let leaf = structure.at_path(&DataPath::parse(".inputs.value").unwrap()).unwrap();
    assert!(leaf.is_leaf());

    let branch = structure.at_path(&DataPath::parse(".inputs").unwrap()).unwrap();
    assert!(!branch.is_leaf());
    assert_eq!(branch.fields().unwrap().len(), 2);
}

#[test]
fn at_path_misses_unknown_fields() {
    let structure = sample();
    assert!(structure.at_path(&DataPath::parse(".inputs.missing").unwrap()).is_none());
    // Descending through a leaf is also a miss
    assert!(structure.at_path(&DataPath::parse(".inputs.value.deeper").unwrap()).is_none());
}

#[test]
fn leaves_are_preorder_with_full_paths() {
    let structure = sample();
    let leaves: Vec<String> = structure.leaves().iter().map(|(p, _)| p.to_string()).collect();
    assert_eq!(leaves, [".inputs.value", ".inputs.label", ".tasks.compute"]);
    assert_eq!(structure.leaf_count(), 3);
}

#[test]
fn codec_round_trip_preserves_field_order() {
    let structure = sample();
    let bytes = codec::to_vec(&structure).unwrap();
    let back: Structure = codec::from_slice(&bytes).unwrap();
    assert_eq!(back, structure);

    let names: Vec<&str> = match &back {
        Structure::Struct(fields) => fields.keys().map(String::as_str).collect(),
        Structure::Value(_) => panic!("expected branch"),
    };
    assert_eq!(names, ["inputs", "tasks"]);
}
