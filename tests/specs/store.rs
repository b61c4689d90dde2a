// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Whole-repository invariants after real pipeline activity.

use crate::prelude::*;
use beast_core::Hash;

#[tokio::test]
async fn every_stored_blob_hashes_to_its_name() {
    let fx = fixture(
        &["a", "b", "sum"],
        &[("add", OpEvaluator::ir("sum", None), &["a", "b"], "sum")],
        &[("a", 1), ("b", 2)],
    )
    .await;
    fx.run().await;

    for hash in fx.repo.store().list().await.expect("list") {
        let bytes = fx.repo.store().read(&hash).await.expect("read");
        assert_eq!(Hash::digest(&bytes), hash, "blob content must match its address");
    }
}

#[tokio::test]
async fn workspace_root_always_decodes_against_the_structure() {
    let fx = fixture(
        &["value", "result"],
        &[("compute", OpEvaluator::ir("scale", Some(Value::Int(3))), &["value"], "result")],
        &[],
    )
    .await;

    // At every observable point the root must decode and conform
    for step in 0..3 {
        match step {
            0 => {}
            1 => fx.set_int(".data.value", 11).await,
            _ => {
                fx.run().await;
            }
        }
        let state = fx.repo.workspace_get("ws").expect("state");
        let (_, package) = fx.repo.workspace_package(&state).await.expect("package");
        let root = state.root.expect("root");
        beast_storage::tree::tree_read(fx.repo.store(), &root, &package.data.structure)
            .await
            .expect("root decodes against the structure");
    }
    assert_eq!(fx.get_int(".data.result").await, Some(33));
}

#[tokio::test]
async fn success_records_always_point_at_readable_outputs() {
    let fx = fixture(
        &["a", "b", "left", "right", "merge"],
        &[
            ("left", OpEvaluator::ir("sum", None), &["a", "b"], "left"),
            ("right", OpEvaluator::ir("product", None), &["a", "b"], "right"),
            ("merge", OpEvaluator::ir("sum", None), &["left", "right"], "merge"),
        ],
        &[("a", 3), ("b", 4)],
    )
    .await;
    fx.run().await;

    let outputs = fx.repo.executions().success_outputs().expect("outputs");
    assert_eq!(outputs.len(), 3);
    for output in outputs {
        let (_, value) =
            beast_storage::tree::dataset_read(fx.repo.store(), &output).await.expect("decodes");
        assert!(value.as_int().is_some());
    }
}

#[tokio::test]
async fn repository_reopens_with_everything_in_place() {
    let fx = fixture(
        &["value", "result"],
        &[("compute", OpEvaluator::ir("scale", Some(Value::Int(2))), &["value"], "result")],
        &[("value", 6)],
    )
    .await;
    fx.run().await;

    // Reopen from the path alone, as a new process would
    let reopened = Repository::open(fx.repo.layout().root()).expect("open");
    assert_eq!(reopened.workspace_list().expect("workspaces"), ["ws"]);
    assert_eq!(
        reopened.package_list().expect("packages"),
        [("pkg".to_string(), "1.0.0".to_string())]
    );
    let value = reopened
        .workspace_get_dataset("ws", &path(".data.result"))
        .await
        .expect("dataset")
        .and_then(|(_, value)| value.as_int());
    assert_eq!(value, Some(12));
}
