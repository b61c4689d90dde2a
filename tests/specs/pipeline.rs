// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Memoization, invalidation, and the diamond pipeline.

use crate::prelude::*;

async fn compute_fixture() -> Fixture {
    fixture(
        &["value", "result"],
        &[("compute", OpEvaluator::ir("scale", Some(Value::Int(2))), &["value"], "result")],
        &[],
    )
    .await
}

#[tokio::test]
async fn memoization_skips_the_second_run() {
    let fx = compute_fixture().await;
    fx.set_int(".data.value", 7).await;

    let first = fx.run().await;
    assert_eq!(first.status, DataflowStatus::Completed);
    assert_eq!((first.counters.executed, first.counters.cached), (1, 0));
    assert_eq!(fx.get_int(".data.result").await, Some(14));

    let second = fx.run().await;
    assert_eq!((second.counters.executed, second.counters.cached), (0, 1));
    assert_eq!(fx.get_int(".data.result").await, Some(14));

    // The task body ran exactly once across both runs
    assert_eq!(fx.evaluator.evaluations(), 1);
}

#[tokio::test]
async fn changed_input_invalidates_the_cache() {
    let fx = compute_fixture().await;
    fx.set_int(".data.value", 7).await;
    let first = fx.run().await;
    let task_hash = first.graph["compute"].task_hash;

    fx.set_int(".data.value", 8).await;
    let second = fx.run().await;
    assert_eq!((second.counters.executed, second.counters.cached), (1, 0));
    assert_eq!(fx.get_int(".data.result").await, Some(16));

    // The record for value=7 stays in the cache
    let inputs_hashes = fx.repo.executions().list_for_task(&task_hash).expect("list");
    assert_eq!(inputs_hashes.len(), 2);

    // And switching back to 7 is a pure cache hit
    fx.set_int(".data.value", 7).await;
    let third = fx.run().await;
    assert_eq!((third.counters.executed, third.counters.cached), (0, 1));
    assert_eq!(fx.get_int(".data.result").await, Some(14));
}

async fn diamond_fixture() -> Fixture {
    fixture(
        &["a", "b", "left", "right", "merge"],
        &[
            ("left", OpEvaluator::ir("sum", None), &["a", "b"], "left"),
            ("right", OpEvaluator::ir("product", None), &["a", "b"], "right"),
            ("merge", OpEvaluator::ir("sum", None), &["left", "right"], "merge"),
        ],
        &[("a", 10), ("b", 5)],
    )
    .await
}

#[tokio::test]
async fn diamond_computes_through_both_arms() {
    let fx = diamond_fixture().await;

    let state = fx.run().await;
    assert_eq!(state.status, DataflowStatus::Completed);
    assert_eq!(fx.get_int(".data.left").await, Some(15));
    assert_eq!(fx.get_int(".data.right").await, Some(50));
    assert_eq!(fx.get_int(".data.merge").await, Some(65));

    // Exactly three executions
    assert_eq!(state.counters.executed, 3);
    assert_eq!(fx.evaluator.evaluations(), 3);
}

#[tokio::test]
async fn force_executes_despite_the_cache() {
    let fx = diamond_fixture().await;
    fx.run().await;
    assert_eq!(fx.evaluator.evaluations(), 3);

    let forced = fx
        .run_with(DataflowOptions { force: true, ..DataflowOptions::default() })
        .await;
    assert_eq!((forced.counters.executed, forced.counters.cached), (3, 0));
    assert_eq!(fx.evaluator.evaluations(), 6);
    assert_eq!(fx.get_int(".data.merge").await, Some(65));
}

#[tokio::test]
async fn outputs_identical_for_identical_inputs() {
    // Two independent repositories computing the same pipeline converge on
    // byte-identical output hashes
    let fx1 = diamond_fixture().await;
    let fx2 = diamond_fixture().await;

    let s1 = fx1.run().await;
    let s2 = fx2.run().await;
    for task in ["left", "right", "merge"] {
        assert_eq!(
            s1.tasks[task].output_hash, s2.tasks[task].output_hash,
            "output hash of {task} must be deterministic"
        );
    }
}
