// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure propagation through dependency chains.

use crate::prelude::*;

#[tokio::test]
async fn failed_task_skips_its_transitive_dependents() {
    let fx = fixture(
        &["seed", "a_out", "b_out", "c_out"],
        &[
            ("a", OpEvaluator::ir("fail", Some(Value::Int(1))), &["seed"], "a_out"),
            ("b", OpEvaluator::ir("scale", Some(Value::Int(2))), &["a_out"], "b_out"),
            ("c", OpEvaluator::ir("scale", Some(Value::Int(2))), &["b_out"], "c_out"),
        ],
        &[("seed", 1)],
    )
    .await;

    let state = fx.run_expect_failed().await;

    assert_eq!(state.tasks["a"].status, TaskStatus::Failed);
    assert_eq!(state.tasks["b"].status, TaskStatus::Skipped);
    assert_eq!(state.tasks["c"].status, TaskStatus::Skipped);

    // Exactly one failure event and two input_unavailable events
    let failed = state.events.iter().filter(|e| e.event.name() == "failed").count();
    let unavailable =
        state.events.iter().filter(|e| e.event.name() == "input_unavailable").count();
    assert_eq!((failed, unavailable), (1, 2));

    // Skipped outputs were never produced
    assert_eq!(fx.get_int(".data.b_out").await, None);
    assert_eq!(fx.get_int(".data.c_out").await, None);
}

#[tokio::test]
async fn independent_branches_survive_a_failure() {
    let fx = fixture(
        &["seed", "bad", "good"],
        &[
            ("broken", OpEvaluator::ir("fail", Some(Value::Int(7))), &["seed"], "bad"),
            ("healthy", OpEvaluator::ir("scale", Some(Value::Int(10))), &["seed"], "good"),
        ],
        &[("seed", 3)],
    )
    .await;

    let state = fx.run_expect_failed().await;
    assert_eq!(state.tasks["broken"].status, TaskStatus::Failed);
    assert_eq!(state.tasks["broken"].exit_code, Some(7));
    assert_eq!(state.tasks["healthy"].status, TaskStatus::Completed);
    assert_eq!(fx.get_int(".data.good").await, Some(30));
}

#[tokio::test]
async fn failed_attempt_is_not_a_cache_hit_later() {
    let fx = fixture(
        &["seed", "out"],
        &[("flaky", OpEvaluator::ir("fail", Some(Value::Int(1))), &["seed"], "out")],
        &[("seed", 5)],
    )
    .await;

    fx.run_expect_failed().await;
    // Same inputs again: the failed record must not satisfy the cache
    let second = fx.run_expect_failed().await;
    assert_eq!(second.counters.cached, 0);
    assert_eq!(fx.evaluator.evaluations(), 2);
}
