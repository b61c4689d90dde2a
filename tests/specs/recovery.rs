// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash recovery: a dead driver's execution state must never leak
//! half-finished work into the workspace.

use crate::prelude::*;
use beast_engine::ExecutionStateStore;

#[tokio::test]
async fn interrupted_execution_is_failed_and_superseded() {
    let fx = fixture(
        &["seed", "out"],
        &[("compute", OpEvaluator::ir("scale", Some(Value::Int(5))), &["seed"], "out")],
        &[("seed", 4)],
    )
    .await;

    // A completed run, which we then rewrite into a crashed one: the state
    // file says `running` with an in-progress task, but the recorded pid
    // is long dead.
    let mut crashed = fx.run().await;
    let root_after_run = fx.repo.workspace_get("ws").expect("state").root;

    crashed.status = DataflowStatus::Running;
    crashed.completed_at = None;
    crashed.pid = u32::MAX - 1;
    crashed.boot_id = "previous-boot".to_string();
    if let Some(task) = crashed.task_mut("compute") {
        task.status = TaskStatus::InProgress;
        task.completed_at = None;
        task.output_hash = None;
    }
    let store = fx.state_store();
    store.update(&crashed).await.expect("persist crashed state");

    // The next start detects the incomplete execution and marks it failed
    // before running; being memoized, the rerun is a pure cache hit.
    let state = fx.run().await;
    assert_eq!(state.status, DataflowStatus::Completed);
    assert!(state.id > crashed.id, "a fresh execution id is allocated");
    assert_eq!(state.counters.cached, 1);
    assert_eq!(fx.get_int(".data.out").await, Some(20));

    // The workspace root was never touched by the "crashed" execution
    assert_eq!(fx.repo.workspace_get("ws").expect("state").root, root_after_run);
}

#[tokio::test]
async fn live_incomplete_execution_is_not_stolen() {
    let fx = fixture(
        &["seed", "out"],
        &[("compute", OpEvaluator::ir("sum", None), &["seed"], "out")],
        &[("seed", 1)],
    )
    .await;

    let mut forged = fx.run().await;
    forged.status = DataflowStatus::Running;
    forged.completed_at = None;
    forged.pid = beast_storage::process::current_pid();
    forged.boot_id = beast_storage::process::boot_id();
    let store = fx.state_store();
    store.update(&forged).await.expect("persist forged state");

    let err = start(
        fx.repo.clone(),
        "ws",
        fx.runner(),
        fx.state_store(),
        DataflowOptions::default(),
    )
    .await
    .expect_err("must refuse to steal a live execution");
    assert!(matches!(err, beast_core::Error::Dataflow(_)));
}

#[tokio::test]
async fn state_file_survives_for_successor_processes() {
    let fx = fixture(
        &["seed", "out"],
        &[("compute", OpEvaluator::ir("sum", None), &["seed"], "out")],
        &[("seed", 9)],
    )
    .await;
    let state = fx.run().await;

    // A successor process opens a fresh store over the same repository
    let successor = FileStateStore::new(fx.repo.layout().clone());
    let persisted = successor.read_latest("ws").await.expect("read").expect("state exists");
    assert_eq!(persisted.id, state.id);
    assert_eq!(persisted.status, DataflowStatus::Completed);
    assert_eq!(persisted.tasks["compute"].status, TaskStatus::Completed);
    assert_eq!(persisted.events.len(), state.events.len());
    assert!(successor.incomplete("ws").await.expect("incomplete").is_none());
}
