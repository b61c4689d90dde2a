// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use beast_core::{ExecutionId, ExecutionStatus};
use beast_storage::process;
use chrono::Utc;
use tempfile::tempdir;

fn h(seed: &str) -> Hash {
    Hash::digest(seed.as_bytes())
}

#[test]
fn inputs_hash_is_order_sensitive() {
    let a = h("a");
    let b = h("b");
    assert_ne!(inputs_hash(&[a, b]), inputs_hash(&[b, a]));
    assert_eq!(inputs_hash(&[a, b]), inputs_hash(&[a, b]));
}

#[tokio::test]
async fn lookup_hits_only_on_success() {
    let dir = tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let executions = repo.executions();
    let (task, inputs) = (h("task"), h("inputs"));

    assert_eq!(lookup(executions, &task, &inputs).unwrap(), CacheDecision::Miss);

    executions
        .put(&task, &inputs, &ExecutionId::generate(), &ExecutionStatus::Failed {
            exit_code: 1,
            completed_at: Utc::now(),
        })
        .unwrap();
    assert_eq!(lookup(executions, &task, &inputs).unwrap(), CacheDecision::Miss);

    std::thread::sleep(std::time::Duration::from_millis(2));
    executions
        .put(&task, &inputs, &ExecutionId::generate(), &ExecutionStatus::Success {
            output_hash: h("out"),
            started_at: Utc::now(),
            completed_at: Utc::now(),
        })
        .unwrap();
    assert_eq!(
        lookup(executions, &task, &inputs).unwrap(),
        CacheDecision::Hit { output_hash: h("out") }
    );
}

#[tokio::test]
async fn stale_running_record_is_not_a_hit() {
    let dir = tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let executions = repo.executions();
    let (task, inputs) = (h("task"), h("inputs"));

    executions
        .put(&task, &inputs, &ExecutionId::generate(), &ExecutionStatus::Running {
            pid: u32::MAX - 1,
            start_time: 1,
            boot_id: "gone".to_string(),
        })
        .unwrap();

    assert_eq!(lookup(executions, &task, &inputs).unwrap(), CacheDecision::Miss);
    // The stale record is kept, not rewritten
    let records = executions.list(&task, &inputs).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status.name(), "running");
}

#[tokio::test]
async fn live_running_record_is_not_a_hit_either() {
    let dir = tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let executions = repo.executions();
    let (task, inputs) = (h("task"), h("inputs"));

    executions
        .put(&task, &inputs, &ExecutionId::generate(), &ExecutionStatus::Running {
            pid: process::current_pid(),
            start_time: process::process_start_time(process::current_pid()).unwrap_or(0),
            boot_id: process::boot_id(),
        })
        .unwrap();
    assert_eq!(lookup(executions, &task, &inputs).unwrap(), CacheDecision::Miss);
}

#[tokio::test]
async fn find_current_follows_the_workspace_inputs() {
    use beast_core::codec::ValueType;
    use beast_core::{Structure, Value};
    use beast_storage::packages::PackageDef;
    use beast_storage::ObjectStore;

    let dir = tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let ir = repo.store().write(b"ir").await.unwrap();
    let structure = Structure::branch([
        ("seed", Structure::leaf(ValueType::Int)),
        ("out", Structure::leaf(ValueType::Int)),
    ]);
    let mut tasks = indexmap::IndexMap::new();
    tasks.insert("compute".to_string(), TaskObject {
        command_ir: ir,
        inputs: vec![DataPath::parse(".seed").unwrap()],
        output: DataPath::parse(".out").unwrap(),
    });
    repo.package_import("pkg", "1.0.0", &PackageDef { structure, tasks, initial: Vec::new() })
        .await
        .unwrap();
    repo.workspace_create("ws").unwrap();
    repo.workspace_deploy("ws", "pkg", "1.0.0").await.unwrap();

    // Unknown task name is an error; unset input means no current record
    assert!(matches!(
        find_current(&repo, "ws", "ghost").await,
        Err(beast_core::Error::TaskNotFound(_))
    ));
    assert!(find_current(&repo, "ws", "compute").await.unwrap().is_none());

    // Set the input and write a matching success record
    repo.workspace_set_dataset("ws", &DataPath::parse(".seed").unwrap(), &Value::Int(7))
        .await
        .unwrap();
    let current = find_current(&repo, "ws", "compute").await.unwrap();
    assert!(current.is_none(), "no record yet for these inputs");

    let (_, package) = repo.package_resolve("pkg", "1.0.0").await.unwrap();
    let task_hash = package.tasks["compute"];
    let task = repo.read_task_object(&task_hash).await.unwrap();
    let input_hashes =
        resolve_input_hashes(&repo, "ws", &task).await.unwrap().unwrap();
    let ih = inputs_hash(&input_hashes);
    repo.executions()
        .put(&task_hash, &ih, &ExecutionId::generate(), &ExecutionStatus::Success {
            output_hash: h("out"),
            started_at: Utc::now(),
            completed_at: Utc::now(),
        })
        .unwrap();

    let current = find_current(&repo, "ws", "compute").await.unwrap().unwrap();
    assert_eq!(current.task_hash, task_hash);
    assert_eq!(current.inputs_hash, ih);
    assert_eq!(current.record.status.output_hash(), Some(h("out")));
}

#[tokio::test]
async fn null_input_hash_matches_the_stored_blob() {
    let dir = tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();

    let computed = null_input_hash().unwrap();
    let stored = ensure_null_blob(&repo).await.unwrap();
    assert_eq!(computed, stored);
}
