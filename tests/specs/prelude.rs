// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the end-to-end specs.

pub use beast_core::codec::ValueType;
pub use beast_core::{DataPath, DataflowState, DataflowStatus, Structure, TaskObject, TaskStatus, Value};
pub use beast_engine::{repo_gc, start, DataflowOptions, FileStateStore, GcOptions};
pub use beast_runner::{InProcessRunner, OpEvaluator};
pub use beast_storage::packages::PackageDef;
pub use beast_storage::{ObjectStore, Repository};
pub use indexmap::IndexMap;
pub use std::sync::Arc;

pub fn path(s: &str) -> DataPath {
    DataPath::parse(s).expect("valid path")
}

/// A repository plus one workspace with a deployed package of
/// [`OpEvaluator`] tasks.
pub struct Fixture {
    pub repo: Repository,
    pub evaluator: OpEvaluator,
    _dir: tempfile::TempDir,
}

impl Fixture {
    pub fn runner(&self) -> InProcessRunner<OpEvaluator> {
        InProcessRunner::new(self.evaluator.clone())
    }

    pub fn state_store(&self) -> Arc<FileStateStore> {
        Arc::new(FileStateStore::new(self.repo.layout().clone()))
    }

    /// Run the workspace's dataflow to completion.
    pub async fn run(&self) -> DataflowState {
        self.run_with(DataflowOptions::default()).await
    }

    pub async fn run_with(&self, opts: DataflowOptions) -> DataflowState {
        let handle = start(self.repo.clone(), "ws", self.runner(), self.state_store(), opts)
            .await
            .expect("start dataflow");
        handle.wait().await.expect("dataflow completes")
    }

    /// Like [`run`], but the execution is expected to finish `failed`.
    pub async fn run_expect_failed(&self) -> DataflowState {
        let state = self.run().await;
        assert_eq!(state.status, DataflowStatus::Failed);
        state
    }

    pub async fn set_int(&self, dataset: &str, value: i64) {
        self.repo
            .workspace_set_dataset("ws", &path(dataset), &Value::Int(value))
            .await
            .expect("set dataset");
    }

    pub async fn get_int(&self, dataset: &str) -> Option<i64> {
        self.repo
            .workspace_get_dataset("ws", &path(dataset))
            .await
            .expect("get dataset")
            .and_then(|(_, value)| value.as_int())
    }
}

/// Build a fixture whose datasets live under `.data`. Tasks are
/// `(name, ir, inputs, output)`; `values` are initial integers.
pub async fn fixture(
    leaves: &[&str],
    tasks: &[(&str, Vec<u8>, &[&str], &str)],
    values: &[(&str, i64)],
) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = Repository::init(dir.path()).expect("init repository");

    let structure = Structure::branch([(
        "data",
        Structure::branch(
            leaves.iter().map(|name| (name.to_string(), Structure::leaf(ValueType::Int))),
        ),
    )]);
    let mut task_map = IndexMap::new();
    for (name, ir, inputs, output) in tasks {
        let ir_hash = repo.store().write(ir).await.expect("store ir");
        task_map.insert(name.to_string(), TaskObject {
            command_ir: ir_hash,
            inputs: inputs.iter().map(|i| path(&format!(".data.{i}"))).collect(),
            output: path(&format!(".data.{output}")),
        });
    }
    let initial = values
        .iter()
        .map(|(name, v)| (path(&format!(".data.{name}")), Value::Int(*v)))
        .collect();

    let def = PackageDef { structure, tasks: task_map, initial };
    repo.package_import("pkg", "1.0.0", &def).await.expect("import package");
    repo.workspace_create("ws").expect("create workspace");
    repo.workspace_deploy("ws", "pkg", "1.0.0").await.expect("deploy");

    Fixture { repo, evaluator: OpEvaluator::new(), _dir: dir }
}
