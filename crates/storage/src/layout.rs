// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk repository layout.
//!
//! ```text
//! <repo>/
//!   objects/<h0h1>/<rest>.beast2
//!   packages/<name>/<version>
//!   workspaces/<name>.beast2
//!   workspaces/<name>.lock
//!   workspaces/<name>/execution.beast2
//!   workspaces/<name>/execution-counter
//!   executions/<task-hash>/<inputs-hash>/<exec-id>/status.beast2
//! ```

use beast_core::{ExecutionId, Hash};
use std::path::{Path, PathBuf};

/// File suffix on every structured blob.
pub const BLOB_SUFFIX: &str = "beast2";

/// Path helpers for one repository root.
#[derive(Debug, Clone)]
pub struct RepoLayout {
    root: PathBuf,
}

impl RepoLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    pub fn object_path(&self, hash: &Hash) -> PathBuf {
        let (prefix, rest) = hash.split_prefix();
        self.objects_dir().join(prefix).join(format!("{rest}.{BLOB_SUFFIX}"))
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    pub fn package_name_dir(&self, name: &str) -> PathBuf {
        self.packages_dir().join(name)
    }

    pub fn package_ref_path(&self, name: &str, version: &str) -> PathBuf {
        self.package_name_dir(name).join(version)
    }

    pub fn workspaces_dir(&self) -> PathBuf {
        self.root.join("workspaces")
    }

    pub fn workspace_state_path(&self, workspace: &str) -> PathBuf {
        self.workspaces_dir().join(format!("{workspace}.{BLOB_SUFFIX}"))
    }

    pub fn workspace_lock_path(&self, workspace: &str) -> PathBuf {
        self.workspaces_dir().join(format!("{workspace}.lock"))
    }

    /// Per-workspace directory holding execution state.
    pub fn workspace_dir(&self, workspace: &str) -> PathBuf {
        self.workspaces_dir().join(workspace)
    }

    pub fn execution_state_path(&self, workspace: &str) -> PathBuf {
        self.workspace_dir(workspace).join(format!("execution.{BLOB_SUFFIX}"))
    }

    pub fn execution_counter_path(&self, workspace: &str) -> PathBuf {
        self.workspace_dir(workspace).join("execution-counter")
    }

    pub fn executions_dir(&self) -> PathBuf {
        self.root.join("executions")
    }

    pub fn execution_inputs_dir(&self, task: &Hash, inputs: &Hash) -> PathBuf {
        self.executions_dir().join(task.to_hex()).join(inputs.to_hex())
    }

    pub fn execution_record_dir(&self, task: &Hash, inputs: &Hash, id: &ExecutionId) -> PathBuf {
        self.execution_inputs_dir(task, inputs).join(id.to_string())
    }

    pub fn execution_status_path(&self, task: &Hash, inputs: &Hash, id: &ExecutionId) -> PathBuf {
        self.execution_record_dir(task, inputs, id).join(format!("status.{BLOB_SUFFIX}"))
    }

    pub fn execution_stdout_path(&self, task: &Hash, inputs: &Hash, id: &ExecutionId) -> PathBuf {
        self.execution_record_dir(task, inputs, id).join("stdout")
    }

    pub fn execution_stderr_path(&self, task: &Hash, inputs: &Hash, id: &ExecutionId) -> PathBuf {
        self.execution_record_dir(task, inputs, id).join("stderr")
    }

    /// The four top-level directories created by `init`.
    pub fn top_level_dirs(&self) -> [PathBuf; 4] {
        [self.objects_dir(), self.packages_dir(), self.workspaces_dir(), self.executions_dir()]
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
