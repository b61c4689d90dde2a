// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace state and per-dataset status.
//!
//! A workspace is a named mutable cell. Its `root` points at the current
//! root tree object; swapping it is the single commit point for every
//! dataset mutation.

use crate::hash::Hash;
use crate::path::DataPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted workspace state (`workspaces/<name>.beast2`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceState {
    /// Present once a package has been deployed.
    #[serde(default)]
    pub deployment: Option<Deployment>,
    /// Hash of the current root tree object; `None` before deploy.
    #[serde(default)]
    pub root: Option<Hash>,
    #[serde(default)]
    pub root_updated_at: Option<DateTime<Utc>>,
}

/// The package identity a workspace is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub package_name: String,
    pub package_version: String,
    pub package_hash: Hash,
    pub deployed_at: DateTime<Utc>,
}

impl WorkspaceState {
    pub fn is_deployed(&self) -> bool {
        self.deployment.is_some()
    }
}

/// Derived freshness of one dataset leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetStatus {
    /// The reference is unassigned.
    Unset,
    /// Set, and (for task outputs) produced by the current task from the
    /// current inputs.
    UpToDate,
    /// Set, but from a previous task definition or different inputs.
    Stale,
}

impl std::fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetStatus::Unset => write!(f, "unset"),
            DatasetStatus::UpToDate => write!(f, "up-to-date"),
            DatasetStatus::Stale => write!(f, "stale"),
        }
    }
}

/// Status report for one leaf of the workspace tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetReport {
    pub path: DataPath,
    pub status: DatasetStatus,
    /// Current value hash when set.
    pub hash: Option<Hash>,
    /// Name of the task that declares this leaf as its output, if any.
    pub produced_by: Option<String>,
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
