// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed error taxonomy at the engine boundary.
//!
//! Precondition violations surface immediately and are never retried
//! internally. Missing files in layouts where absence is meaningful are
//! converted to `None` returns by the storage layer, not errors. Decode
//! failures map to `ExecutionCorrupt` or `PackageInvalid` depending on the
//! blob's origin.

use crate::dataflow::DataflowState;
use crate::hash::Hash;
use crate::lock::LockInfo;
use crate::path::DataPath;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("repository not found at {0}")]
    RepositoryNotFound(PathBuf),
    #[error("workspace not found: {0}")]
    WorkspaceNotFound(String),
    #[error("workspace has no deployed package: {0}")]
    WorkspaceNotDeployed(String),
    #[error("workspace already exists: {0}")]
    WorkspaceExists(String),
    #[error("workspace {workspace} is locked by {holder}")]
    WorkspaceLocked { workspace: String, holder: LockInfo },
    #[error("package not found: {0}")]
    PackageNotFound(String),
    #[error("package already exists with different contents: {0}")]
    PackageExists(String),
    #[error("invalid package: {0}")]
    PackageInvalid(String),
    #[error("dataset not found: {0}")]
    DatasetNotFound(DataPath),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("object not found: {0}")]
    ObjectNotFound(Hash),
    #[error("execution record corrupt: {0}")]
    ExecutionCorrupt(String),
    #[error("dataflow error: {0}")]
    Dataflow(String),
    #[error("dataflow aborted")]
    DataflowAborted { partial: Box<DataflowState> },
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors a caller caused (as opposed to I/O or engine faults).
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::RepositoryNotFound(_)
                | Error::WorkspaceNotFound(_)
                | Error::WorkspaceNotDeployed(_)
                | Error::WorkspaceExists(_)
                | Error::WorkspaceLocked { .. }
                | Error::PackageNotFound(_)
                | Error::PackageExists(_)
                | Error::PackageInvalid(_)
                | Error::DatasetNotFound(_)
                | Error::TaskNotFound(_)
        )
    }
}
