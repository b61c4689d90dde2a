// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository handle.
//!
//! A repository is a directory with four namespaces: `objects/`,
//! `packages/`, `workspaces/`, `executions/`. `init` creates exactly those
//! directories and nothing else; `open` validates they exist.

use crate::executions::ExecutionStore;
use crate::layout::RepoLayout;
use crate::object::{LocalObjectStore, ObjectStore};
use beast_core::{Error, Result};
use std::path::Path;
use std::sync::Arc;

/// An opened repository on the local filesystem.
#[derive(Debug, Clone)]
pub struct Repository {
    layout: RepoLayout,
    store: Arc<LocalObjectStore>,
    executions: ExecutionStore,
}

impl Repository {
    /// Create the repository directories and open the result. Idempotent.
    pub fn init(root: impl AsRef<Path>) -> Result<Self> {
        let layout = RepoLayout::new(root.as_ref());
        for dir in layout.top_level_dirs() {
            std::fs::create_dir_all(dir)?;
        }
        tracing::info!(root = %root.as_ref().display(), "repository initialized");
        Ok(Self::assemble(layout))
    }

    /// Open an existing repository, failing when the layout is absent.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let layout = RepoLayout::new(root.as_ref());
        let complete = layout.top_level_dirs().iter().all(|dir| dir.is_dir());
        if !complete {
            return Err(Error::RepositoryNotFound(root.as_ref().to_path_buf()));
        }
        Ok(Self::assemble(layout))
    }

    fn assemble(layout: RepoLayout) -> Self {
        let store = Arc::new(LocalObjectStore::new(layout.clone()));
        let executions = ExecutionStore::new(layout.clone());
        Self { layout, store, executions }
    }

    pub fn layout(&self) -> &RepoLayout {
        &self.layout
    }

    /// The local backend, with its sweep-only surface.
    pub fn store(&self) -> &LocalObjectStore {
        &self.store
    }

    /// The store as the abstract trait object, for executors.
    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store) as Arc<dyn ObjectStore>
    }

    pub fn executions(&self) -> &ExecutionStore {
        &self.executions
    }

    /// Path-safety check for names that become file system components.
    pub(crate) fn validate_name(kind: &str, name: &str) -> Result<()> {
        let ok = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.starts_with('.')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if ok {
            Ok(())
        } else {
            Err(Error::Internal(format!("invalid {kind} name: {name:?}")))
        }
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
