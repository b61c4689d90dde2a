// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace layer.
//!
//! A workspace binds a deployed package to a mutable root tree. Every
//! mutating operation takes the workspace lock; the orchestrator, which
//! already holds it for the whole execution, uses the `commit` form
//! instead. The root swap in [`Repository::workspace_commit_dataset`] is
//! the commit point for a mutation: a crash before it leaves only orphan
//! blobs for the garbage collector.

use crate::lock::{self, LockHandle, LockOptions};
use crate::refs;
use crate::repository::Repository;
use crate::tree::{self, Resolved};
use beast_core::{
    DataPath, DataRef, Deployment, Error, Hash, LockKind, PackageObject, Result, Value, ValueType,
    WorkspaceState,
};
use chrono::Utc;

impl Repository {
    /// Create an empty workspace: no package, null root.
    pub fn workspace_create(&self, name: &str) -> Result<()> {
        Self::validate_name("workspace", name)?;
        if refs::workspace_read(self.layout(), name)?.is_some() {
            return Err(Error::WorkspaceExists(name.to_string()));
        }
        refs::workspace_write(self.layout(), name, &WorkspaceState::default())?;
        tracing::info!(workspace = name, "workspace created");
        Ok(())
    }

    pub fn workspace_get(&self, name: &str) -> Result<WorkspaceState> {
        refs::workspace_read(self.layout(), name)?
            .ok_or_else(|| Error::WorkspaceNotFound(name.to_string()))
    }

    pub fn workspace_list(&self) -> Result<Vec<String>> {
        refs::workspace_list(self.layout())
    }

    /// Deploy a package: point the workspace at the package's initial root.
    /// Fails with `WorkspaceLocked` while the workspace is in use.
    pub async fn workspace_deploy(&self, name: &str, package: &str, version: &str) -> Result<()> {
        let _lock = self.lock_workspace(name, LockKind::Deploy).await?;
        let mut state = self.workspace_get(name)?;
        let (package_hash, object) = self.package_resolve(package, version).await?;

        state.deployment = Some(Deployment {
            package_name: package.to_string(),
            package_version: version.to_string(),
            package_hash,
            deployed_at: Utc::now(),
        });
        state.root = Some(object.data.root);
        state.root_updated_at = Some(Utc::now());
        refs::workspace_write(self.layout(), name, &state)?;
        tracing::info!(workspace = name, package, version, "package deployed");
        Ok(())
    }

    /// Remove a workspace and its execution state. Fails with
    /// `WorkspaceLocked` while an execution is running.
    pub async fn workspace_remove(&self, name: &str) -> Result<()> {
        let lock = self.lock_workspace(name, LockKind::Admin).await?;
        // Existence check while holding the lock
        let _ = self.workspace_get(name)?;

        refs::workspace_delete(self.layout(), name)?;
        let workspace_dir = self.layout().workspace_dir(name);
        if workspace_dir.exists() {
            std::fs::remove_dir_all(&workspace_dir)?;
        }
        lock.release();
        // Best-effort: the lock file itself is disposable once released
        let _ = std::fs::remove_file(self.layout().workspace_lock_path(name));
        tracing::info!(workspace = name, "workspace removed");
        Ok(())
    }

    /// Acquire the workspace's exclusive lock.
    pub async fn lock_workspace(&self, name: &str, kind: LockKind) -> Result<LockHandle> {
        lock::acquire(self.layout(), name, kind, &LockOptions::default()).await
    }

    /// Acquire the lock, waiting up to `timeout`.
    pub async fn lock_workspace_wait(
        &self,
        name: &str,
        kind: LockKind,
        timeout: std::time::Duration,
    ) -> Result<LockHandle> {
        lock::acquire(
            self.layout(),
            name,
            kind,
            &LockOptions { wait: true, timeout: Some(timeout) },
        )
        .await
    }

    /// The package object a workspace is bound to.
    pub async fn workspace_package(&self, state: &WorkspaceState) -> Result<(Deployment, PackageObject)> {
        let deployment = state
            .deployment
            .clone()
            .ok_or_else(|| Error::WorkspaceNotDeployed("workspace".to_string()))?;
        let object = self.read_package_object(&deployment.package_hash).await?;
        Ok((deployment, object))
    }

    /// Store a value and set the dataset at `path` to it, under the lock.
    /// Returns the value hash.
    pub async fn workspace_set_dataset(
        &self,
        name: &str,
        path: &DataPath,
        value: &Value,
    ) -> Result<Hash> {
        let _lock = self.lock_workspace(name, LockKind::Admin).await?;
        let value_hash = tree::dataset_write(self.store(), value).await?;
        self.workspace_commit_dataset(name, path, value_hash).await?;
        Ok(value_hash)
    }

    /// Set the dataset at `path` to an already-stored value blob. The
    /// caller must hold the workspace lock. Swapping the root in the state
    /// file is the commit point.
    pub async fn workspace_commit_dataset(
        &self,
        name: &str,
        path: &DataPath,
        value_hash: Hash,
    ) -> Result<Hash> {
        let mut state = self.workspace_get(name)?;
        let (_, package) = self
            .workspace_package(&state)
            .await
            .map_err(|_| Error::WorkspaceNotDeployed(name.to_string()))?;
        let root = state.root.ok_or_else(|| Error::WorkspaceNotDeployed(name.to_string()))?;

        let new_root = tree::set_dataset(
            self.store(),
            &root,
            &package.data.structure,
            path,
            DataRef::Value(value_hash),
        )
        .await?;

        state.root = Some(new_root);
        state.root_updated_at = Some(Utc::now());
        refs::workspace_write(self.layout(), name, &state)?;
        tracing::debug!(workspace = name, %path, value = %value_hash.short(), "dataset set");
        Ok(new_root)
    }

    /// Resolve a path in the workspace's current tree.
    pub async fn workspace_resolve(&self, name: &str, path: &DataPath) -> Result<Resolved> {
        let state = self.workspace_get(name)?;
        let (_, package) = self
            .workspace_package(&state)
            .await
            .map_err(|_| Error::WorkspaceNotDeployed(name.to_string()))?;
        let root = state.root.ok_or_else(|| Error::WorkspaceNotDeployed(name.to_string()))?;
        tree::resolve_path(self.store(), &root, path, &package.data.structure).await
    }

    /// Read the dataset at `path`. `None` while it is unassigned.
    pub async fn workspace_get_dataset(
        &self,
        name: &str,
        path: &DataPath,
    ) -> Result<Option<(ValueType, Value)>> {
        match self.workspace_resolve(name, path).await? {
            Resolved::Leaf(DataRef::Value(hash)) => {
                Ok(Some(tree::dataset_read(self.store(), &hash).await?))
            }
            Resolved::Leaf(DataRef::Null) => Ok(Some((ValueType::Null, Value::Null))),
            Resolved::Leaf(DataRef::Unassigned) => Ok(None),
            Resolved::Leaf(DataRef::Tree(_)) | Resolved::Branch(_) => {
                Err(Error::DatasetNotFound(path.clone()))
            }
        }
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
