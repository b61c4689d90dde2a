// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Package layer.
//!
//! Importing a package writes its task objects, its initial root tree, and
//! the package object itself into the object store, then points the
//! `packages/<name>/<version>` reference at the package hash. Import is
//! idempotent: re-importing identical contents converges on the same hash;
//! divergent contents under an existing reference are rejected.

use crate::object::ObjectStore;
use crate::refs;
use crate::repository::Repository;
use crate::tree;
use beast_core::{
    DataPath, DataRef, Error, Hash, PackageData, PackageObject, Result, Structure, TaskObject,
    Value, codec,
};
use indexmap::IndexMap;

/// Everything needed to import a package.
#[derive(Debug, Clone)]
pub struct PackageDef {
    pub structure: Structure,
    /// Task name → declaration, in declared order.
    pub tasks: IndexMap<String, TaskObject>,
    /// Initial values for non-produced leaves.
    pub initial: Vec<(DataPath, Value)>,
}

/// A resolved package with its full blob closure.
#[derive(Debug, Clone)]
pub struct PackageExport {
    pub name: String,
    pub version: String,
    pub hash: Hash,
    pub package: PackageObject,
    pub tasks: IndexMap<String, TaskObject>,
    /// Every object hash reachable from the package, package blob included.
    pub closure: Vec<Hash>,
}

impl Repository {
    /// Import a package definition under `name`/`version`.
    pub async fn package_import(
        &self,
        name: &str,
        version: &str,
        def: &PackageDef,
    ) -> Result<Hash> {
        Self::validate_name("package", name)
            .map_err(|_| Error::PackageInvalid(format!("bad package name {name:?}")))?;
        Self::validate_name("version", version)
            .map_err(|_| Error::PackageInvalid(format!("bad package version {version:?}")))?;
        validate_def(def)?;

        let store = self.store();

        // Task blobs first; their hashes are the package's task table.
        let mut task_hashes: IndexMap<String, Hash> = IndexMap::new();
        for (task_name, task) in &def.tasks {
            let bytes = codec::to_vec(task)
                .map_err(|err| Error::PackageInvalid(format!("task {task_name}: {err}")))?;
            task_hashes.insert(task_name.clone(), store.write(&bytes).await?);
        }

        // Initial root: the all-unassigned skeleton with initial values set.
        let mut root = tree::initial_root(store, &def.structure).await?;
        for (path, value) in &def.initial {
            let value_hash = tree::dataset_write(store, value).await?;
            root = tree::set_dataset(store, &root, &def.structure, path, DataRef::Value(value_hash))
                .await?;
        }

        let package = PackageObject {
            tasks: task_hashes,
            data: PackageData { structure: def.structure.clone(), root },
        };
        let bytes = codec::to_vec(&package)
            .map_err(|err| Error::PackageInvalid(format!("package object: {err}")))?;
        let hash = store.write(&bytes).await?;

        match refs::package_read(self.layout(), name, version)? {
            Some(existing) if existing == hash => {
                tracing::debug!(name, version, hash = %hash.short(), "package already imported");
            }
            Some(_) => {
                return Err(Error::PackageExists(format!("{name}/{version}")));
            }
            None => {
                refs::package_write(self.layout(), name, version, &hash)?;
                tracing::info!(name, version, hash = %hash.short(), "package imported");
            }
        }
        Ok(hash)
    }

    /// Resolve `name`/`version` to its package hash and object.
    pub async fn package_resolve(&self, name: &str, version: &str) -> Result<(Hash, PackageObject)> {
        let hash = refs::package_read(self.layout(), name, version)?
            .ok_or_else(|| Error::PackageNotFound(format!("{name}/{version}")))?;
        let package = self.read_package_object(&hash).await?;
        Ok((hash, package))
    }

    /// Decode a package object blob.
    pub async fn read_package_object(&self, hash: &Hash) -> Result<PackageObject> {
        let bytes = self.store().read(hash).await?;
        codec::from_slice(&bytes)
            .map_err(|err| Error::PackageInvalid(format!("package object {hash}: {err}")))
    }

    /// Decode a task object blob.
    pub async fn read_task_object(&self, hash: &Hash) -> Result<TaskObject> {
        let bytes = self.store().read(hash).await?;
        codec::from_slice(&bytes)
            .map_err(|err| Error::PackageInvalid(format!("task object {hash}: {err}")))
    }

    pub fn package_list(&self) -> Result<Vec<(String, String)>> {
        refs::package_list(self.layout())
    }

    /// Drop the reference. Blobs stay until the garbage collector finds
    /// them unreachable.
    pub fn package_remove(&self, name: &str, version: &str) -> Result<()> {
        refs::package_remove(self.layout(), name, version)?;
        tracing::info!(name, version, "package reference removed");
        Ok(())
    }

    /// Resolve a package together with its full blob closure, for handing
    /// to an archiver or a remote replica.
    pub async fn package_export(&self, name: &str, version: &str) -> Result<PackageExport> {
        let (hash, package) = self.package_resolve(name, version).await?;

        let mut closure = vec![hash];
        let mut tasks = IndexMap::new();
        for (task_name, task_hash) in &package.tasks {
            let task = self.read_task_object(task_hash).await?;
            closure.push(*task_hash);
            closure.push(task.command_ir);
            tasks.insert(task_name.clone(), task);
        }
        self.collect_tree_closure(&package.data.root, &package.data.structure, &mut closure)
            .await?;

        closure.sort();
        closure.dedup();
        Ok(PackageExport { name: name.to_string(), version: version.to_string(), hash, package, tasks, closure })
    }

    async fn collect_tree_closure(
        &self,
        root: &Hash,
        structure: &Structure,
        out: &mut Vec<Hash>,
    ) -> Result<()> {
        let mut stack: Vec<(Hash, Structure)> = vec![(*root, structure.clone())];
        while let Some((tree_hash, node)) = stack.pop() {
            out.push(tree_hash);
            let fields = tree::tree_read(self.store(), &tree_hash, &node).await?;
            for (field_name, reference) in &fields {
                match reference {
                    DataRef::Value(value_hash) => out.push(*value_hash),
                    DataRef::Tree(child_hash) => {
                        let child = node
                            .fields()
                            .and_then(|f| f.get(field_name))
                            .cloned()
                            .ok_or_else(|| {
                                Error::ExecutionCorrupt(format!(
                                    "tree {tree_hash} field {field_name} missing from structure"
                                ))
                            })?;
                        stack.push((*child_hash, child));
                    }
                    DataRef::Unassigned | DataRef::Null => {}
                }
            }
        }
        Ok(())
    }
}

/// Structural validation of a package definition.
fn validate_def(def: &PackageDef) -> Result<()> {
    if !matches!(def.structure, Structure::Struct(_)) {
        return Err(Error::PackageInvalid("structure root must be a struct".to_string()));
    }

    let mut outputs: IndexMap<&DataPath, &str> = IndexMap::new();
    for (name, task) in &def.tasks {
        let output_node = def.structure.at_path(&task.output);
        if !output_node.is_some_and(Structure::is_leaf) {
            return Err(Error::PackageInvalid(format!(
                "task {name} output {} is not a dataset",
                task.output
            )));
        }
        if let Some(previous) = outputs.insert(&task.output, name) {
            return Err(Error::PackageInvalid(format!(
                "tasks {previous} and {name} both produce {}",
                task.output
            )));
        }
        for input in &task.inputs {
            let input_node = def.structure.at_path(input);
            if !input_node.is_some_and(Structure::is_leaf) {
                return Err(Error::PackageInvalid(format!(
                    "task {name} input {input} is not a dataset"
                )));
            }
            if input == &task.output {
                return Err(Error::PackageInvalid(format!(
                    "task {name} reads its own output {input}"
                )));
            }
        }
    }

    for (path, _) in &def.initial {
        let node = def.structure.at_path(path);
        if !node.is_some_and(Structure::is_leaf) {
            return Err(Error::PackageInvalid(format!("initial value path {path} is not a dataset")));
        }
        if let Some(task_name) = outputs.get(path) {
            return Err(Error::PackageInvalid(format!(
                "initial value for {path} collides with output of task {task_name}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "packages_tests.rs"]
mod tests;
