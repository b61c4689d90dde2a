// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Garbage collection.
//!
//! Roots are every package reference target, every workspace root and
//! package hash, and every successful execution's output hash. The mark
//! phase walks tree objects generically by their `DataRef` wire shape:
//! value leaves are marked without being read, non-decodable blobs count
//! as childless, and missing referents are tolerated. The sweep deletes
//! unreachable objects and orphaned `.partial` staging files, but only
//! ones older than the min-age grace window, which protects in-flight
//! writes that no committed root references yet.

use beast_core::{codec, DataRef, Hash, Result, Value};
use beast_storage::{refs, ObjectStore, Repository};
use std::collections::HashSet;
use std::time::{Duration, SystemTime};

/// Sweep behavior.
#[derive(Debug, Clone, Copy)]
pub struct GcOptions {
    /// Report without deleting.
    pub dry_run: bool,
    /// Leave objects and partials younger than this alone.
    pub min_age: Duration,
}

impl Default for GcOptions {
    fn default() -> Self {
        Self { dry_run: false, min_age: Duration::from_secs(60) }
    }
}

/// Collection results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    pub deleted_objects: usize,
    pub deleted_partials: usize,
    pub retained_objects: usize,
    pub skipped_young: usize,
    pub bytes_freed: u64,
}

/// Collect unreachable objects in a repository.
pub async fn repo_gc(repo: &Repository, opts: &GcOptions) -> Result<GcReport> {
    let roots = collect_roots(repo).await?;
    let reachable = mark(repo, roots).await?;

    let now = SystemTime::now();
    let mut report = GcReport::default();

    for entry in repo.store().objects()? {
        if reachable.contains(&entry.hash) {
            report.retained_objects += 1;
            continue;
        }
        let age = now.duration_since(entry.modified).unwrap_or(Duration::ZERO);
        if age < opts.min_age {
            report.skipped_young += 1;
            continue;
        }
        if opts.dry_run {
            report.deleted_objects += 1;
            report.bytes_freed += entry.size;
        } else {
            report.bytes_freed += repo.store().remove_object(&entry.hash)?;
            report.deleted_objects += 1;
        }
    }

    for (path, modified) in repo.store().partials()? {
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age < opts.min_age {
            report.skipped_young += 1;
            continue;
        }
        if !opts.dry_run {
            report.bytes_freed += repo.store().remove_partial(&path)?;
        }
        report.deleted_partials += 1;
    }

    tracing::info!(
        deleted = report.deleted_objects,
        partials = report.deleted_partials,
        retained = report.retained_objects,
        young = report.skipped_young,
        bytes = report.bytes_freed,
        dry_run = opts.dry_run,
        "garbage collection finished"
    );
    Ok(report)
}

/// Union of package targets, workspace roots, and success outputs.
/// Package objects are expanded here (task objects, command IR, initial
/// root) because their references are typed, not tree-shaped.
async fn collect_roots(repo: &Repository) -> Result<Vec<Hash>> {
    let mut roots = Vec::new();

    for (name, version) in refs::package_list(repo.layout())? {
        if let Some(package_hash) = refs::package_read(repo.layout(), &name, &version)? {
            expand_package(repo, package_hash, &mut roots).await;
        }
    }

    for workspace in refs::workspace_list(repo.layout())? {
        let Some(state) = refs::workspace_read(repo.layout(), &workspace)? else { continue };
        if let Some(root) = state.root {
            roots.push(root);
        }
        if let Some(deployment) = state.deployment {
            expand_package(repo, deployment.package_hash, &mut roots).await;
        }
    }

    roots.extend(repo.executions().success_outputs()?);
    Ok(roots)
}

/// Push a package blob and its typed referents. Undecodable or missing
/// blobs are kept as plain roots; collection must never delete live data
/// because a container confused it.
async fn expand_package(repo: &Repository, package_hash: Hash, roots: &mut Vec<Hash>) {
    roots.push(package_hash);
    let Ok(package) = repo.read_package_object(&package_hash).await else {
        return;
    };
    roots.push(package.data.root);
    for task_hash in package.tasks.values() {
        roots.push(*task_hash);
        if let Ok(task) = repo.read_task_object(task_hash).await {
            roots.push(task.command_ir);
        }
    }
}

/// Depth-first reachability over the `DataRef` wire shape.
async fn mark(repo: &Repository, roots: Vec<Hash>) -> Result<HashSet<Hash>> {
    let mut reachable: HashSet<Hash> = HashSet::new();
    let mut stack = roots;

    while let Some(hash) = stack.pop() {
        if !reachable.insert(hash) {
            continue;
        }
        // Missing referents are tolerated: mark nothing, do not fail
        let Ok(bytes) = repo.store().read(&hash).await else {
            continue;
        };
        let Ok(value) = codec::decode_value(&bytes) else {
            continue;
        };
        walk_refs(&value, &mut reachable, &mut stack);
    }
    Ok(reachable)
}

/// Find `DataRef`-shaped entries anywhere inside a decoded value. Value
/// leaves are marked without reading them; tree references recurse.
/// Over-matching only retains more, never less.
fn walk_refs(value: &Value, reachable: &mut HashSet<Hash>, stack: &mut Vec<Hash>) {
    match value {
        Value::Struct(fields) => {
            for field_value in fields.values() {
                match DataRef::from_value(field_value) {
                    Some(DataRef::Value(leaf)) => {
                        reachable.insert(leaf);
                    }
                    Some(DataRef::Tree(subtree)) => {
                        stack.push(subtree);
                    }
                    Some(_) | None => walk_refs(field_value, reachable, stack),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_refs(item, reachable, stack);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "gc_tests.rs"]
mod tests;
