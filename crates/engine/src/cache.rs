// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution cache.
//!
//! Task runs are memoized by `(task-hash, inputs-hash)`, where the
//! inputs-hash digests the input value hashes in declared order. A hit is
//! the most recent `success` record; the cached output is reused and no
//! execution is launched. A `running` record from a dead process is never a
//! hit; the record itself is kept untouched.

use beast_core::{codec, DataPath, DataRef, Error, ExecutionRecord, Hash, Result, TaskObject, Value};
use beast_storage::{tree, ExecutionStore, Repository, Resolved};

/// The execution currently standing for a task in a workspace.
#[derive(Debug, Clone)]
pub struct CurrentExecution {
    pub task_hash: Hash,
    pub inputs_hash: Hash,
    pub record: ExecutionRecord,
}

/// Outcome of a cache consultation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDecision {
    /// Reuse this output; skip execution.
    Hit { output_hash: Hash },
    Miss,
}

/// Digest of the input value hashes in declared order.
pub fn inputs_hash(input_hashes: &[Hash]) -> Hash {
    Hash::digest_chain(input_hashes)
}

/// Consult the cache for `(task, inputs)`.
pub fn lookup(executions: &ExecutionStore, task: &Hash, inputs: &Hash) -> Result<CacheDecision> {
    match executions.latest_success(task, inputs)? {
        Some(record) => match record.status.output_hash() {
            Some(output_hash) => Ok(CacheDecision::Hit { output_hash }),
            None => Ok(CacheDecision::Miss),
        },
        None => Ok(CacheDecision::Miss),
    }
}

/// The hash a null leaf contributes as a task input. Content addressing
/// makes this a pure computation; the blob itself is only written when a
/// task actually runs.
pub fn null_input_hash() -> Result<Hash> {
    let bytes = codec::to_vec(&Value::Null)
        .map_err(|err| Error::Internal(format!("encode null value: {err}")))?;
    Ok(Hash::digest(&bytes))
}

/// Resolve declared input paths to value hashes in the workspace's current
/// tree, in order. `None` when any input is still unassigned.
pub async fn resolve_inputs(
    repo: &Repository,
    workspace: &str,
    paths: &[DataPath],
) -> Result<Option<Vec<Hash>>> {
    let mut hashes = Vec::with_capacity(paths.len());
    for path in paths {
        match resolve_leaf(repo, workspace, path).await? {
            Some(hash) => hashes.push(hash),
            None => return Ok(None),
        }
    }
    Ok(Some(hashes))
}

/// [`resolve_inputs`] for a task declaration.
pub async fn resolve_input_hashes(
    repo: &Repository,
    workspace: &str,
    task: &TaskObject,
) -> Result<Option<Vec<Hash>>> {
    resolve_inputs(repo, workspace, &task.inputs).await
}

async fn resolve_leaf(repo: &Repository, workspace: &str, path: &DataPath) -> Result<Option<Hash>> {
    match repo.workspace_resolve(workspace, path).await? {
        Resolved::Leaf(DataRef::Value(hash)) => Ok(Some(hash)),
        Resolved::Leaf(DataRef::Null) => Ok(Some(null_input_hash()?)),
        Resolved::Leaf(DataRef::Unassigned) => Ok(None),
        Resolved::Leaf(DataRef::Tree(_)) | Resolved::Branch(_) => {
            Err(Error::DatasetNotFound(path.clone()))
        }
    }
}

/// The execution record standing for `task_name` under the workspace's
/// current inputs: a live `running` attempt wins, otherwise the most
/// recent terminal one. `None` when the task never ran for these inputs
/// or an input is still unassigned.
pub async fn find_current(
    repo: &Repository,
    workspace: &str,
    task_name: &str,
) -> Result<Option<CurrentExecution>> {
    let state = repo.workspace_get(workspace)?;
    let (_, package) = repo.workspace_package(&state).await?;
    let task_hash = *package
        .tasks
        .get(task_name)
        .ok_or_else(|| Error::TaskNotFound(task_name.to_string()))?;
    let task = repo.read_task_object(&task_hash).await?;

    let Some(input_hashes) = resolve_inputs(repo, workspace, &task.inputs).await? else {
        return Ok(None);
    };
    let inputs_hash = Hash::digest_chain(&input_hashes);
    Ok(repo
        .executions()
        .current(&task_hash, &inputs_hash)?
        .map(|record| CurrentExecution { task_hash, inputs_hash, record }))
}

/// Make sure the canonical null blob exists, so a runner handed a null
/// input hash can read it.
pub async fn ensure_null_blob(repo: &Repository) -> Result<Hash> {
    tree::dataset_write(repo.store(), &Value::Null).await
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
