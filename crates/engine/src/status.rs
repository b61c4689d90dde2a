// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-dataset status derivation.
//!
//! For every leaf of the deployed structure: `unset` when unassigned;
//! `up-to-date` when set and, for task outputs, produced by the current
//! task definition from the current inputs; `stale` otherwise. Read-only,
//! so it is safe to call while an execution runs.

use crate::cache;
use beast_core::{DataRef, DatasetReport, DatasetStatus, Result, TaskObject};
use beast_storage::{Repository, Resolved};

/// Status of every dataset leaf in a workspace, in structure order.
pub async fn workspace_status(repo: &Repository, workspace: &str) -> Result<Vec<DatasetReport>> {
    let state = repo.workspace_get(workspace)?;
    let (_, package) = self_package(repo, &state, workspace).await?;

    // Task outputs, by path
    let mut producers: Vec<(String, String, beast_core::Hash, TaskObject)> = Vec::new();
    for (task_name, task_hash) in &package.tasks {
        let task = repo.read_task_object(task_hash).await?;
        producers.push((task.output.to_string(), task_name.clone(), *task_hash, task));
    }

    let mut reports = Vec::new();
    for (path, _) in package.data.structure.leaves() {
        let reference = match repo.workspace_resolve(workspace, &path).await? {
            Resolved::Leaf(reference) => reference,
            Resolved::Branch(_) => continue,
        };

        let producer = producers.iter().find(|(output, ..)| *output == path.to_string());
        let produced_by = producer.map(|(_, name, ..)| name.clone());

        let (status, hash) = match reference {
            DataRef::Unassigned => (DatasetStatus::Unset, None),
            DataRef::Null => (DatasetStatus::UpToDate, None),
            DataRef::Tree(_) => continue,
            DataRef::Value(hash) => {
                let status = match producer {
                    None => DatasetStatus::UpToDate,
                    Some((_, _, task_hash, task)) => {
                        output_freshness(repo, workspace, task_hash, task, &hash).await?
                    }
                };
                (status, Some(hash))
            }
        };

        reports.push(DatasetReport { path, status, hash, produced_by });
    }
    Ok(reports)
}

/// Whether a task output equals what the current task definition would
/// produce from the current inputs.
async fn output_freshness(
    repo: &Repository,
    workspace: &str,
    task_hash: &beast_core::Hash,
    task: &TaskObject,
    current: &beast_core::Hash,
) -> Result<DatasetStatus> {
    // Inputs not all set: the value cannot have come from the current state
    let Some(input_hashes) = cache::resolve_input_hashes(repo, workspace, task).await? else {
        return Ok(DatasetStatus::Stale);
    };
    let inputs_hash = cache::inputs_hash(&input_hashes);
    match repo.executions().latest_success(task_hash, &inputs_hash)? {
        Some(record) if record.status.output_hash() == Some(*current) => {
            Ok(DatasetStatus::UpToDate)
        }
        _ => Ok(DatasetStatus::Stale),
    }
}

async fn self_package(
    repo: &Repository,
    state: &beast_core::WorkspaceState,
    workspace: &str,
) -> Result<(beast_core::Deployment, beast_core::PackageObject)> {
    repo.workspace_package(state)
        .await
        .map_err(|_| beast_core::Error::WorkspaceNotDeployed(workspace.to_string()))
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
