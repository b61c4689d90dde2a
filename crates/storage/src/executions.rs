// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution record store.
//!
//! Records live under `executions/<task-hash>/<inputs-hash>/<id>/`, one
//! directory per attempt, so listing the attempts for a `(task, inputs)`
//! pair is a directory read. Status files are replaced atomically; a record
//! is written as `running` on start and updated exactly once to a terminal
//! status. Stale `running` records (dead process) are kept verbatim and
//! merely interpreted as dead by readers.

use crate::atomic::replace_file;
use crate::layout::RepoLayout;
use crate::process;
use beast_core::{codec, Error, ExecutionId, ExecutionRecord, ExecutionStatus, Hash, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Store for the `executions/` namespace of one repository.
#[derive(Debug, Clone)]
pub struct ExecutionStore {
    layout: RepoLayout,
}

impl ExecutionStore {
    pub fn new(layout: RepoLayout) -> Self {
        Self { layout }
    }

    /// Write (or replace) the status of one execution attempt.
    pub fn put(
        &self,
        task: &Hash,
        inputs: &Hash,
        id: &ExecutionId,
        status: &ExecutionStatus,
    ) -> Result<()> {
        let record = ExecutionRecord { id: *id, status: status.clone() };
        let bytes = codec::to_vec(&record)
            .map_err(|err| Error::Internal(format!("encode execution record: {err}")))?;
        replace_file(&self.layout.execution_status_path(task, inputs, id), &bytes)?;
        tracing::debug!(
            task = %task.short(),
            inputs = %inputs.short(),
            id = %id,
            status = status.name(),
            "execution record written"
        );
        Ok(())
    }

    /// Read one attempt. `None` when absent.
    pub fn get(
        &self,
        task: &Hash,
        inputs: &Hash,
        id: &ExecutionId,
    ) -> Result<Option<ExecutionRecord>> {
        read_record(&self.layout.execution_status_path(task, inputs, id))
    }

    /// All attempts for a `(task, inputs)` pair, oldest first.
    pub fn list(&self, task: &Hash, inputs: &Hash) -> Result<Vec<ExecutionRecord>> {
        let dir = self.layout.execution_inputs_dir(task, inputs);
        let mut ids: Vec<ExecutionId> = Vec::new();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Ok(id) = ExecutionId::parse(&entry.file_name().to_string_lossy()) {
                ids.push(id);
            }
        }
        // UUIDv7: id order is start order
        ids.sort();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get(task, inputs, &id)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Every inputs-hash that has at least one attempt for this task.
    pub fn list_for_task(&self, task: &Hash) -> Result<Vec<Hash>> {
        let dir = self.layout.executions_dir().join(task.to_hex());
        let mut out = Vec::new();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(out),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Ok(hash) = Hash::from_hex(&entry.file_name().to_string_lossy()) {
                out.push(hash);
            }
        }
        out.sort();
        Ok(out)
    }

    /// The current record for a pair: a `running` attempt whose process is
    /// alive takes precedence; otherwise the most recent terminal attempt
    /// by completion time.
    pub fn current(&self, task: &Hash, inputs: &Hash) -> Result<Option<ExecutionRecord>> {
        let records = self.list(task, inputs)?;
        let live_running = records.iter().rev().find(|record| match &record.status {
            ExecutionStatus::Running { pid, start_time, boot_id } => {
                process::is_recorded_process_alive(*pid, *start_time, boot_id)
            }
            _ => false,
        });
        if let Some(record) = live_running {
            return Ok(Some(record.clone()));
        }
        Ok(records
            .into_iter()
            .filter(|record| record.status.is_terminal())
            .max_by_key(|record| (record.status.completed_at(), record.id)))
    }

    /// The most recent successful attempt, used by the memoization cache.
    /// A stale `running` record is never returned.
    pub fn latest_success(&self, task: &Hash, inputs: &Hash) -> Result<Option<ExecutionRecord>> {
        Ok(self
            .list(task, inputs)?
            .into_iter()
            .filter(|record| matches!(record.status, ExecutionStatus::Success { .. }))
            .max_by_key(|record| (record.status.completed_at(), record.id)))
    }

    /// Output hashes of every successful attempt in the repository.
    /// These are garbage collection roots.
    pub fn success_outputs(&self) -> Result<Vec<Hash>> {
        let mut out = Vec::new();
        let executions_dir = self.layout.executions_dir();
        let task_dirs = match fs::read_dir(&executions_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(out),
            Err(err) => return Err(err.into()),
        };
        for task_entry in task_dirs {
            let task_entry = task_entry?;
            if !task_entry.file_type()?.is_dir() {
                continue;
            }
            for inputs_entry in fs::read_dir(task_entry.path())? {
                let inputs_entry = inputs_entry?;
                if !inputs_entry.file_type()?.is_dir() {
                    continue;
                }
                for record_entry in fs::read_dir(inputs_entry.path())? {
                    let record_entry = record_entry?;
                    if !record_entry.file_type()?.is_dir() {
                        continue;
                    }
                    let status_path = record_entry
                        .path()
                        .join(format!("status.{}", crate::layout::BLOB_SUFFIX));
                    if let Some(record) = read_record(&status_path)? {
                        if let Some(output) = record.status.output_hash() {
                            out.push(output);
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// Append a chunk to the attempt's captured stdout.
    pub fn append_stdout(
        &self,
        task: &Hash,
        inputs: &Hash,
        id: &ExecutionId,
        chunk: &[u8],
    ) -> Result<()> {
        append(&self.layout.execution_stdout_path(task, inputs, id), chunk)
    }

    /// Append a chunk to the attempt's captured stderr.
    pub fn append_stderr(
        &self,
        task: &Hash,
        inputs: &Hash,
        id: &ExecutionId,
        chunk: &[u8],
    ) -> Result<()> {
        append(&self.layout.execution_stderr_path(task, inputs, id), chunk)
    }

    /// Captured stdout of an attempt, empty when nothing was written.
    pub fn read_stdout(&self, task: &Hash, inputs: &Hash, id: &ExecutionId) -> Result<Vec<u8>> {
        read_or_empty(&self.layout.execution_stdout_path(task, inputs, id))
    }

    /// Captured stderr of an attempt, empty when nothing was written.
    pub fn read_stderr(&self, task: &Hash, inputs: &Hash, id: &ExecutionId) -> Result<Vec<u8>> {
        read_or_empty(&self.layout.execution_stderr_path(task, inputs, id))
    }
}

fn read_record(path: &Path) -> Result<Option<ExecutionRecord>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let record = codec::from_slice(&bytes)
        .map_err(|err| Error::ExecutionCorrupt(format!("{}: {err}", path.display())))?;
    Ok(Some(record))
}

fn append(path: &Path, chunk: &[u8]) -> Result<()> {
    use std::io::Write;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(chunk)?;
    Ok(())
}

fn read_or_empty(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
#[path = "executions_tests.rs"]
mod tests;
