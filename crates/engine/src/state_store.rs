// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution state persistence.
//!
//! The orchestrator persists its full state after every transition so a
//! successor process can always reconstruct where an execution stood. Two
//! implementations: an in-memory store for tests and a file store keeping
//! `<workspace-dir>/execution.beast2` (the current or last execution) with
//! a sibling `execution-counter` text file for run-id allocation.

use async_trait::async_trait;
use beast_core::{
    codec, DataflowState, DataflowStatus, Error, Result, SequencedEvent, TaskState,
};
use beast_storage::atomic::replace_file;
use beast_storage::RepoLayout;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::ErrorKind;

/// Store for per-workspace dataflow execution state.
#[async_trait]
pub trait ExecutionStateStore: Send + Sync + 'static {
    /// Persist a fresh execution. Replaces any previous (terminal) one.
    async fn create(&self, state: &DataflowState) -> Result<()>;

    /// Read the execution with this id. `None` when absent.
    async fn read(&self, workspace: &str, id: u64) -> Result<Option<DataflowState>>;

    /// Read the most recent execution regardless of status.
    async fn read_latest(&self, workspace: &str) -> Result<Option<DataflowState>>;

    /// Persist the full state.
    async fn update(&self, state: &DataflowState) -> Result<()>;

    /// Update one task's state.
    async fn update_task_status(
        &self,
        workspace: &str,
        id: u64,
        task: &str,
        task_state: TaskState,
    ) -> Result<()>;

    /// Update the overall status.
    async fn update_status(
        &self,
        workspace: &str,
        id: u64,
        status: DataflowStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Append one event.
    async fn record_event(&self, workspace: &str, id: u64, event: SequencedEvent) -> Result<()>;

    /// Events with `seq > since_seq`.
    async fn events_since(
        &self,
        workspace: &str,
        id: u64,
        since_seq: u64,
    ) -> Result<Vec<SequencedEvent>>;

    /// Allocate the next monotonic run id for a workspace.
    async fn next_execution_id(&self, workspace: &str) -> Result<u64>;

    /// Drop the stored state (keeps the counter).
    async fn delete(&self, workspace: &str) -> Result<()>;

    /// The stored execution if it is still `running`, for crash recovery.
    async fn incomplete(&self, workspace: &str) -> Result<Option<DataflowState>>;
}

fn missing(workspace: &str, id: u64) -> Error {
    Error::Internal(format!("no execution state for {workspace}#{id}"))
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<String, DataflowState>>,
    counters: Mutex<HashMap<String, u64>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutate<F>(&self, workspace: &str, id: u64, apply: F) -> Result<()>
    where
        F: FnOnce(&mut DataflowState),
    {
        let mut states = self.states.lock();
        let state = states
            .get_mut(workspace)
            .filter(|state| state.id == id)
            .ok_or_else(|| missing(workspace, id))?;
        apply(state);
        Ok(())
    }
}

#[async_trait]
impl ExecutionStateStore for MemoryStateStore {
    async fn create(&self, state: &DataflowState) -> Result<()> {
        self.states.lock().insert(state.workspace.clone(), state.clone());
        Ok(())
    }

    async fn read(&self, workspace: &str, id: u64) -> Result<Option<DataflowState>> {
        Ok(self
            .states
            .lock()
            .get(workspace)
            .filter(|state| state.id == id)
            .cloned())
    }

    async fn read_latest(&self, workspace: &str) -> Result<Option<DataflowState>> {
        Ok(self.states.lock().get(workspace).cloned())
    }

    async fn update(&self, state: &DataflowState) -> Result<()> {
        self.states.lock().insert(state.workspace.clone(), state.clone());
        Ok(())
    }

    async fn update_task_status(
        &self,
        workspace: &str,
        id: u64,
        task: &str,
        task_state: TaskState,
    ) -> Result<()> {
        self.mutate(workspace, id, |state| {
            state.tasks.insert(task.to_string(), task_state);
        })
    }

    async fn update_status(
        &self,
        workspace: &str,
        id: u64,
        status: DataflowStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.mutate(workspace, id, |state| {
            state.status = status;
            state.completed_at = completed_at;
        })
    }

    async fn record_event(&self, workspace: &str, id: u64, event: SequencedEvent) -> Result<()> {
        self.mutate(workspace, id, |state| state.events.push(event))
    }

    async fn events_since(
        &self,
        workspace: &str,
        id: u64,
        since_seq: u64,
    ) -> Result<Vec<SequencedEvent>> {
        let states = self.states.lock();
        let state = states
            .get(workspace)
            .filter(|state| state.id == id)
            .ok_or_else(|| missing(workspace, id))?;
        Ok(state.events_since(since_seq))
    }

    async fn next_execution_id(&self, workspace: &str) -> Result<u64> {
        let mut counters = self.counters.lock();
        let counter = counters.entry(workspace.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn delete(&self, workspace: &str) -> Result<()> {
        self.states.lock().remove(workspace);
        Ok(())
    }

    async fn incomplete(&self, workspace: &str) -> Result<Option<DataflowState>> {
        Ok(self
            .states
            .lock()
            .get(workspace)
            .filter(|state| state.status == DataflowStatus::Running)
            .cloned())
    }
}

/// File-backed store: atomic temp-file + rename on every update.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    layout: RepoLayout,
}

impl FileStateStore {
    pub fn new(layout: RepoLayout) -> Self {
        Self { layout }
    }

    fn load(&self, workspace: &str) -> Result<Option<DataflowState>> {
        let path = self.layout.execution_state_path(workspace);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let state = codec::from_slice(&bytes)
            .map_err(|err| Error::ExecutionCorrupt(format!("{}: {err}", path.display())))?;
        Ok(Some(state))
    }

    fn save(&self, state: &DataflowState) -> Result<()> {
        let bytes = codec::to_vec(state)
            .map_err(|err| Error::Internal(format!("encode execution state: {err}")))?;
        replace_file(&self.layout.execution_state_path(&state.workspace), &bytes)?;
        Ok(())
    }

    fn mutate<F>(&self, workspace: &str, id: u64, apply: F) -> Result<()>
    where
        F: FnOnce(&mut DataflowState),
    {
        let mut state = self
            .load(workspace)?
            .filter(|state| state.id == id)
            .ok_or_else(|| missing(workspace, id))?;
        apply(&mut state);
        self.save(&state)
    }
}

#[async_trait]
impl ExecutionStateStore for FileStateStore {
    async fn create(&self, state: &DataflowState) -> Result<()> {
        self.save(state)
    }

    async fn read(&self, workspace: &str, id: u64) -> Result<Option<DataflowState>> {
        Ok(self.load(workspace)?.filter(|state| state.id == id))
    }

    async fn read_latest(&self, workspace: &str) -> Result<Option<DataflowState>> {
        self.load(workspace)
    }

    async fn update(&self, state: &DataflowState) -> Result<()> {
        self.save(state)
    }

    async fn update_task_status(
        &self,
        workspace: &str,
        id: u64,
        task: &str,
        task_state: TaskState,
    ) -> Result<()> {
        self.mutate(workspace, id, |state| {
            state.tasks.insert(task.to_string(), task_state);
        })
    }

    async fn update_status(
        &self,
        workspace: &str,
        id: u64,
        status: DataflowStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.mutate(workspace, id, |state| {
            state.status = status;
            state.completed_at = completed_at;
        })
    }

    async fn record_event(&self, workspace: &str, id: u64, event: SequencedEvent) -> Result<()> {
        self.mutate(workspace, id, |state| state.events.push(event))
    }

    async fn events_since(
        &self,
        workspace: &str,
        id: u64,
        since_seq: u64,
    ) -> Result<Vec<SequencedEvent>> {
        let state = self
            .load(workspace)?
            .filter(|state| state.id == id)
            .ok_or_else(|| missing(workspace, id))?;
        Ok(state.events_since(since_seq))
    }

    async fn next_execution_id(&self, workspace: &str) -> Result<u64> {
        let path = self.layout.execution_counter_path(workspace);
        let current: u64 = match std::fs::read_to_string(&path) {
            Ok(text) => text.trim().parse().map_err(|_| {
                Error::ExecutionCorrupt(format!("execution counter {}: {text:?}", path.display()))
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => 0,
            Err(err) => return Err(err.into()),
        };
        let next = current + 1;
        replace_file(&path, format!("{next}\n").as_bytes())?;
        Ok(next)
    }

    async fn delete(&self, workspace: &str) -> Result<()> {
        match std::fs::remove_file(self.layout.execution_state_path(workspace)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn incomplete(&self, workspace: &str) -> Result<Option<DataflowState>> {
        Ok(self
            .load(workspace)?
            .filter(|state| state.status == DataflowStatus::Running))
    }
}

#[cfg(test)]
#[path = "state_store_tests.rs"]
mod tests;
