// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dataflow execution state.
//!
//! One record per workspace, persisted after every transition so a
//! successor process can always reconstruct where an execution stood. The
//! transition helpers here are pure; the orchestrator drives them and owns
//! persistence.

use crate::event::{ExecutionEvent, SequencedEvent};
use crate::hash::Hash;
use crate::path::DataPath;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Overall status of a dataflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataflowStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl DataflowStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DataflowStatus::Running)
    }
}

impl std::fmt::Display for DataflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataflowStatus::Running => write!(f, "running"),
            DataflowStatus::Completed => write!(f, "completed"),
            DataflowStatus::Failed => write!(f, "failed"),
            DataflowStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Status of one task within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Blocked on at least one dependency.
    Waiting,
    /// All inputs resolved; eligible for dispatch.
    Ready,
    InProgress,
    Completed,
    Failed,
    /// Never ran: an upstream failed, or the task was filtered out.
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Waiting => write!(f, "waiting"),
            TaskStatus::Ready => write!(f, "ready"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Per-task execution state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub status: TaskStatus,
    /// True when the result came from the execution cache.
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub output_hash: Option<Hash>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Waiting
    }
}

/// One node of the dependency graph: a task's identity, its declared paths,
/// and the tasks whose outputs it consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub name: String,
    pub task_hash: Hash,
    pub inputs: Vec<DataPath>,
    pub output: DataPath,
    /// Names of tasks this one depends on, in declared-input order.
    pub depends_on: Vec<String>,
}

/// Execution counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub executed: u64,
    pub cached: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// The persisted state of one dataflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataflowState {
    pub id: u64,
    pub repo: PathBuf,
    pub workspace: String,
    pub status: DataflowStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub concurrency: usize,
    pub force: bool,
    #[serde(default)]
    pub filter: Option<Vec<String>>,
    /// Driver process identity, for crash detection by successors.
    pub pid: u32,
    #[serde(default)]
    pub boot_id: String,
    pub graph: IndexMap<String, TaskNode>,
    pub tasks: IndexMap<String, TaskState>,
    #[serde(default)]
    pub counters: Counters,
    #[serde(default)]
    pub events: Vec<SequencedEvent>,
}

impl DataflowState {
    /// Names of tasks currently eligible for dispatch, in graph order.
    pub fn ready_names(&self) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|(_, task)| task.status == TaskStatus::Ready)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// True when every task is in a terminal state.
    pub fn is_complete(&self) -> bool {
        self.tasks.values().all(|task| task.status.is_terminal())
    }

    pub fn any_failed(&self) -> bool {
        self.tasks.values().any(|task| task.status == TaskStatus::Failed)
    }

    pub fn task(&self, name: &str) -> Option<&TaskState> {
        self.tasks.get(name)
    }

    pub fn task_mut(&mut self, name: &str) -> Option<&mut TaskState> {
        self.tasks.get_mut(name)
    }

    /// Append an event, stamping the next sequence number.
    pub fn record_event(&mut self, event: ExecutionEvent, at: DateTime<Utc>) -> u64 {
        let seq = self.events.last().map(|e| e.seq + 1).unwrap_or(1);
        self.events.push(SequencedEvent { seq, at, event });
        seq
    }

    pub fn events_since(&self, since_seq: u64) -> Vec<SequencedEvent> {
        self.events.iter().filter(|e| e.seq > since_seq).cloned().collect()
    }

    /// Promote waiting tasks whose dependencies have all completed.
    /// Returns the promoted names.
    pub fn promote_ready(&mut self) -> Vec<String> {
        let mut promoted = Vec::new();
        let names: Vec<String> = self.tasks.keys().cloned().collect();
        for name in names {
            let waiting = self.tasks.get(&name).map(|t| t.status == TaskStatus::Waiting);
            if waiting != Some(true) {
                continue;
            }
            let Some(node) = self.graph.get(&name) else { continue };
            let satisfied = node.depends_on.iter().all(|dep| {
                self.tasks.get(dep).map(|t| t.status == TaskStatus::Completed).unwrap_or(false)
            });
            if satisfied {
                if let Some(task) = self.tasks.get_mut(&name) {
                    task.status = TaskStatus::Ready;
                    promoted.push(name);
                }
            }
        }
        promoted
    }

    /// Skip every non-terminal task downstream of `failed_task`,
    /// transitively. Returns `(task, failed_dependency)` pairs in the order
    /// they were skipped.
    pub fn skip_dependents(&mut self, failed_task: &str) -> Vec<(String, String)> {
        let mut skipped = Vec::new();
        let mut frontier = vec![failed_task.to_string()];
        while let Some(upstream) = frontier.pop() {
            let dependents: Vec<String> = self
                .graph
                .values()
                .filter(|node| node.depends_on.contains(&upstream))
                .map(|node| node.name.clone())
                .collect();
            for name in dependents {
                let Some(task) = self.tasks.get_mut(&name) else { continue };
                if task.status.is_terminal() || task.status == TaskStatus::InProgress {
                    continue;
                }
                task.status = TaskStatus::Skipped;
                self.counters.skipped += 1;
                skipped.push((name.clone(), upstream.clone()));
                frontier.push(name);
            }
        }
        skipped
    }
}

#[cfg(test)]
#[path = "dataflow_tests.rs"]
mod tests;
