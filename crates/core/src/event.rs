// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dataflow execution events.
//!
//! Events are facts about what the orchestrator did, stamped with a
//! monotonically increasing sequence number and persisted as part of the
//! execution state after every transition.

use crate::dataflow::DataflowStatus;
use crate::hash::Hash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One orchestrator event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// A task was dispatched to the executor.
    Start { task: String },
    /// A task was satisfied from the execution cache; no executor ran.
    Cached { task: String, output_hash: Hash },
    /// A task completed and its output was committed to the workspace.
    Complete { task: String, output_hash: Hash, duration_ms: u64 },
    /// The executor exited non-zero.
    Failed { task: String, exit_code: i32 },
    /// The executor or runner raised.
    Error { task: String, message: String },
    /// A task was skipped because an upstream dependency failed.
    InputUnavailable { task: String, failed_dependency: String },
    /// Cancellation was observed.
    Cancel,
    /// The execution reached a terminal status.
    Finalize { status: DataflowStatus },
}

impl ExecutionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionEvent::Start { .. } => "start",
            ExecutionEvent::Cached { .. } => "cached",
            ExecutionEvent::Complete { .. } => "complete",
            ExecutionEvent::Failed { .. } => "failed",
            ExecutionEvent::Error { .. } => "error",
            ExecutionEvent::InputUnavailable { .. } => "input_unavailable",
            ExecutionEvent::Cancel => "cancel",
            ExecutionEvent::Finalize { .. } => "finalize",
        }
    }

    /// The task the event concerns, when any.
    pub fn task(&self) -> Option<&str> {
        match self {
            ExecutionEvent::Start { task }
            | ExecutionEvent::Cached { task, .. }
            | ExecutionEvent::Complete { task, .. }
            | ExecutionEvent::Failed { task, .. }
            | ExecutionEvent::Error { task, .. }
            | ExecutionEvent::InputUnavailable { task, .. } => Some(task),
            ExecutionEvent::Cancel | ExecutionEvent::Finalize { .. } => None,
        }
    }
}

/// An event with its position in the execution's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencedEvent {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub event: ExecutionEvent,
}
