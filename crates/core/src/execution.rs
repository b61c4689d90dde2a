// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task execution records.
//!
//! Stored under `executions/<task-hash>/<inputs-hash>/<id>/status.beast2`.
//! IDs are UUIDv7, so the lexicographic order of record directories is the
//! order the executions started.

use crate::hash::Hash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time-ordered identifier of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    /// Allocate a fresh time-ordered id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ExecutionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for ExecutionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <&str>::deserialize(deserializer)?;
        ExecutionId::parse(s).map_err(serde::de::Error::custom)
    }
}

/// Status of one execution attempt.
///
/// A record is written as `running` when the attempt starts and updated
/// exactly once to one of the terminal variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running {
        pid: u32,
        /// Process start time, for PID-reuse disambiguation.
        start_time: u64,
        boot_id: String,
    },
    Success {
        output_hash: Hash,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    Failed {
        exit_code: i32,
        completed_at: DateTime<Utc>,
    },
    Error {
        message: String,
        completed_at: DateTime<Utc>,
    },
}

impl ExecutionStatus {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionStatus::Running { .. } => "running",
            ExecutionStatus::Success { .. } => "success",
            ExecutionStatus::Failed { .. } => "failed",
            ExecutionStatus::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running { .. })
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ExecutionStatus::Running { .. } => None,
            ExecutionStatus::Success { completed_at, .. }
            | ExecutionStatus::Failed { completed_at, .. }
            | ExecutionStatus::Error { completed_at, .. } => Some(*completed_at),
        }
    }

    pub fn output_hash(&self) -> Option<Hash> {
        match self {
            ExecutionStatus::Success { output_hash, .. } => Some(*output_hash),
            _ => None,
        }
    }
}

/// One stored execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub status: ExecutionStatus,
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
