// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace lock metadata.
//!
//! The lock service holds a kernel-managed exclusive lock on the lock file;
//! this metadata exists for diagnostics (who holds it, since when, doing
//! what) and for stale-holder reporting. It is serialized as JSON so a human
//! can read the lock file directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the lock holder is doing. Recorded for diagnostics only; all kinds
/// compete for the same exclusive lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    Dataflow,
    Deploy,
    Gc,
    Admin,
}

impl std::fmt::Display for LockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockKind::Dataflow => write!(f, "dataflow"),
            LockKind::Deploy => write!(f, "deploy"),
            LockKind::Gc => write!(f, "gc"),
            LockKind::Admin => write!(f, "admin"),
        }
    }
}

/// Holder metadata written into the lock file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    /// Host boot identifier at acquisition time, empty when unavailable.
    #[serde(default)]
    pub boot_id: String,
    /// Process start time, for PID-reuse disambiguation. Zero when
    /// unavailable.
    #[serde(default)]
    pub start_time: u64,
    pub acquired_at: DateTime<Utc>,
    pub command: LockKind,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pid {} ({}) since {}", self.pid, self.command, self.acquired_at)
    }
}
