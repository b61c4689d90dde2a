// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive per-workspace advisory locks.
//!
//! Mutual exclusion comes from a kernel-managed exclusive lock on
//! `workspaces/<name>.lock`, which the operating system releases when the
//! holder dies, so crashed holders never wedge a workspace. The JSON metadata
//! in the file is diagnostics only: it names the holder for
//! `WorkspaceLocked` errors and lets a contender annotate staleness, but it
//! never decides mutual exclusion on its own.

use crate::layout::RepoLayout;
use crate::process;
use beast_core::{Error, LockInfo, LockKind, Result};
use chrono::Utc;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::time::Duration;

/// How long to sleep between attempts in wait mode.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Acquisition behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockOptions {
    /// Keep retrying instead of failing on contention.
    pub wait: bool,
    /// Give up after this long in wait mode. `None` waits forever.
    pub timeout: Option<Duration>,
}

/// A held workspace lock. Dropping the handle releases it; [`release`]
/// does so explicitly. Double release is impossible by construction, which
/// makes release trivially idempotent.
///
/// [`release`]: LockHandle::release
#[derive(Debug)]
pub struct LockHandle {
    file: Option<File>,
    workspace: String,
    info: LockInfo,
}

impl LockHandle {
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    /// Release the lock, clearing the holder metadata.
    pub fn release(mut self) {
        self.unlock();
    }

    fn unlock(&mut self) {
        if let Some(file) = self.file.take() {
            // Truncate so a later reader does not see us as a stale holder.
            // The file itself stays: unlinking a lock file races with
            // concurrent openers and can hand out two locks on different
            // inodes.
            let _ = file.set_len(0);
            let _ = FileExt::unlock(&file);
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.unlock();
    }
}

/// Acquire the exclusive lock for a workspace.
///
/// Fails with `WorkspaceLocked { holder }` on contention (after the timeout
/// in wait mode). The holder info is read from the lock file and annotated
/// via a liveness probe; a stale record left by a crashed process is
/// reclaimed automatically because the kernel lock died with its holder.
pub async fn acquire(
    layout: &RepoLayout,
    workspace: &str,
    kind: LockKind,
    opts: &LockOptions,
) -> Result<LockHandle> {
    let deadline = opts.timeout.map(|t| std::time::Instant::now() + t);
    loop {
        match try_acquire(layout, workspace, kind)? {
            Ok(handle) => {
                tracing::debug!(workspace, kind = %kind, "lock acquired");
                return Ok(handle);
            }
            Err(holder) => {
                let expired = deadline.is_some_and(|d| std::time::Instant::now() >= d);
                if !opts.wait || expired {
                    return Err(Error::WorkspaceLocked {
                        workspace: workspace.to_string(),
                        holder,
                    });
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }
}

/// Read the current holder metadata without taking the lock. `None` when
/// nobody holds it (or no metadata survives).
pub fn holder(layout: &RepoLayout, workspace: &str) -> Option<LockInfo> {
    let text = std::fs::read_to_string(layout.workspace_lock_path(workspace)).ok()?;
    serde_json::from_str(&text).ok()
}

/// One attempt. `Ok(Ok(handle))` on success, `Ok(Err(holder))` on
/// contention.
fn try_acquire(
    layout: &RepoLayout,
    workspace: &str,
    kind: LockKind,
) -> Result<std::result::Result<LockHandle, LockInfo>> {
    std::fs::create_dir_all(layout.workspaces_dir())?;
    let path = layout.workspace_lock_path(workspace);

    // Open without truncating: the file may hold the running owner's
    // metadata, which must survive our failed attempt.
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;

    if file.try_lock_exclusive().is_err() {
        return Ok(Err(holder(layout, workspace).unwrap_or_else(unknown_holder)));
    }

    // Lock is ours; replace whatever metadata a previous holder left.
    let info = LockInfo {
        pid: process::current_pid(),
        boot_id: process::boot_id(),
        start_time: process::process_start_time(process::current_pid()).unwrap_or(0),
        acquired_at: Utc::now(),
        command: kind,
    };
    let json = serde_json::to_string_pretty(&info)
        .map_err(|err| Error::Internal(format!("encode lock metadata: {err}")))?;
    let mut file = file;
    file.set_len(0)?;
    file.write_all(json.as_bytes())?;
    file.flush()?;

    Ok(Ok(LockHandle { file: Some(file), workspace: workspace.to_string(), info }))
}

fn unknown_holder() -> LockInfo {
    LockInfo {
        pid: 0,
        boot_id: String::new(),
        start_time: 0,
        acquired_at: Utc::now(),
        command: LockKind::Admin,
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
