// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process liveness probing.
//!
//! A recorded `{pid, start_time, boot_id}` triple identifies a process
//! across PID reuse: signal-0 says whether the PID exists at all, the boot
//! id rules out records from a previous boot, and the per-process start
//! time rules out a recycled PID within the same boot. Where the platform
//! does not expose boot id or start time the probe degrades to the signal
//! check alone.

use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs;

pub fn current_pid() -> u32 {
    std::process::id()
}

/// The host's boot identifier, or empty when unavailable.
pub fn boot_id() -> String {
    fs::read_to_string("/proc/sys/kernel/random/boot_id")
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Kernel start time of a process in clock ticks, or `None` when
/// unavailable (foreign platform, or the process is gone).
pub fn process_start_time(pid: u32) -> Option<u64> {
    let stat = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    // Fields after the parenthesized command name; comm may itself contain
    // parens, so split at the last closing one. starttime is field 22.
    let after_comm = &stat[stat.rfind(')')? + 1..];
    after_comm.split_whitespace().nth(19)?.parse().ok()
}

/// Whether any process currently has this PID.
pub fn pid_alive(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else { return false };
    if pid <= 0 {
        return false;
    }
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        // EPERM means the process exists but belongs to someone else
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Whether the recorded process identity still names a live process.
pub fn is_recorded_process_alive(pid: u32, start_time: u64, recorded_boot_id: &str) -> bool {
    if !recorded_boot_id.is_empty() {
        let current = boot_id();
        if !current.is_empty() && current != recorded_boot_id {
            return false;
        }
    }
    if !pid_alive(pid) {
        return false;
    }
    if start_time > 0 {
        if let Some(current_start) = process_start_time(pid) {
            return current_start == start_time;
        }
    }
    true
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
