// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use beast_core::Hash;

#[test]
fn object_paths_use_two_level_prefix() {
    let layout = RepoLayout::new("/repo");
    let hash = Hash::digest(b"x");
    let (prefix, rest) = hash.split_prefix();
    assert_eq!(
        layout.object_path(&hash),
        std::path::Path::new("/repo")
            .join("objects")
            .join(prefix)
            .join(format!("{rest}.beast2"))
    );
}

#[test]
fn workspace_paths() {
    let layout = RepoLayout::new("/repo");
    assert_eq!(layout.workspace_state_path("ws"), std::path::Path::new("/repo/workspaces/ws.beast2"));
    assert_eq!(layout.workspace_lock_path("ws"), std::path::Path::new("/repo/workspaces/ws.lock"));
    assert_eq!(
        layout.execution_state_path("ws"),
        std::path::Path::new("/repo/workspaces/ws/execution.beast2")
    );
    assert_eq!(
        layout.execution_counter_path("ws"),
        std::path::Path::new("/repo/workspaces/ws/execution-counter")
    );
}

#[test]
fn execution_record_paths() {
    let layout = RepoLayout::new("/repo");
    let task = Hash::digest(b"task");
    let inputs = Hash::digest(b"inputs");
    let id = ExecutionId::generate();

    let status = layout.execution_status_path(&task, &inputs, &id);
    assert!(status.starts_with("/repo/executions"));
    assert!(status.ends_with(format!("{id}/status.beast2")));
    assert_eq!(layout.execution_stdout_path(&task, &inputs, &id).file_name().unwrap(), "stdout");
    assert_eq!(layout.execution_stderr_path(&task, &inputs, &id).file_name().unwrap(), "stderr");
}

#[test]
fn top_level_dirs_are_the_four_namespaces() {
    let layout = RepoLayout::new("/repo");
    let names: Vec<String> = layout
        .top_level_dirs()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, ["objects", "packages", "workspaces", "executions"]);
}
