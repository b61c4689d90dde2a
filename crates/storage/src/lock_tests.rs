// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[tokio::test]
async fn acquire_and_release() {
    let dir = tempdir().unwrap();
    let layout = RepoLayout::new(dir.path());

    let handle =
        acquire(&layout, "ws", LockKind::Dataflow, &LockOptions::default()).await.unwrap();
    assert_eq!(handle.workspace(), "ws");
    assert_eq!(handle.info().pid, process::current_pid());

    // Metadata is readable while held
    let info = holder(&layout, "ws").unwrap();
    assert_eq!(info.pid, process::current_pid());
    assert_eq!(info.command, LockKind::Dataflow);

    handle.release();

    // Reacquirable after release
    let handle =
        acquire(&layout, "ws", LockKind::Deploy, &LockOptions::default()).await.unwrap();
    drop(handle);
}

#[tokio::test]
async fn contention_reports_the_holder() {
    let dir = tempdir().unwrap();
    let layout = RepoLayout::new(dir.path());

    let _held =
        acquire(&layout, "ws", LockKind::Dataflow, &LockOptions::default()).await.unwrap();

    let err = acquire(&layout, "ws", LockKind::Gc, &LockOptions::default()).await.unwrap_err();
    match err {
        beast_core::Error::WorkspaceLocked { workspace, holder } => {
            assert_eq!(workspace, "ws");
            assert_eq!(holder.pid, process::current_pid());
            assert_eq!(holder.command, LockKind::Dataflow);
        }
        other => panic!("expected WorkspaceLocked, got {other}"),
    }
}

#[tokio::test]
async fn kinds_compete_for_the_same_lock() {
    let dir = tempdir().unwrap();
    let layout = RepoLayout::new(dir.path());

    let _held = acquire(&layout, "ws", LockKind::Admin, &LockOptions::default()).await.unwrap();
    // A different kind does not bypass exclusion
    assert!(acquire(&layout, "ws", LockKind::Deploy, &LockOptions::default()).await.is_err());
}

#[tokio::test]
async fn locks_are_per_workspace() {
    let dir = tempdir().unwrap();
    let layout = RepoLayout::new(dir.path());

    let _a = acquire(&layout, "a", LockKind::Dataflow, &LockOptions::default()).await.unwrap();
    let _b = acquire(&layout, "b", LockKind::Dataflow, &LockOptions::default()).await.unwrap();
}

#[tokio::test]
async fn wait_mode_acquires_once_freed() {
    let dir = tempdir().unwrap();
    let layout = RepoLayout::new(dir.path());

    let held = acquire(&layout, "ws", LockKind::Dataflow, &LockOptions::default()).await.unwrap();

    let layout_clone = layout.clone();
    let waiter = tokio::spawn(async move {
        acquire(
            &layout_clone,
            "ws",
            LockKind::Deploy,
            &LockOptions { wait: true, timeout: Some(std::time::Duration::from_secs(5)) },
        )
        .await
    });

    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    held.release();

    let handle = waiter.await.unwrap().unwrap();
    assert_eq!(handle.info().command, LockKind::Deploy);
}

#[tokio::test]
async fn wait_mode_times_out() {
    let dir = tempdir().unwrap();
    let layout = RepoLayout::new(dir.path());

    let _held = acquire(&layout, "ws", LockKind::Dataflow, &LockOptions::default()).await.unwrap();

    let err = acquire(
        &layout,
        "ws",
        LockKind::Deploy,
        &LockOptions { wait: true, timeout: Some(std::time::Duration::from_millis(300)) },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, beast_core::Error::WorkspaceLocked { .. }));
}

#[tokio::test]
async fn stale_metadata_is_reclaimed() {
    let dir = tempdir().unwrap();
    let layout = RepoLayout::new(dir.path());

    // Simulate a crashed holder: metadata present, kernel lock gone
    std::fs::create_dir_all(layout.workspaces_dir()).unwrap();
    let stale = beast_core::LockInfo {
        pid: u32::MAX - 1,
        boot_id: "other-boot".to_string(),
        start_time: 1,
        acquired_at: chrono::Utc::now(),
        command: LockKind::Dataflow,
    };
    std::fs::write(
        layout.workspace_lock_path("ws"),
        serde_json::to_string(&stale).unwrap(),
    )
    .unwrap();

    // Acquire must succeed and replace the stale record
    let handle = acquire(&layout, "ws", LockKind::Gc, &LockOptions::default()).await.unwrap();
    assert_eq!(handle.info().pid, process::current_pid());
    let info = holder(&layout, "ws").unwrap();
    assert_eq!(info.command, LockKind::Gc);
}

#[tokio::test]
async fn drop_releases_the_lock() {
    let dir = tempdir().unwrap();
    let layout = RepoLayout::new(dir.path());

    {
        let _handle =
            acquire(&layout, "ws", LockKind::Dataflow, &LockOptions::default()).await.unwrap();
    }
    // Handle dropped; lock must be free
    let _handle = acquire(&layout, "ws", LockKind::Deploy, &LockOptions::default()).await.unwrap();
}
