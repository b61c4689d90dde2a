// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Garbage collection safety across shared packages.

use crate::prelude::*;
use std::time::Duration;

async fn import(repo: &Repository, name: &str, ir_marker: &[u8]) {
    let ir = repo.store().write(ir_marker).await.expect("store ir");
    let structure = Structure::branch([
        ("seed", Structure::leaf(ValueType::Int)),
        ("out", Structure::leaf(ValueType::Int)),
    ]);
    let mut tasks = IndexMap::new();
    tasks.insert("compute".to_string(), TaskObject {
        command_ir: ir,
        inputs: vec![path(".seed")],
        output: path(".out"),
    });
    let def = PackageDef {
        structure,
        tasks,
        // Identical initial data: the value blob and root tree are shared
        initial: vec![(path(".seed"), Value::Int(42))],
    };
    repo.package_import(name, "1.0.0", &def).await.expect("import");
}

#[tokio::test]
async fn removing_one_package_never_collects_shared_blobs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = Repository::init(dir.path()).expect("init");
    import(&repo, "a", b"ir for a").await;
    import(&repo, "b", b"ir for b").await;

    repo.package_remove("a", "1.0.0").expect("remove");
    let report = repo_gc(&repo, &GcOptions { dry_run: false, min_age: Duration::ZERO })
        .await
        .expect("gc");

    // a-only blobs went away
    assert!(report.deleted_objects > 0);

    // every blob of b is retained and still readable
    let export = repo.package_export("b", "1.0.0").await.expect("export");
    for hash in &export.closure {
        assert!(repo.store().exists(hash).await.expect("exists"), "{hash} was collected");
        repo.store().read(hash).await.expect("readable");
    }
}

#[tokio::test]
async fn workspace_and_cache_roots_survive_package_removal() {
    let fx = fixture(
        &["seed", "out"],
        &[("compute", OpEvaluator::ir("scale", Some(Value::Int(2))), &["seed"], "out")],
        &[("seed", 21)],
    )
    .await;
    let state = fx.run().await;
    let output_hash = state.tasks["compute"].output_hash.expect("output");

    fx.repo.package_remove("pkg", "1.0.0").expect("remove");
    repo_gc(&fx.repo, &GcOptions { dry_run: false, min_age: Duration::ZERO })
        .await
        .expect("gc");

    // The workspace still reads end to end and the cached output survived
    assert_eq!(fx.get_int(".data.out").await, Some(42));
    assert!(fx.repo.store().exists(&output_hash).await.expect("exists"));

    // A rerun is still a cache hit
    let rerun = fx.run().await;
    assert_eq!((rerun.counters.executed, rerun.counters.cached), (0, 1));
}

#[tokio::test]
async fn gc_with_grace_window_spares_fresh_garbage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = Repository::init(dir.path()).expect("init");
    repo.store().write(b"just written, unreferenced").await.expect("write");

    let report = repo_gc(&repo, &GcOptions { dry_run: false, min_age: Duration::from_secs(60) })
        .await
        .expect("gc");
    assert_eq!(report.deleted_objects, 0);
    assert_eq!(report.skipped_young, 1);
}
