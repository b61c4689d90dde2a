// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn store(dir: &tempfile::TempDir) -> LocalObjectStore {
    LocalObjectStore::new(RepoLayout::new(dir.path()))
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let dir = tempdir().unwrap();
    let store = store(&dir);

    let hash = store.write(b"hello blob").await.unwrap();
    assert_eq!(store.read(&hash).await.unwrap(), b"hello blob");
    assert!(store.exists(&hash).await.unwrap());
    assert_eq!(store.stat(&hash).await.unwrap(), 10);
}

#[tokio::test]
async fn stored_file_name_is_the_content_hash() {
    let dir = tempdir().unwrap();
    let store = store(&dir);

    let hash = store.write(b"addressed").await.unwrap();
    let path = RepoLayout::new(dir.path()).object_path(&hash);
    assert!(path.exists());
    assert_eq!(Hash::digest(&std::fs::read(&path).unwrap()), hash);

    // Two-level prefix layout
    let (prefix, _) = hash.split_prefix();
    assert!(path.parent().unwrap().ends_with(&prefix));
}

#[tokio::test]
async fn write_is_idempotent_and_byte_identical() {
    let dir = tempdir().unwrap();
    let store = store(&dir);

    let first = store.write(b"same content").await.unwrap();
    let path = RepoLayout::new(dir.path()).object_path(&first);
    let mtime_before = std::fs::metadata(&path).unwrap().modified().unwrap();

    let second = store.write(b"same content").await.unwrap();
    assert_eq!(first, second);
    // Early return leaves the original file untouched
    assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), mtime_before);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn read_missing_is_object_not_found() {
    let dir = tempdir().unwrap();
    let store = store(&dir);
    let missing = Hash::digest(b"never stored");
    assert!(matches!(store.read(&missing).await, Err(beast_core::Error::ObjectNotFound(h)) if h == missing));
    assert!(!store.exists(&missing).await.unwrap());
}

#[tokio::test]
async fn list_returns_all_hashes_and_ignores_partials() {
    let dir = tempdir().unwrap();
    let store = store(&dir);

    let a = store.write(b"one").await.unwrap();
    let b = store.write(b"two").await.unwrap();

    // A leftover staging file must not be listed as an object
    let dest = RepoLayout::new(dir.path()).object_path(&a);
    std::fs::write(dest.with_file_name("leftover.beast2.123.abc.partial"), b"junk").unwrap();

    let mut listed = store.list().await.unwrap();
    listed.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(listed, expected);
    assert_eq!(store.count().await.unwrap(), 2);

    let partials = store.partials().unwrap();
    assert_eq!(partials.len(), 1);
}

#[tokio::test]
async fn write_stream_matches_write() {
    let dir = tempdir().unwrap();
    let store = store(&dir);

    let payload = vec![7u8; 100_000];
    let direct = store.write(&payload).await.unwrap();

    let dir2 = tempdir().unwrap();
    let store2 = store_at(&dir2);
    let mut reader = std::io::Cursor::new(payload.clone());
    let streamed = store2.write_stream(&mut reader).await.unwrap();

    assert_eq!(direct, streamed);
    assert_eq!(store2.read(&streamed).await.unwrap(), payload);
    // No staging files left behind
    assert!(store2.partials().unwrap().is_empty());
}

fn store_at(dir: &tempfile::TempDir) -> LocalObjectStore {
    LocalObjectStore::new(RepoLayout::new(dir.path()))
}

#[tokio::test]
async fn write_stream_of_existing_content_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = store(&dir);

    let hash = store.write(b"already here").await.unwrap();
    let mut reader = std::io::Cursor::new(b"already here".to_vec());
    assert_eq!(store.write_stream(&mut reader).await.unwrap(), hash);
    assert_eq!(store.count().await.unwrap(), 1);
    assert!(store.partials().unwrap().is_empty());
}

#[tokio::test]
async fn remove_object_reports_freed_bytes() {
    let dir = tempdir().unwrap();
    let store = store(&dir);

    let hash = store.write(b"doomed").await.unwrap();
    assert_eq!(store.remove_object(&hash).unwrap(), 6);
    assert!(!store.exists(&hash).await.unwrap());
    // Idempotent
    assert_eq!(store.remove_object(&hash).unwrap(), 0);
}
