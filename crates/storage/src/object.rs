// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed object store.
//!
//! Blobs are immutable and keyed by the SHA-256 of their bytes. Writes are
//! all-or-nothing: content is staged to a `.partial` file in the destination
//! directory and renamed into place, so a reader that opens the file for a
//! hash never sees a partial payload. Races between writers of identical
//! content are harmless; the loser's rename finds the destination present
//! and its staging file is cleaned up.

use crate::layout::{RepoLayout, BLOB_SUFFIX};
use async_trait::async_trait;
use beast_core::{Error, Hash, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Abstract blob storage. The local filesystem backend is
/// [`LocalObjectStore`]; alternative backends implement this trait.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Store bytes, returning their content hash. Idempotent.
    async fn write(&self, bytes: &[u8]) -> Result<Hash>;

    /// Store a stream without buffering it in memory.
    async fn write_stream(&self, reader: &mut (dyn AsyncRead + Send + Unpin)) -> Result<Hash>;

    async fn read(&self, hash: &Hash) -> Result<Vec<u8>>;

    async fn exists(&self, hash: &Hash) -> Result<bool>;

    /// Size in bytes of the stored blob.
    async fn stat(&self, hash: &Hash) -> Result<u64>;

    async fn list(&self) -> Result<Vec<Hash>>;

    async fn count(&self) -> Result<usize>;
}

/// A stored object with its sweep-relevant metadata.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub hash: Hash,
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// Local filesystem backend under `<repo>/objects/`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    layout: RepoLayout,
}

impl LocalObjectStore {
    pub fn new(layout: RepoLayout) -> Self {
        Self { layout }
    }

    fn partial_path(dest: &Path) -> PathBuf {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let file_name = dest
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(BLOB_SUFFIX);
        dest.with_file_name(format!("{file_name}.{epoch_ms}.{}.partial", nanoid::nanoid!(6)))
    }

    /// Move a fully-written staging file into place. Treats "destination
    /// already exists" as success: content addressing makes the copies
    /// identical.
    fn commit_partial(partial: &Path, dest: &Path) -> Result<()> {
        if dest.exists() {
            let _ = fs::remove_file(partial);
            return Ok(());
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::rename(partial, dest) {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(partial);
                if dest.exists() {
                    Ok(())
                } else {
                    Err(err.into())
                }
            }
        }
    }

    fn parse_object_name(prefix: &str, file_name: &str) -> Option<Hash> {
        let rest = file_name.strip_suffix(&format!(".{BLOB_SUFFIX}"))?;
        if prefix.len() != 2 || rest.len() != 62 {
            return None;
        }
        Hash::from_hex(&format!("{prefix}{rest}")).ok()
    }

    /// Every stored object with size and mtime, for the sweep phase.
    pub fn objects(&self) -> Result<Vec<ObjectEntry>> {
        let mut out = Vec::new();
        let objects_dir = self.layout.objects_dir();
        for prefix_entry in read_dir_or_empty(&objects_dir)? {
            let prefix_entry = prefix_entry?;
            if !prefix_entry.file_type()?.is_dir() {
                continue;
            }
            let prefix = prefix_entry.file_name().to_string_lossy().to_string();
            for entry in fs::read_dir(prefix_entry.path())? {
                let entry = entry?;
                let file_name = entry.file_name().to_string_lossy().to_string();
                let Some(hash) = Self::parse_object_name(&prefix, &file_name) else {
                    continue;
                };
                let meta = entry.metadata()?;
                out.push(ObjectEntry {
                    hash,
                    path: entry.path(),
                    size: meta.len(),
                    modified: meta.modified().unwrap_or(UNIX_EPOCH),
                });
            }
        }
        Ok(out)
    }

    /// Orphaned staging files with their mtimes, recursively under
    /// `objects/`.
    pub fn partials(&self) -> Result<Vec<(PathBuf, SystemTime)>> {
        let mut out = Vec::new();
        let objects_dir = self.layout.objects_dir();
        collect_partials(&objects_dir, &mut out)?;
        Ok(out)
    }

    /// Delete one object, returning its size. Used only by the garbage
    /// collector after the mark phase.
    pub fn remove_object(&self, hash: &Hash) -> Result<u64> {
        let path = self.layout.object_path(hash);
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        match fs::remove_file(&path) {
            Ok(()) => Ok(size),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    pub fn remove_partial(&self, path: &Path) -> Result<u64> {
        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        match fs::remove_file(path) {
            Ok(()) => Ok(size),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err.into()),
        }
    }
}

fn read_dir_or_empty(dir: &Path) -> Result<Box<dyn Iterator<Item = std::io::Result<fs::DirEntry>>>> {
    match fs::read_dir(dir) {
        Ok(entries) => Ok(Box::new(entries)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Box::new(std::iter::empty())),
        Err(err) => Err(err.into()),
    }
}

fn collect_partials(dir: &Path, out: &mut Vec<(PathBuf, SystemTime)>) -> Result<()> {
    for entry in read_dir_or_empty(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_partials(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "partial") {
            let modified = entry.metadata()?.modified().unwrap_or(UNIX_EPOCH);
            out.push((path, modified));
        }
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn write(&self, bytes: &[u8]) -> Result<Hash> {
        let hash = Hash::digest(bytes);
        let dest = self.layout.object_path(&hash);
        if dest.exists() {
            return Ok(hash);
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let partial = Self::partial_path(&dest);
        fs::write(&partial, bytes)?;
        Self::commit_partial(&partial, &dest)?;
        Ok(hash)
    }

    async fn write_stream(&self, reader: &mut (dyn AsyncRead + Send + Unpin)) -> Result<Hash> {
        // The destination is unknown until the stream has been hashed, so
        // stage at the top of objects/ and move into the prefix directory
        // on commit (still one filesystem, so the rename stays atomic).
        let objects_dir = self.layout.objects_dir();
        fs::create_dir_all(&objects_dir)?;
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let staging = objects_dir.join(format!("{epoch_ms}.{}.partial", nanoid::nanoid!(6)));

        let mut file = tokio::fs::File::create(&staging).await?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) => {
                    drop(file);
                    let _ = fs::remove_file(&staging);
                    return Err(err.into());
                }
            };
            hasher.update(&buf[..n]);
            if let Err(err) = tokio::io::AsyncWriteExt::write_all(&mut file, &buf[..n]).await {
                drop(file);
                let _ = fs::remove_file(&staging);
                return Err(err.into());
            }
        }
        tokio::io::AsyncWriteExt::flush(&mut file).await?;
        drop(file);

        let hash = Hash::from_bytes(hasher.finalize().into());
        let dest = self.layout.object_path(&hash);
        Self::commit_partial(&staging, &dest)?;
        Ok(hash)
    }

    async fn read(&self, hash: &Hash) -> Result<Vec<u8>> {
        match fs::read(self.layout.object_path(hash)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::ObjectNotFound(*hash))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn exists(&self, hash: &Hash) -> Result<bool> {
        Ok(self.layout.object_path(hash).exists())
    }

    async fn stat(&self, hash: &Hash) -> Result<u64> {
        match fs::metadata(self.layout.object_path(hash)) {
            Ok(meta) => Ok(meta.len()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::ObjectNotFound(*hash))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self) -> Result<Vec<Hash>> {
        Ok(self.objects()?.into_iter().map(|entry| entry.hash).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.objects()?.len())
    }
}

#[cfg(test)]
#[path = "object_tests.rs"]
mod tests;
