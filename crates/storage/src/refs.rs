// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named mutable references.
//!
//! Two of the three reference namespaces live here: package references
//! (`packages/<name>/<version>`, a text file holding a hash) and workspace
//! state (`workspaces/<name>.beast2`, a structured blob). Execution records
//! are in [`crate::executions`]. All writes are temp-file + rename, so
//! lock-free readers always observe complete contents. Missing files mean
//! "no such reference" and are reported as `None`, never as errors.

use crate::atomic::replace_file;
use crate::layout::RepoLayout;
use beast_core::{codec, Error, Hash, Result, WorkspaceState};
use std::fs;
use std::io::ErrorKind;

/// Write a package reference, overwriting any previous target.
pub fn package_write(layout: &RepoLayout, name: &str, version: &str, hash: &Hash) -> Result<()> {
    let path = layout.package_ref_path(name, version);
    replace_file(&path, format!("{hash}\n").as_bytes())?;
    Ok(())
}

/// Resolve a package reference. `None` when absent.
pub fn package_read(layout: &RepoLayout, name: &str, version: &str) -> Result<Option<Hash>> {
    let path = layout.package_ref_path(name, version);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let hash = Hash::from_hex(text.trim())
        .map_err(|err| Error::PackageInvalid(format!("{name}/{version}: {err}")))?;
    Ok(Some(hash))
}

/// Remove a package reference. Idempotent; prunes the name directory when
/// its last version is removed (best-effort).
pub fn package_remove(layout: &RepoLayout, name: &str, version: &str) -> Result<()> {
    let path = layout.package_ref_path(name, version);
    match fs::remove_file(&path) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    let _ = fs::remove_dir(layout.package_name_dir(name));
    Ok(())
}

/// All `(name, version)` pairs with a reference, sorted.
pub fn package_list(layout: &RepoLayout) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    let packages_dir = layout.packages_dir();
    let names = match fs::read_dir(&packages_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(out),
        Err(err) => return Err(err.into()),
    };
    for name_entry in names {
        let name_entry = name_entry?;
        if !name_entry.file_type()?.is_dir() {
            continue;
        }
        let name = name_entry.file_name().to_string_lossy().to_string();
        for version_entry in fs::read_dir(name_entry.path())? {
            let version_entry = version_entry?;
            if version_entry.file_type()?.is_file() {
                out.push((name.clone(), version_entry.file_name().to_string_lossy().to_string()));
            }
        }
    }
    out.sort();
    Ok(out)
}

/// Write workspace state. Only call while holding the workspace lock.
pub fn workspace_write(layout: &RepoLayout, workspace: &str, state: &WorkspaceState) -> Result<()> {
    let bytes = codec::to_vec(state)
        .map_err(|err| Error::Internal(format!("encode workspace state: {err}")))?;
    replace_file(&layout.workspace_state_path(workspace), &bytes)?;
    Ok(())
}

/// Read workspace state. `None` when the workspace does not exist.
pub fn workspace_read(layout: &RepoLayout, workspace: &str) -> Result<Option<WorkspaceState>> {
    let path = layout.workspace_state_path(workspace);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let state = codec::from_slice(&bytes)
        .map_err(|err| Error::ExecutionCorrupt(format!("workspace {workspace}: {err}")))?;
    Ok(Some(state))
}

/// Delete workspace state. Idempotent.
pub fn workspace_delete(layout: &RepoLayout, workspace: &str) -> Result<()> {
    match fs::remove_file(layout.workspace_state_path(workspace)) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// All workspace names with a state file, sorted.
pub fn workspace_list(layout: &RepoLayout) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let dir = layout.workspaces_dir();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(out),
        Err(err) => return Err(err.into()),
    };
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        if let Some(name) = file_name.strip_suffix(&format!(".{}", crate::layout::BLOB_SUFFIX)) {
            out.push(name.to_string());
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
#[path = "refs_tests.rs"]
mod tests;
