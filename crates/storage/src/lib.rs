// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! beast-storage: repository persistence.
//!
//! The content-addressed object store, the named reference stores
//! (packages, workspaces, execution records), the exclusive workspace lock,
//! and the dataset tree / package / workspace layers built on top of them.

pub mod atomic;
pub mod executions;
pub mod layout;
pub mod lock;
pub mod object;
pub mod packages;
pub mod process;
pub mod refs;
pub mod repository;
pub mod tree;
pub mod workspace;

pub use executions::ExecutionStore;
pub use layout::RepoLayout;
pub use lock::{LockHandle, LockOptions};
pub use object::{LocalObjectStore, ObjectEntry, ObjectStore};
pub use packages::{PackageDef, PackageExport};
pub use repository::Repository;
pub use tree::Resolved;
