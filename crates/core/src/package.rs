// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Package and task objects.

use crate::codec::{self, CodecError};
use crate::hash::Hash;
use crate::path::DataPath;
use crate::structure::Structure;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An immutable bundle of tasks and an initial data tree, identified by the
/// hash of its serialized bytes. A package reference `name/version` is a
/// mutable name mapping to one package hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageObject {
    /// Task name → task object hash, in declared order.
    pub tasks: IndexMap<String, Hash>,
    pub data: PackageData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageData {
    pub structure: Structure,
    /// Hash of the initial root tree object.
    pub root: Hash,
}

/// A pure function declaration: an executor-interpretable command blob plus
/// the dataset paths it reads and the one it writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskObject {
    pub command_ir: Hash,
    pub inputs: Vec<DataPath>,
    pub output: DataPath,
}

impl PackageObject {
    /// The hash this object would be stored under.
    pub fn object_hash(&self) -> Result<Hash, CodecError> {
        Ok(Hash::digest(&codec::to_vec(self)?))
    }
}

impl TaskObject {
    /// Task identity: the hash of the serialized task object. Execution
    /// records and the memoization cache are keyed by this.
    pub fn object_hash(&self) -> Result<Hash, CodecError> {
        Ok(Hash::digest(&codec::to_vec(self)?))
    }
}

#[cfg(test)]
#[path = "package_tests.rs"]
mod tests;
