// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data tree shapes.
//!
//! A [`Structure`] is the compile-time shape of a workspace's data tree:
//! nested named branches with typed leaves. It is part of a package and
//! never changes within a deployed workspace.

use crate::codec::ValueType;
use crate::path::DataPath;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The shape of a data tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Structure {
    /// A branch with named, ordered children.
    Struct(IndexMap<String, Structure>),
    /// A leaf holding a value of the given type.
    Value(ValueType),
}

impl Structure {
    /// Build a branch from (name, child) pairs.
    pub fn branch<N: Into<String>>(children: impl IntoIterator<Item = (N, Structure)>) -> Self {
        Structure::Struct(children.into_iter().map(|(name, child)| (name.into(), child)).collect())
    }

    pub fn leaf(value_type: ValueType) -> Self {
        Structure::Value(value_type)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Structure::Value(_))
    }

    pub fn fields(&self) -> Option<&IndexMap<String, Structure>> {
        match self {
            Structure::Struct(fields) => Some(fields),
            Structure::Value(_) => None,
        }
    }

    /// The node at `path`, or `None` if the path leaves the structure.
    pub fn at_path(&self, path: &DataPath) -> Option<&Structure> {
        let mut node = self;
        for segment in path.segments() {
            node = node.fields()?.get(segment)?;
        }
        Some(node)
    }

    /// All leaves in declared (preorder) order, with their paths.
    pub fn leaves(&self) -> Vec<(DataPath, &ValueType)> {
        let mut out = Vec::new();
        match self {
            Structure::Value(_) => {}
            Structure::Struct(fields) => {
                for (name, child) in fields {
                    collect_leaves(child, DataPath::from_segments([name.clone()]), &mut out);
                }
            }
        }
        out
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Structure::Value(_) => 1,
            Structure::Struct(fields) => fields.values().map(Structure::leaf_count).sum(),
        }
    }
}

fn collect_leaves<'a>(
    node: &'a Structure,
    path: DataPath,
    out: &mut Vec<(DataPath, &'a ValueType)>,
) {
    match node {
        Structure::Value(value_type) => out.push((path, value_type)),
        Structure::Struct(fields) => {
            for (name, child) in fields {
                collect_leaves(child, path.child(name.clone()), out);
            }
        }
    }
}

#[cfg(test)]
#[path = "structure_tests.rs"]
mod tests;
