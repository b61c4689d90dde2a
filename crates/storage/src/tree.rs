// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dataset tree layer.
//!
//! Tree objects are blobs mapping field names to [`DataRef`]s, validated
//! against the deployed structure on both read and write. Mutation rewrites
//! only the chain from root to the changed leaf; untouched siblings are
//! reused by hash (structural sharing). All writes here are content
//! addressed and idempotent; the commit point for any mutation is the
//! workspace root swap, which happens a layer above.

use crate::object::ObjectStore;
use beast_core::{codec, DataPath, DataRef, Error, Hash, Result, Structure, TreeFields, Value, ValueType};
use std::future::Future;
use std::pin::Pin;

/// What a path resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The path ends at a leaf; this is its reference.
    Leaf(DataRef),
    /// The path ends at a branch; this is the subtree's hash.
    Branch(Hash),
}

/// Validate fields against a branch structure and store the tree object.
pub async fn tree_write(
    store: &dyn ObjectStore,
    fields: &TreeFields,
    structure: &Structure,
) -> Result<Hash> {
    validate_fields(fields, structure)?;
    let bytes = codec::to_vec(fields)
        .map_err(|err| Error::Internal(format!("encode tree object: {err}")))?;
    store.write(&bytes).await
}

/// Read a tree object and reject shapes that deviate from the structure.
pub async fn tree_read(
    store: &dyn ObjectStore,
    hash: &Hash,
    structure: &Structure,
) -> Result<TreeFields> {
    let bytes = store.read(hash).await?;
    let fields: TreeFields = codec::from_slice(&bytes)
        .map_err(|err| Error::ExecutionCorrupt(format!("tree object {hash}: {err}")))?;
    validate_fields(&fields, structure)
        .map_err(|_| Error::ExecutionCorrupt(format!("tree object {hash} deviates from structure")))?;
    Ok(fields)
}

/// Store a dataset value in the self-describing format.
pub async fn dataset_write(store: &dyn ObjectStore, value: &Value) -> Result<Hash> {
    let bytes = codec::to_vec(value)
        .map_err(|err| Error::Internal(format!("encode dataset value: {err}")))?;
    store.write(&bytes).await
}

/// Read a dataset value; the type descriptor comes from the bytes alone.
pub async fn dataset_read(store: &dyn ObjectStore, hash: &Hash) -> Result<(ValueType, Value)> {
    let bytes = store.read(hash).await?;
    let value = codec::decode_value(&bytes)
        .map_err(|err| Error::ExecutionCorrupt(format!("dataset {hash}: {err}")))?;
    Ok((value.value_type(), value))
}

/// Walk `path` from `root`, returning the reference at its end (or the
/// subtree hash when the path stops at a branch).
pub async fn resolve_path(
    store: &dyn ObjectStore,
    root: &Hash,
    path: &DataPath,
    structure: &Structure,
) -> Result<Resolved> {
    if structure.at_path(path).is_none() {
        return Err(Error::DatasetNotFound(path.clone()));
    }

    let mut node_hash = *root;
    let mut node_structure = structure;
    let segments = path.segments();
    for (depth, segment) in segments.iter().enumerate() {
        let fields = tree_read(store, &node_hash, node_structure).await?;
        let Some(reference) = fields.get(segment) else {
            return Err(Error::DatasetNotFound(path.clone()));
        };
        let child_structure = node_structure
            .fields()
            .and_then(|f| f.get(segment))
            .ok_or_else(|| Error::DatasetNotFound(path.clone()))?;
        let last = depth + 1 == segments.len();
        if last {
            return match (child_structure.is_leaf(), reference) {
                (true, reference) => Ok(Resolved::Leaf(*reference)),
                (false, DataRef::Tree(hash)) => Ok(Resolved::Branch(*hash)),
                (false, other) => Err(Error::ExecutionCorrupt(format!(
                    "branch {path} holds {other} instead of a subtree"
                ))),
            };
        }
        match reference {
            DataRef::Tree(hash) => {
                node_hash = *hash;
                node_structure = child_structure;
            }
            other => {
                return Err(Error::ExecutionCorrupt(format!(
                    "branch segment {segment} of {path} holds {other}"
                )))
            }
        }
    }
    // Empty paths never parse, so the loop always returns.
    Err(Error::DatasetNotFound(path.clone()))
}

/// Build the all-unassigned tree skeleton for a structure, bottom-up.
/// Used when a package is imported without initial data for some leaves.
pub async fn initial_root(store: &dyn ObjectStore, structure: &Structure) -> Result<Hash> {
    match build_subtree(store, structure).await? {
        DataRef::Tree(hash) => Ok(hash),
        other => Err(Error::Internal(format!("structure root built as {other}"))),
    }
}

fn build_subtree<'a>(
    store: &'a dyn ObjectStore,
    structure: &'a Structure,
) -> Pin<Box<dyn Future<Output = Result<DataRef>> + Send + 'a>> {
    Box::pin(async move {
        match structure {
            Structure::Value(_) => Ok(DataRef::Unassigned),
            Structure::Struct(children) => {
                let mut fields = TreeFields::new();
                for (name, child) in children {
                    fields.insert(name.clone(), build_subtree(store, child).await?);
                }
                let hash = tree_write(store, &fields, structure).await?;
                Ok(DataRef::Tree(hash))
            }
        }
    })
}

/// Replace the reference at a leaf path, rewriting the chain of tree
/// objects from the leaf's parent up to a new root. Returns the new root
/// hash; the caller commits it by swapping the workspace root.
pub async fn set_dataset(
    store: &dyn ObjectStore,
    root: &Hash,
    structure: &Structure,
    path: &DataPath,
    new_ref: DataRef,
) -> Result<Hash> {
    match structure.at_path(path) {
        Some(node) if node.is_leaf() => {}
        _ => return Err(Error::DatasetNotFound(path.clone())),
    }

    // Walk down, recording every tree on the path.
    let segments = path.segments();
    let mut chain: Vec<(TreeFields, &Structure, &String)> = Vec::with_capacity(segments.len());
    let mut node_hash = *root;
    let mut node_structure = structure;
    for (depth, segment) in segments.iter().enumerate() {
        let fields = tree_read(store, &node_hash, node_structure).await?;
        let child_structure = node_structure
            .fields()
            .and_then(|f| f.get(segment))
            .ok_or_else(|| Error::DatasetNotFound(path.clone()))?;
        let last = depth + 1 == segments.len();
        if !last {
            node_hash = match fields.get(segment) {
                Some(DataRef::Tree(hash)) => *hash,
                Some(other) => {
                    return Err(Error::ExecutionCorrupt(format!(
                        "branch segment {segment} of {path} holds {other}"
                    )))
                }
                None => return Err(Error::DatasetNotFound(path.clone())),
            };
        }
        chain.push((fields, node_structure, segment));
        node_structure = child_structure;
    }

    // Rewrite bottom-up: each parent points at its freshly-written child.
    let mut replacement = new_ref;
    let mut new_root = *root;
    for (mut fields, tree_structure, segment) in chain.into_iter().rev() {
        fields.insert((*segment).clone(), replacement);
        let hash = tree_write(store, &fields, tree_structure).await?;
        replacement = DataRef::Tree(hash);
        new_root = hash;
    }
    Ok(new_root)
}

/// Check that every declared field is present with a reference of the
/// matching kind, and that no undeclared fields exist.
fn validate_fields(fields: &TreeFields, structure: &Structure) -> Result<()> {
    let Some(declared) = structure.fields() else {
        return Err(Error::Internal("tree object written for a leaf structure".to_string()));
    };
    for (name, child) in declared {
        let Some(reference) = fields.get(name) else {
            return Err(Error::Internal(format!("tree object is missing field {name}")));
        };
        let ok = if child.is_leaf() {
            matches!(reference, DataRef::Value(_) | DataRef::Unassigned | DataRef::Null)
        } else {
            matches!(reference, DataRef::Tree(_))
        };
        if !ok {
            return Err(Error::Internal(format!(
                "tree field {name} holds {reference} but the structure declares a {}",
                if child.is_leaf() { "leaf" } else { "branch" }
            )));
        }
    }
    for name in fields.keys() {
        if !declared.contains_key(name) {
            return Err(Error::Internal(format!("tree object has undeclared field {name}")));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
