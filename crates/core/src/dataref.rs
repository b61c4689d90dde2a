// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tree object references.
//!
//! A tree object is a mapping from field name to [`DataRef`]. On the wire a
//! reference is `{"value": "<hex>"}`, `{"tree": "<hex>"}`, the string
//! `"unassigned"`, or null. The generic traversal in the garbage collector
//! interprets exactly this shape.

use crate::codec::Value;
use crate::hash::Hash;
use indexmap::IndexMap;
use serde::de::{self, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};

/// The decoded fields of a tree object.
pub type TreeFields = IndexMap<String, DataRef>;

/// A reference held by a tree object field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRef {
    /// Leaf holding a concrete value blob.
    Value(Hash),
    /// Nested subtree blob.
    Tree(Hash),
    /// A dataset that has not been produced yet.
    Unassigned,
    /// Explicitly null leaf.
    Null,
}

impl DataRef {
    pub fn kind(&self) -> &'static str {
        match self {
            DataRef::Value(_) => "value",
            DataRef::Tree(_) => "tree",
            DataRef::Unassigned => "unassigned",
            DataRef::Null => "null",
        }
    }

    pub fn value_hash(&self) -> Option<Hash> {
        match self {
            DataRef::Value(hash) => Some(*hash),
            _ => None,
        }
    }

    pub fn tree_hash(&self) -> Option<Hash> {
        match self {
            DataRef::Tree(hash) => Some(*hash),
            _ => None,
        }
    }

    /// Interpret a dynamic value as a reference, for readers walking blobs
    /// without a schema. Returns `None` when the shape does not match.
    pub fn from_value(value: &Value) -> Option<DataRef> {
        match value {
            Value::Null => Some(DataRef::Null),
            Value::String(s) if s == "unassigned" => Some(DataRef::Unassigned),
            Value::Struct(fields) if fields.len() == 1 => {
                let (key, hash) = fields.iter().next()?;
                let hash = Hash::from_hex(hash.as_str()?).ok()?;
                match key.as_str() {
                    "value" => Some(DataRef::Value(hash)),
                    "tree" => Some(DataRef::Tree(hash)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for DataRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataRef::Value(hash) => write!(f, "value({})", hash.short()),
            DataRef::Tree(hash) => write!(f, "tree({})", hash.short()),
            DataRef::Unassigned => write!(f, "unassigned"),
            DataRef::Null => write!(f, "null"),
        }
    }
}

impl Serialize for DataRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DataRef::Value(hash) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("value", hash)?;
                map.end()
            }
            DataRef::Tree(hash) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("tree", hash)?;
                map.end()
            }
            DataRef::Unassigned => serializer.serialize_str("unassigned"),
            DataRef::Null => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for DataRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RefVisitor;

        impl<'de> Visitor<'de> for RefVisitor {
            type Value = DataRef;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a data reference")
            }

            fn visit_unit<E: de::Error>(self) -> Result<DataRef, E> {
                Ok(DataRef::Null)
            }

            fn visit_none<E: de::Error>(self) -> Result<DataRef, E> {
                Ok(DataRef::Null)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<DataRef, E> {
                match v {
                    "unassigned" => Ok(DataRef::Unassigned),
                    other => Err(E::unknown_variant(other, &["unassigned"])),
                }
            }

            fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<DataRef, A::Error> {
                let Some(key) = map.next_key::<String>()? else {
                    return Err(de::Error::custom("reference struct is empty"));
                };
                let hash: Hash = map.next_value()?;
                if map.next_key::<String>()?.is_some() {
                    return Err(de::Error::custom("reference struct has extra fields"));
                }
                match key.as_str() {
                    "value" => Ok(DataRef::Value(hash)),
                    "tree" => Ok(DataRef::Tree(hash)),
                    other => Err(de::Error::unknown_variant(other, &["value", "tree"])),
                }
            }
        }

        deserializer.deserialize_any(RefVisitor)
    }
}

#[cfg(test)]
#[path = "dataref_tests.rs"]
mod tests;
