// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content addresses.
//!
//! Every persisted datum is identified by the SHA-256 digest of its
//! serialized bytes, rendered as 64 lowercase hex characters. The first two
//! characters form the object store's prefix directory.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of a hash in hex characters.
pub const HASH_HEX_LEN: usize = 64;

/// Errors from parsing a hash string
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("hash must be {HASH_HEX_LEN} hex chars, got {0}")]
    InvalidLength(usize),
    #[error("hash contains non-hex characters: {0:?}")]
    InvalidHex(String),
}

/// A SHA-256 content address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Digest a byte slice.
    pub fn digest(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// Digest the concatenation of raw hash bytes in iteration order.
    ///
    /// This is the inputs-hash of a task execution: the declared input
    /// order is significant, so callers must pass hashes in that order.
    pub fn digest_chain<'a>(parts: impl IntoIterator<Item = &'a Hash>) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.0);
        }
        Self(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        if s.len() != HASH_HEX_LEN {
            return Err(HashError::InvalidLength(s.len()));
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out).map_err(|_| HashError::InvalidHex(s.to_string()))?;
        Ok(Self(out))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Split into (prefix directory, remainder) for the on-disk layout.
    pub fn split_prefix(&self) -> (String, String) {
        let hex = self.to_hex();
        (hex[..2].to_string(), hex[2..].to_string())
    }

    /// First 8 hex chars, for logging.
    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash({}…)", self.short())
    }
}

impl std::str::FromStr for Hash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Hash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <&str>::deserialize(deserializer)?;
        Hash::from_hex(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
