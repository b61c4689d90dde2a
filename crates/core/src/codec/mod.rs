// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The structured binary format (`.beast2`).
//!
//! A self-describing, self-delimiting encoding: every value is prefixed by a
//! one-byte tag, so a reader can recover both the type descriptor and the
//! decoded value from the bytes alone. Top-level blobs carry a three-byte
//! header (`B2` + version). Lengths and counts are little-endian `u32`;
//! integers are little-endian `i64`; floats are little-endian `f64`.
//!
//! Serde mapping: structs and maps encode as tagged structs (string key +
//! value per entry), sequences as arrays, unit enum variants as strings, and
//! data-carrying enum variants as single-entry structs keyed by the variant
//! name. `None` and unit encode as null. Map keys must be strings. Unknown
//! tags are rejected on decode.

mod de;
mod ser;
mod value;

pub use de::Deserializer;
pub use ser::Serializer;
pub use value::{Value, ValueType};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Header prefix on every top-level blob: magic + format version.
pub const MAGIC: [u8; 3] = [b'B', b'2', 0x01];

pub(crate) const TAG_NULL: u8 = 0x00;
pub(crate) const TAG_FALSE: u8 = 0x01;
pub(crate) const TAG_TRUE: u8 = 0x02;
pub(crate) const TAG_INT: u8 = 0x03;
pub(crate) const TAG_FLOAT: u8 = 0x04;
pub(crate) const TAG_STRING: u8 = 0x05;
pub(crate) const TAG_BYTES: u8 = 0x06;
pub(crate) const TAG_ARRAY: u8 = 0x07;
pub(crate) const TAG_STRUCT: u8 = 0x08;

/// Errors from encoding or decoding the binary format
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("missing or wrong format header")]
    BadMagic,
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error("unknown tag byte 0x{0:02x}")]
    UnknownTag(u8),
    #[error("map keys must be strings")]
    KeyNotString,
    #[error("integer {0} does not fit the signed 64-bit wire type")]
    IntOutOfRange(u64),
    #[error("invalid utf-8 in string")]
    InvalidUtf8,
    #[error("{0}")]
    Message(String),
}

impl serde::ser::Error for CodecError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        CodecError::Message(msg.to_string())
    }
}

impl serde::de::Error for CodecError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        CodecError::Message(msg.to_string())
    }
}

/// Encode a value to a headered blob.
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut serializer = Serializer::with_header();
    value.serialize(&mut serializer)?;
    Ok(serializer.into_bytes())
}

/// Decode a headered blob into a typed value.
///
/// Fails on a missing header, an unknown tag, or trailing bytes.
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let body = strip_header(bytes)?;
    let mut deserializer = Deserializer::new(body);
    let value = T::deserialize(&mut deserializer)?;
    let remaining = deserializer.remaining();
    if remaining > 0 {
        return Err(CodecError::TrailingBytes(remaining));
    }
    Ok(value)
}

/// Decode a headered blob into the dynamic [`Value`] model.
///
/// This is how readers with no schema obtain `{type, value}`: the type
/// descriptor is [`Value::value_type`] of the result.
pub fn decode_value(bytes: &[u8]) -> Result<Value, CodecError> {
    from_slice(bytes)
}

/// True if the blob starts with the format header.
pub fn has_header(bytes: &[u8]) -> bool {
    bytes.len() >= MAGIC.len() && bytes[..MAGIC.len()] == MAGIC
}

fn strip_header(bytes: &[u8]) -> Result<&[u8], CodecError> {
    if !has_header(bytes) {
        return Err(CodecError::BadMagic);
    }
    Ok(&bytes[MAGIC.len()..])
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
