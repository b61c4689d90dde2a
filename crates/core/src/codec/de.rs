// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serde deserializer for the binary format.

use super::{
    CodecError, TAG_ARRAY, TAG_BYTES, TAG_FALSE, TAG_FLOAT, TAG_INT, TAG_NULL, TAG_STRING,
    TAG_STRUCT, TAG_TRUE,
};
use serde::de::{self, DeserializeSeed, Visitor};
use serde::forward_to_deserialize_any;

/// Streaming decoder over a headerless byte slice.
pub struct Deserializer<'de> {
    input: &'de [u8],
}

impl<'de> Deserializer<'de> {
    pub fn new(input: &'de [u8]) -> Self {
        Self { input }
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    fn peek(&self) -> Result<u8, CodecError> {
        self.input.first().copied().ok_or(CodecError::UnexpectedEof)
    }

    fn take_byte(&mut self) -> Result<u8, CodecError> {
        let byte = self.peek()?;
        self.input = &self.input[1..];
        Ok(byte)
    }

    fn take(&mut self, n: usize) -> Result<&'de [u8], CodecError> {
        if self.input.len() < n {
            return Err(CodecError::UnexpectedEof);
        }
        let (head, rest) = self.input.split_at(n);
        self.input = rest;
        Ok(head)
    }

    fn take_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.take(4)?;
        // take() guarantees exactly 4 bytes
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(buf))
    }

    fn take_i64(&mut self) -> Result<i64, CodecError> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(buf))
    }

    fn take_f64(&mut self) -> Result<f64, CodecError> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(buf))
    }

    /// Read a string body (after its tag has been consumed).
    fn take_str_body(&mut self) -> Result<&'de str, CodecError> {
        let len = self.take_u32()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    fn take_bytes_body(&mut self) -> Result<&'de [u8], CodecError> {
        let len = self.take_u32()? as usize;
        self.take(len)
    }
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'de> {
    type Error = CodecError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.take_byte()? {
            TAG_NULL => visitor.visit_unit(),
            TAG_FALSE => visitor.visit_bool(false),
            TAG_TRUE => visitor.visit_bool(true),
            TAG_INT => visitor.visit_i64(self.take_i64()?),
            TAG_FLOAT => visitor.visit_f64(self.take_f64()?),
            TAG_STRING => visitor.visit_borrowed_str(self.take_str_body()?),
            TAG_BYTES => visitor.visit_borrowed_bytes(self.take_bytes_body()?),
            TAG_ARRAY => {
                let count = self.take_u32()?;
                visitor.visit_seq(SeqRef { de: self, remaining: count })
            }
            TAG_STRUCT => {
                let count = self.take_u32()?;
                visitor.visit_map(MapRef { de: self, remaining: count })
            }
            other => Err(CodecError::UnknownTag(other)),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        if self.peek()? == TAG_NULL {
            self.take_byte()?;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        visitor.visit_enum(EnumRef { de: self })
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }

    fn is_human_readable(&self) -> bool {
        true
    }
}

struct SeqRef<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    remaining: u32,
}

impl<'de> de::SeqAccess<'de> for SeqRef<'_, 'de> {
    type Error = CodecError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, CodecError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining as usize)
    }
}

struct MapRef<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    remaining: u32,
}

impl<'de> de::MapAccess<'de> for MapRef<'_, 'de> {
    type Error = CodecError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, CodecError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        if self.de.peek()? != TAG_STRING {
            return Err(CodecError::KeyNotString);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, CodecError> {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining as usize)
    }
}

/// Enum access: a bare string is a unit variant; a single-entry struct is a
/// data-carrying variant keyed by its name.
struct EnumRef<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'de, 'a> de::EnumAccess<'de> for EnumRef<'a, 'de> {
    type Error = CodecError;
    type Variant = VariantRef<'a, 'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), CodecError> {
        match self.de.peek()? {
            TAG_STRING => {
                let value = seed.deserialize(&mut *self.de)?;
                Ok((value, VariantRef { de: self.de, has_content: false }))
            }
            TAG_STRUCT => {
                self.de.take_byte()?;
                let count = self.de.take_u32()?;
                if count != 1 {
                    return Err(CodecError::Message(format!(
                        "enum value must be a single-entry struct, got {count} entries"
                    )));
                }
                let value = seed.deserialize(&mut *self.de)?;
                Ok((value, VariantRef { de: self.de, has_content: true }))
            }
            other => Err(CodecError::UnknownTag(other)),
        }
    }
}

struct VariantRef<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    has_content: bool,
}

impl<'de> de::VariantAccess<'de> for VariantRef<'_, 'de> {
    type Error = CodecError;

    fn unit_variant(self) -> Result<(), CodecError> {
        if self.has_content {
            // Tolerate an explicit null payload on a unit variant
            if self.de.take_byte()? != TAG_NULL {
                return Err(CodecError::Message("unit variant carries data".to_string()));
            }
        }
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, CodecError> {
        if !self.has_content {
            return Err(CodecError::Message("variant is missing its content".to_string()));
        }
        seed.deserialize(self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, CodecError> {
        if !self.has_content {
            return Err(CodecError::Message("variant is missing its content".to_string()));
        }
        de::Deserializer::deserialize_any(self.de, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        if !self.has_content {
            return Err(CodecError::Message("variant is missing its content".to_string()));
        }
        de::Deserializer::deserialize_any(self.de, visitor)
    }
}
