// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serde serializer for the binary format.

use super::{
    CodecError, MAGIC, TAG_ARRAY, TAG_BYTES, TAG_FALSE, TAG_FLOAT, TAG_INT, TAG_NULL, TAG_STRING,
    TAG_STRUCT, TAG_TRUE,
};
use serde::ser::{self, Serialize};

/// Streaming encoder writing tag-prefixed values into a byte buffer.
pub struct Serializer {
    out: Vec<u8>,
}

impl Serializer {
    /// A serializer that emits the blob header first.
    pub fn with_header() -> Self {
        Self { out: MAGIC.to_vec() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    fn put_str(&mut self, s: &str) -> Result<(), CodecError> {
        self.out.push(TAG_STRING);
        self.put_len(s.len())?;
        self.out.extend_from_slice(s.as_bytes());
        Ok(())
    }

    fn put_len(&mut self, len: usize) -> Result<(), CodecError> {
        let len = u32::try_from(len).map_err(|_| CodecError::IntOutOfRange(len as u64))?;
        self.out.extend_from_slice(&len.to_le_bytes());
        Ok(())
    }

    /// Open a counted container, returning the position of the count word
    /// to patch once the element count is known.
    fn begin_counted(&mut self, tag: u8) -> usize {
        self.out.push(tag);
        let pos = self.out.len();
        self.out.extend_from_slice(&0u32.to_le_bytes());
        pos
    }

    fn patch_count(&mut self, pos: usize, count: u32) {
        self.out[pos..pos + 4].copy_from_slice(&count.to_le_bytes());
    }

    /// Open a single-entry struct keyed by an enum variant name.
    fn begin_variant(&mut self, variant: &str) -> Result<(), CodecError> {
        self.out.push(TAG_STRUCT);
        self.out.extend_from_slice(&1u32.to_le_bytes());
        self.put_str(variant)
    }
}

impl<'a> ser::Serializer for &'a mut Serializer {
    type Ok = ();
    type Error = CodecError;
    type SerializeSeq = Compound<'a>;
    type SerializeTuple = Compound<'a>;
    type SerializeTupleStruct = Compound<'a>;
    type SerializeTupleVariant = Compound<'a>;
    type SerializeMap = Compound<'a>;
    type SerializeStruct = Compound<'a>;
    type SerializeStructVariant = Compound<'a>;

    fn serialize_bool(self, v: bool) -> Result<(), CodecError> {
        self.out.push(if v { TAG_TRUE } else { TAG_FALSE });
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<(), CodecError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<(), CodecError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<(), CodecError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<(), CodecError> {
        self.out.push(TAG_INT);
        self.out.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<(), CodecError> {
        self.serialize_i64(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<(), CodecError> {
        self.serialize_i64(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<(), CodecError> {
        self.serialize_i64(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<(), CodecError> {
        let v = i64::try_from(v).map_err(|_| CodecError::IntOutOfRange(v))?;
        self.serialize_i64(v)
    }

    fn serialize_f32(self, v: f32) -> Result<(), CodecError> {
        self.serialize_f64(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<(), CodecError> {
        self.out.push(TAG_FLOAT);
        self.out.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn serialize_char(self, v: char) -> Result<(), CodecError> {
        self.put_str(v.encode_utf8(&mut [0u8; 4]))
    }

    fn serialize_str(self, v: &str) -> Result<(), CodecError> {
        self.put_str(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<(), CodecError> {
        self.out.push(TAG_BYTES);
        self.put_len(v.len())?;
        self.out.extend_from_slice(v);
        Ok(())
    }

    fn serialize_none(self) -> Result<(), CodecError> {
        self.serialize_unit()
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), CodecError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), CodecError> {
        self.out.push(TAG_NULL);
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), CodecError> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<(), CodecError> {
        self.put_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        self.begin_variant(variant)?;
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Compound<'a>, CodecError> {
        let count_pos = self.begin_counted(TAG_ARRAY);
        Ok(Compound { ser: self, count_pos, count: 0 })
    }

    fn serialize_tuple(self, len: usize) -> Result<Compound<'a>, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Compound<'a>, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Compound<'a>, CodecError> {
        self.begin_variant(variant)?;
        self.serialize_seq(Some(len))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Compound<'a>, CodecError> {
        let count_pos = self.begin_counted(TAG_STRUCT);
        Ok(Compound { ser: self, count_pos, count: 0 })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Compound<'a>, CodecError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Compound<'a>, CodecError> {
        self.begin_variant(variant)?;
        self.serialize_map(Some(len))
    }

    fn is_human_readable(&self) -> bool {
        true
    }
}

/// In-progress container; patches its element count on `end`.
pub struct Compound<'a> {
    ser: &'a mut Serializer,
    count_pos: usize,
    count: u32,
}

impl Compound<'_> {
    fn bump(&mut self) -> Result<(), CodecError> {
        self.count = self
            .count
            .checked_add(1)
            .ok_or(CodecError::IntOutOfRange(u64::from(u32::MAX) + 1))?;
        Ok(())
    }

    fn finish(self) -> Result<(), CodecError> {
        self.ser.patch_count(self.count_pos, self.count);
        Ok(())
    }
}

impl ser::SerializeSeq for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        value.serialize(&mut *self.ser)?;
        self.bump()
    }

    fn end(self) -> Result<(), CodecError> {
        self.finish()
    }
}

impl ser::SerializeTuple for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), CodecError> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), CodecError> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), CodecError> {
        self.finish()
    }
}

impl ser::SerializeMap for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), CodecError> {
        key.serialize(KeySerializer { ser: &mut *self.ser })?;
        self.bump()
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), CodecError> {
        self.finish()
    }
}

impl ser::SerializeStruct for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        self.ser.put_str(key)?;
        value.serialize(&mut *self.ser)?;
        self.bump()
    }

    fn end(self) -> Result<(), CodecError> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        ser::SerializeStruct::serialize_field(self, key, value)
    }

    fn end(self) -> Result<(), CodecError> {
        self.finish()
    }
}

/// Serializer accepting only strings, used for map keys.
struct KeySerializer<'a> {
    ser: &'a mut Serializer,
}

impl ser::Serializer for KeySerializer<'_> {
    type Ok = ();
    type Error = CodecError;
    type SerializeSeq = ser::Impossible<(), CodecError>;
    type SerializeTuple = ser::Impossible<(), CodecError>;
    type SerializeTupleStruct = ser::Impossible<(), CodecError>;
    type SerializeTupleVariant = ser::Impossible<(), CodecError>;
    type SerializeMap = ser::Impossible<(), CodecError>;
    type SerializeStruct = ser::Impossible<(), CodecError>;
    type SerializeStructVariant = ser::Impossible<(), CodecError>;

    fn serialize_str(self, v: &str) -> Result<(), CodecError> {
        self.ser.put_str(v)
    }

    fn serialize_char(self, v: char) -> Result<(), CodecError> {
        self.ser.put_str(v.encode_utf8(&mut [0u8; 4]))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<(), CodecError> {
        self.ser.put_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_i8(self, _v: i8) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_i16(self, _v: i16) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_i32(self, _v: i32) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_i64(self, _v: i64) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_u8(self, _v: u8) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_u16(self, _v: u16) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_u32(self, _v: u32) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_u64(self, _v: u64) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_f32(self, _v: f32) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_f64(self, _v: f64) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_none(self) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_unit(self) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, CodecError> {
        Err(CodecError::KeyNotString)
    }

    fn is_human_readable(&self) -> bool {
        true
    }
}
