// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Packed binary encoding/decoding for DynamicData.
//!
//! Layout is little-endian with no padding: fields are written in
//! declaration order (inherited fields first), array elements back to back.
//! `charptr` is a `u32` byte length followed by UTF-8 bytes, `longdouble`
//! travels as an `f64`, `ptr` as a `u64`.

use crate::dynamic::{DynamicData, DynamicValue, ObjectType, PrimitiveKind, TypeDescriptor};
use std::sync::Arc;
use thiserror::Error;

/// Errors for binary codec operations.
#[derive(Debug, Error)]
pub enum BinaryCodecError {
    #[error("Buffer too small: need {need} bytes, have {have}")]
    BufferTooSmall { need: usize, have: usize },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
}

/// Encode DynamicData to packed bytes.
pub fn encode_dynamic(data: &DynamicData) -> Result<Vec<u8>, BinaryCodecError> {
    let mut encoder = BinaryEncoder::new();
    data.descriptor().encode(data.value(), &mut encoder)?;
    Ok(encoder.into_bytes())
}

/// Decode packed bytes to DynamicData.
pub fn decode_dynamic(
    bytes: &[u8],
    descriptor: &Arc<TypeDescriptor>,
) -> Result<DynamicData, BinaryCodecError> {
    let mut decoder = BinaryDecoder::new(bytes);
    let value = descriptor.decode(&mut decoder)?;
    if decoder.remaining() != 0 {
        return Err(BinaryCodecError::InvalidData(format!(
            "{} trailing bytes after {}",
            decoder.remaining(),
            descriptor.name
        )));
    }
    DynamicData::from_value(descriptor, value)
        .map_err(|e| BinaryCodecError::InvalidData(e.to_string()))
}

/// Packed encoder.
#[derive(Debug, Default)]
pub struct BinaryEncoder {
    buffer: Vec<u8>,
}

impl BinaryEncoder {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append one primitive element.
    pub fn write_primitive(
        &mut self,
        value: &DynamicValue,
        kind: PrimitiveKind,
    ) -> Result<(), BinaryCodecError> {
        match (value, kind) {
            (DynamicValue::Bool(v), PrimitiveKind::Bool) => self.buffer.push(u8::from(*v)),
            (DynamicValue::Char(v), PrimitiveKind::Char) => self.buffer.push(*v),
            (DynamicValue::UChar(v), PrimitiveKind::UChar) => self.buffer.push(*v),
            (DynamicValue::Short(v), PrimitiveKind::Short) => self.buffer.extend(v.to_le_bytes()),
            (DynamicValue::UShort(v), PrimitiveKind::UShort) => {
                self.buffer.extend(v.to_le_bytes())
            }
            (DynamicValue::Int(v), PrimitiveKind::Int) => self.buffer.extend(v.to_le_bytes()),
            (DynamicValue::UInt(v), PrimitiveKind::UInt) => self.buffer.extend(v.to_le_bytes()),
            (DynamicValue::Long(v), PrimitiveKind::Long)
            | (DynamicValue::LongLong(v), PrimitiveKind::LongLong) => {
                self.buffer.extend(v.to_le_bytes())
            }
            (DynamicValue::ULong(v), PrimitiveKind::ULong)
            | (DynamicValue::ULongLong(v), PrimitiveKind::ULongLong)
            | (DynamicValue::Ptr(v), PrimitiveKind::Ptr) => self.buffer.extend(v.to_le_bytes()),
            (DynamicValue::Float(v), PrimitiveKind::Float) => self.buffer.extend(v.to_le_bytes()),
            (DynamicValue::Double(v), PrimitiveKind::Double)
            | (DynamicValue::LongDouble(v), PrimitiveKind::LongDouble) => {
                self.buffer.extend(v.to_le_bytes())
            }
            (DynamicValue::CharPtr(s), PrimitiveKind::CharPtr) => {
                let bytes = s.as_bytes();
                let len = u32::try_from(bytes.len()).map_err(|_| {
                    BinaryCodecError::InvalidData(format!("string too long: {}", bytes.len()))
                })?;
                self.buffer.extend(len.to_le_bytes());
                self.buffer.extend(bytes);
            }
            _ => {
                return Err(BinaryCodecError::TypeMismatch {
                    expected: kind.name().to_string(),
                    found: value.label().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Packed decoder over a borrowed buffer.
#[derive(Debug)]
pub struct BinaryDecoder<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> BinaryDecoder<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], BinaryCodecError> {
        if self.remaining() < count {
            return Err(BinaryCodecError::BufferTooSmall {
                need: count,
                have: self.remaining(),
            });
        }
        let slice = &self.buffer[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], BinaryCodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read one primitive element.
    pub fn read_primitive(&mut self, kind: PrimitiveKind) -> Result<DynamicValue, BinaryCodecError> {
        let value = match kind {
            PrimitiveKind::Bool => DynamicValue::Bool(self.read_array::<1>()?[0] != 0),
            PrimitiveKind::Char => DynamicValue::Char(self.read_array::<1>()?[0]),
            PrimitiveKind::UChar => DynamicValue::UChar(self.read_array::<1>()?[0]),
            PrimitiveKind::Short => DynamicValue::Short(i16::from_le_bytes(self.read_array()?)),
            PrimitiveKind::UShort => DynamicValue::UShort(u16::from_le_bytes(self.read_array()?)),
            PrimitiveKind::Int => DynamicValue::Int(i32::from_le_bytes(self.read_array()?)),
            PrimitiveKind::UInt => DynamicValue::UInt(u32::from_le_bytes(self.read_array()?)),
            PrimitiveKind::Long => DynamicValue::Long(i64::from_le_bytes(self.read_array()?)),
            PrimitiveKind::LongLong => {
                DynamicValue::LongLong(i64::from_le_bytes(self.read_array()?))
            }
            PrimitiveKind::ULong => DynamicValue::ULong(u64::from_le_bytes(self.read_array()?)),
            PrimitiveKind::ULongLong => {
                DynamicValue::ULongLong(u64::from_le_bytes(self.read_array()?))
            }
            PrimitiveKind::Ptr => DynamicValue::Ptr(u64::from_le_bytes(self.read_array()?)),
            PrimitiveKind::Float => DynamicValue::Float(f32::from_le_bytes(self.read_array()?)),
            PrimitiveKind::Double => DynamicValue::Double(f64::from_le_bytes(self.read_array()?)),
            PrimitiveKind::LongDouble => {
                DynamicValue::LongDouble(f64::from_le_bytes(self.read_array()?))
            }
            PrimitiveKind::CharPtr => {
                let len = u32::from_le_bytes(self.read_array()?) as usize;
                let bytes = self.read_bytes(len)?;
                DynamicValue::CharPtr(String::from_utf8(bytes.to_vec())?)
            }
        };
        Ok(value)
    }
}
