// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DynamicData container for runtime data manipulation.

use crate::dynamic::binary::{self, BinaryCodecError};
use crate::dynamic::object_type::elements;
use crate::dynamic::{print, DynamicValue, ObjectType, TypeDescriptor};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors for DynamicData operations.
#[derive(Debug, Error)]
pub enum DynamicDataError {
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid operation for type: {0}")]
    InvalidOperation(String),

    #[error("Index out of bounds: {index} >= {length}")]
    IndexOutOfBounds { index: usize, length: usize },
}

/// Dynamic data container with runtime type checking.
///
/// The held value always conforms to the descriptor.
#[derive(Debug, Clone)]
pub struct DynamicData {
    descriptor: Arc<TypeDescriptor>,
    value: DynamicValue,
}

impl DynamicData {
    /// Create new DynamicData with default values.
    pub fn new(descriptor: &Arc<TypeDescriptor>) -> Self {
        Self {
            descriptor: descriptor.clone(),
            value: descriptor.initialize(),
        }
    }

    /// Create from existing value (with validation).
    pub fn from_value(
        descriptor: &Arc<TypeDescriptor>,
        value: DynamicValue,
    ) -> Result<Self, DynamicDataError> {
        if !descriptor.conforms(&value) {
            return Err(DynamicDataError::TypeMismatch {
                expected: descriptor.name.clone(),
                got: value.label().to_string(),
            });
        }
        Ok(Self {
            descriptor: descriptor.clone(),
            value,
        })
    }

    /// Get the type descriptor.
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Get the type name.
    pub fn type_name(&self) -> &str {
        &self.descriptor.name
    }

    /// Get the underlying value.
    pub fn value(&self) -> &DynamicValue {
        &self.value
    }

    /// Into inner value.
    pub fn into_value(self) -> DynamicValue {
        self.value
    }

    fn index_of(&self, name: &str) -> Result<usize, DynamicDataError> {
        self.descriptor
            .field_index(name)
            .ok_or_else(|| DynamicDataError::FieldNotFound(name.to_string()))
    }

    /// Get a field value by name.
    pub fn get<T: FromDynamicValue>(&self, name: &str) -> Result<T, DynamicDataError> {
        T::from_dynamic(self.get_field(name)?)
    }

    /// Set a field value by name. The value must match the field's type and arity.
    pub fn set<T: IntoDynamicValue>(
        &mut self,
        name: &str,
        value: T,
    ) -> Result<(), DynamicDataError> {
        let index = self.index_of(name)?;
        let fields = self.descriptor.fields();
        let field = fields[index];
        let dyn_value = value.into_dynamic();

        let ok = elements(&dyn_value, field.array_size)
            .is_some_and(|items| items.iter().all(|i| field.type_desc.conforms(i)));
        if !ok {
            return Err(DynamicDataError::TypeMismatch {
                expected: field.type_desc.name.clone(),
                got: dyn_value.label().to_string(),
            });
        }

        match &mut self.value {
            DynamicValue::Struct(members) => {
                members[index] = dyn_value;
                Ok(())
            }
            _ => Err(DynamicDataError::InvalidOperation(
                "set requires struct type".into(),
            )),
        }
    }

    /// Get field by name.
    pub fn get_field(&self, name: &str) -> Result<&DynamicValue, DynamicDataError> {
        let index = self.index_of(name)?;
        match &self.value {
            DynamicValue::Struct(members) => members
                .get(index)
                .ok_or_else(|| DynamicDataError::FieldNotFound(name.to_string())),
            _ => Err(DynamicDataError::InvalidOperation(
                "get_field requires struct type".into(),
            )),
        }
    }

    /// Get one element of an array field.
    pub fn get_element(&self, name: &str, index: usize) -> Result<&DynamicValue, DynamicDataError> {
        match self.get_field(name)? {
            DynamicValue::Array(items) => items.get(index).ok_or(DynamicDataError::IndexOutOfBounds {
                index,
                length: items.len(),
            }),
            _ => Err(DynamicDataError::InvalidOperation(format!(
                "{} is not an array field",
                name
            ))),
        }
    }

    /// Iterate over (field name, value) pairs.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &DynamicValue)> {
        let members = self.value.as_struct().unwrap_or(&[]);
        self.descriptor
            .fields()
            .into_iter()
            .map(|f| f.name.as_str())
            .zip(members.iter())
    }

    /// Deep copy.
    pub fn copy(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            value: self.descriptor.copy(&self.value),
        }
    }

    /// `{"type":..,"value":[..]}` node for this value.
    pub fn to_json(&self) -> Option<Value> {
        self.descriptor.to_json(&self.value, 1)
    }

    /// Decode a `{"type":..,"value":[..]}` node.
    pub fn from_json(descriptor: &Arc<TypeDescriptor>, node: &Value) -> Option<Self> {
        let value = descriptor.from_json(node.as_object()?.get("value")?, 1)?;
        Some(Self {
            descriptor: descriptor.clone(),
            value,
        })
    }

    /// Packed binary encoding.
    pub fn encode(&self) -> Result<Vec<u8>, BinaryCodecError> {
        binary::encode_dynamic(self)
    }

    /// Decode from packed binary encoding.
    pub fn decode(
        descriptor: &Arc<TypeDescriptor>,
        bytes: &[u8],
    ) -> Result<Self, BinaryCodecError> {
        binary::decode_dynamic(bytes, descriptor)
    }
}

impl fmt::Display for DynamicData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print::to_string(&self.descriptor, &self.value))
    }
}

impl PartialEq for DynamicData {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.name == other.descriptor.name && self.value == other.value
    }
}

/// Trait for converting from DynamicValue.
pub trait FromDynamicValue: Sized {
    fn from_dynamic(value: &DynamicValue) -> Result<Self, DynamicDataError>;
}

/// Trait for converting to DynamicValue.
pub trait IntoDynamicValue {
    fn into_dynamic(self) -> DynamicValue;
}

impl<T: Into<DynamicValue>> IntoDynamicValue for T {
    fn into_dynamic(self) -> DynamicValue {
        self.into()
    }
}

macro_rules! impl_from_dynamic {
    ($ty:ty, $accessor:ident, $name:expr) => {
        impl FromDynamicValue for $ty {
            fn from_dynamic(value: &DynamicValue) -> Result<Self, DynamicDataError> {
                value.$accessor().ok_or_else(|| DynamicDataError::TypeMismatch {
                    expected: $name.to_string(),
                    got: value.label().to_string(),
                })
            }
        }
    };
}

impl_from_dynamic!(bool, as_bool, "bool");
impl_from_dynamic!(i16, as_i16, "short");
impl_from_dynamic!(i32, as_i32, "int");
impl_from_dynamic!(i64, as_i64, "long");
impl_from_dynamic!(u8, as_u8, "uchar");
impl_from_dynamic!(u16, as_u16, "ushort");
impl_from_dynamic!(u32, as_u32, "uint");
impl_from_dynamic!(u64, as_u64, "ulong");
impl_from_dynamic!(f32, as_f32, "float");
impl_from_dynamic!(f64, as_f64, "double");

impl FromDynamicValue for char {
    fn from_dynamic(value: &DynamicValue) -> Result<Self, DynamicDataError> {
        value
            .as_char()
            .map(char::from)
            .ok_or_else(|| DynamicDataError::TypeMismatch {
                expected: "char".to_string(),
                got: value.label().to_string(),
            })
    }
}

impl FromDynamicValue for String {
    fn from_dynamic(value: &DynamicValue) -> Result<Self, DynamicDataError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DynamicDataError::TypeMismatch {
                expected: "charptr".to_string(),
                got: value.label().to_string(),
            })
    }
}

impl<T: FromDynamicValue> FromDynamicValue for Vec<T> {
    fn from_dynamic(value: &DynamicValue) -> Result<Self, DynamicDataError> {
        match value {
            DynamicValue::Array(items) => items.iter().map(T::from_dynamic).collect(),
            other => Err(DynamicDataError::TypeMismatch {
                expected: "array".to_string(),
                got: other.label().to_string(),
            }),
        }
    }
}
