// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-type behaviour shared by primitive kinds and composite descriptors.
//!
//! One implementation covers every [`PrimitiveKind`]; [`TypeDescriptor`]
//! dispatches to it for leaves and recurses field by field for composites.
//! Destruction is ordinary `Drop` of the produced [`DynamicValue`].

use crate::dynamic::binary::{BinaryCodecError, BinaryDecoder, BinaryEncoder};
use crate::dynamic::{json, print, DynamicValue, FieldDescriptor, PrimitiveKind, TypeDescriptor, TypeKind};
use serde_json::Value;
use std::fmt;

/// Generic operations over a described type.
pub trait ObjectType {
    /// Name carried in the `"type"` member of JSON nodes.
    fn type_name(&self) -> &str;

    /// Default (zero) value.
    fn initialize(&self) -> DynamicValue;

    /// Independent deep copy.
    fn copy(&self, src: &DynamicValue) -> DynamicValue {
        src.clone()
    }

    /// Check that `value` has the shape this type describes.
    fn conforms(&self, value: &DynamicValue) -> bool;

    /// Append the packed encoding of `value`.
    fn encode(&self, value: &DynamicValue, out: &mut BinaryEncoder) -> Result<(), BinaryCodecError>;

    /// Read one value from the packed encoding.
    fn decode(&self, input: &mut BinaryDecoder<'_>) -> Result<DynamicValue, BinaryCodecError>;

    /// Human-readable rendering of one value.
    fn print(&self, value: &DynamicValue, out: &mut dyn fmt::Write) -> fmt::Result;

    /// Produce the `{"type":..,"value":[..]}` node for `array_size` elements.
    ///
    /// `value` is the element itself when `array_size` is 1, otherwise an
    /// `Array` holding exactly `array_size` elements. Returns `None` when
    /// `value` does not match the type.
    fn to_json(&self, value: &DynamicValue, array_size: usize) -> Option<Value>;

    /// Inverse of [`ObjectType::to_json`], given the node's `value` member.
    ///
    /// Returns `None` on any shape or kind mismatch; nothing is partially decoded.
    fn from_json(&self, value: &Value, array_size: usize) -> Option<DynamicValue>;
}

/// Split a field value into its elements according to the declared arity.
pub(crate) fn elements(value: &DynamicValue, array_size: usize) -> Option<Vec<&DynamicValue>> {
    if array_size <= 1 {
        return Some(vec![value]);
    }
    match value {
        DynamicValue::Array(items) if items.len() == array_size => Some(items.iter().collect()),
        _ => None,
    }
}

/// Rebuild a field value from decoded elements.
pub(crate) fn assemble(mut items: Vec<DynamicValue>, array_size: usize) -> Option<DynamicValue> {
    if items.len() != array_size.max(1) {
        return None;
    }
    if array_size <= 1 {
        items.pop()
    } else {
        Some(DynamicValue::Array(items))
    }
}

impl ObjectType for PrimitiveKind {
    fn type_name(&self) -> &str {
        self.name()
    }

    fn initialize(&self) -> DynamicValue {
        match self {
            Self::Bool => DynamicValue::Bool(false),
            Self::Char => DynamicValue::Char(0),
            Self::Short => DynamicValue::Short(0),
            Self::Int => DynamicValue::Int(0),
            Self::Long => DynamicValue::Long(0),
            Self::LongLong => DynamicValue::LongLong(0),
            Self::UChar => DynamicValue::UChar(0),
            Self::UShort => DynamicValue::UShort(0),
            Self::UInt => DynamicValue::UInt(0),
            Self::ULong => DynamicValue::ULong(0),
            Self::ULongLong => DynamicValue::ULongLong(0),
            Self::Float => DynamicValue::Float(0.0),
            Self::Double => DynamicValue::Double(0.0),
            Self::LongDouble => DynamicValue::LongDouble(0.0),
            Self::Ptr => DynamicValue::Ptr(0),
            Self::CharPtr => DynamicValue::CharPtr(String::new()),
        }
    }

    fn conforms(&self, value: &DynamicValue) -> bool {
        matches!(
            (self, value),
            (Self::Bool, DynamicValue::Bool(_))
                | (Self::Char, DynamicValue::Char(_))
                | (Self::Short, DynamicValue::Short(_))
                | (Self::Int, DynamicValue::Int(_))
                | (Self::Long, DynamicValue::Long(_))
                | (Self::LongLong, DynamicValue::LongLong(_))
                | (Self::UChar, DynamicValue::UChar(_))
                | (Self::UShort, DynamicValue::UShort(_))
                | (Self::UInt, DynamicValue::UInt(_))
                | (Self::ULong, DynamicValue::ULong(_))
                | (Self::ULongLong, DynamicValue::ULongLong(_))
                | (Self::Float, DynamicValue::Float(_))
                | (Self::Double, DynamicValue::Double(_))
                | (Self::LongDouble, DynamicValue::LongDouble(_))
                | (Self::Ptr, DynamicValue::Ptr(_))
                | (Self::CharPtr, DynamicValue::CharPtr(_))
        )
    }

    fn encode(&self, value: &DynamicValue, out: &mut BinaryEncoder) -> Result<(), BinaryCodecError> {
        out.write_primitive(value, *self)
    }

    fn decode(&self, input: &mut BinaryDecoder<'_>) -> Result<DynamicValue, BinaryCodecError> {
        input.read_primitive(*self)
    }

    fn print(&self, value: &DynamicValue, out: &mut dyn fmt::Write) -> fmt::Result {
        print::primitive(*self, value, out)
    }

    fn to_json(&self, value: &DynamicValue, array_size: usize) -> Option<Value> {
        let items = elements(value, array_size)?
            .into_iter()
            .map(|v| json::primitive_to_json(*self, v))
            .collect::<Option<Vec<_>>>()?;
        Some(json::node(self.name(), items))
    }

    fn from_json(&self, value: &Value, array_size: usize) -> Option<DynamicValue> {
        let items = value
            .as_array()?
            .iter()
            .map(|v| json::primitive_from_json(*self, v))
            .collect::<Option<Vec<_>>>()?;
        assemble(items, array_size)
    }
}

impl TypeDescriptor {
    fn encode_field(
        field: &FieldDescriptor,
        value: &DynamicValue,
        out: &mut BinaryEncoder,
    ) -> Result<(), BinaryCodecError> {
        let items = elements(value, field.array_size).ok_or_else(|| {
            BinaryCodecError::InvalidData(format!(
                "field {} expects {} elements",
                field.name, field.array_size
            ))
        })?;
        for item in items {
            field.type_desc.encode(item, out)?;
        }
        Ok(())
    }

    fn decode_field(
        field: &FieldDescriptor,
        input: &mut BinaryDecoder<'_>,
    ) -> Result<DynamicValue, BinaryCodecError> {
        let mut items = Vec::with_capacity(field.array_size);
        for _ in 0..field.array_size {
            items.push(field.type_desc.decode(input)?);
        }
        assemble(items, field.array_size)
            .ok_or_else(|| BinaryCodecError::InvalidData(format!("field {}", field.name)))
    }

    /// Decode one composite element: an array of per-field `{type,value}` nodes.
    fn struct_element_from_json(&self, element: &Value) -> Option<DynamicValue> {
        let nodes = element.as_array()?;
        let fields = self.fields();
        if nodes.len() != fields.len() {
            return None;
        }
        let mut members = Vec::with_capacity(fields.len());
        for (field, node) in fields.iter().zip(nodes) {
            let inner = node.as_object()?.get("value")?;
            members.push(field.type_desc.from_json(inner, field.array_size)?);
        }
        Some(DynamicValue::Struct(members))
    }

    fn struct_element_to_json(&self, element: &DynamicValue) -> Option<Value> {
        let members = element.as_struct()?;
        let fields = self.fields();
        if members.len() != fields.len() {
            return None;
        }
        let nodes = fields
            .iter()
            .zip(members)
            .map(|(field, member)| field.type_desc.to_json(member, field.array_size))
            .collect::<Option<Vec<_>>>()?;
        Some(Value::Array(nodes))
    }
}

impl ObjectType for TypeDescriptor {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn initialize(&self) -> DynamicValue {
        match &self.kind {
            TypeKind::Primitive(p) => p.initialize(),
            TypeKind::Struct(_) => DynamicValue::Struct(
                self.fields()
                    .iter()
                    .map(|f| {
                        let elem = f.type_desc.initialize();
                        if f.is_array() {
                            DynamicValue::Array(vec![elem; f.array_size])
                        } else {
                            elem
                        }
                    })
                    .collect(),
            ),
        }
    }

    fn conforms(&self, value: &DynamicValue) -> bool {
        match &self.kind {
            TypeKind::Primitive(p) => p.conforms(value),
            TypeKind::Struct(_) => {
                let Some(members) = value.as_struct() else {
                    return false;
                };
                let fields = self.fields();
                members.len() == fields.len()
                    && fields.iter().zip(members).all(|(f, m)| {
                        elements(m, f.array_size)
                            .is_some_and(|items| items.iter().all(|i| f.type_desc.conforms(i)))
                    })
            }
        }
    }

    fn encode(&self, value: &DynamicValue, out: &mut BinaryEncoder) -> Result<(), BinaryCodecError> {
        match &self.kind {
            TypeKind::Primitive(p) => p.encode(value, out),
            TypeKind::Struct(_) => {
                let members = value.as_struct().ok_or_else(|| BinaryCodecError::TypeMismatch {
                    expected: self.name.clone(),
                    found: value.label().to_string(),
                })?;
                let fields = self.fields();
                if members.len() != fields.len() {
                    return Err(BinaryCodecError::InvalidData(format!(
                        "{} has {} fields, value has {}",
                        self.name,
                        fields.len(),
                        members.len()
                    )));
                }
                for (field, member) in fields.iter().zip(members) {
                    Self::encode_field(field, member, out)?;
                }
                Ok(())
            }
        }
    }

    fn decode(&self, input: &mut BinaryDecoder<'_>) -> Result<DynamicValue, BinaryCodecError> {
        match &self.kind {
            TypeKind::Primitive(p) => p.decode(input),
            TypeKind::Struct(_) => {
                let fields = self.fields();
                let mut members = Vec::with_capacity(fields.len());
                for field in fields {
                    members.push(Self::decode_field(field, input)?);
                }
                Ok(DynamicValue::Struct(members))
            }
        }
    }

    fn print(&self, value: &DynamicValue, out: &mut dyn fmt::Write) -> fmt::Result {
        match &self.kind {
            TypeKind::Primitive(p) => p.print(value, out),
            TypeKind::Struct(_) => print::composite(self, value, out),
        }
    }

    fn to_json(&self, value: &DynamicValue, array_size: usize) -> Option<Value> {
        match &self.kind {
            TypeKind::Primitive(p) => {
                let node = p.to_json(value, array_size)?;
                Some(json::rename_node(node, &self.name))
            }
            TypeKind::Struct(_) => {
                let items = elements(value, array_size)?
                    .into_iter()
                    .map(|v| self.struct_element_to_json(v))
                    .collect::<Option<Vec<_>>>()?;
                Some(json::node(&self.name, items))
            }
        }
    }

    fn from_json(&self, value: &Value, array_size: usize) -> Option<DynamicValue> {
        match &self.kind {
            TypeKind::Primitive(p) => p.from_json(value, array_size),
            TypeKind::Struct(_) => {
                let items = value
                    .as_array()?
                    .iter()
                    .map(|element| self.struct_element_from_json(element))
                    .collect::<Option<Vec<_>>>()?;
                assemble(items, array_size)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::TypeDescriptorBuilder;
    use std::sync::Arc;

    fn point() -> Arc<TypeDescriptor> {
        Arc::new(
            TypeDescriptorBuilder::new("Point")
                .field("x", PrimitiveKind::Int)
                .field("y", PrimitiveKind::Int)
                .build(),
        )
    }

    #[test]
    fn test_initialize_zero_fills() {
        let desc = TypeDescriptorBuilder::new("Mixed")
            .field("flag", PrimitiveKind::Bool)
            .array_field("raw", PrimitiveKind::UChar, 2)
            .string_field("label")
            .build();
        assert_eq!(
            desc.initialize(),
            DynamicValue::Struct(vec![
                DynamicValue::Bool(false),
                DynamicValue::Array(vec![DynamicValue::UChar(0), DynamicValue::UChar(0)]),
                DynamicValue::CharPtr(String::new()),
            ])
        );
    }

    #[test]
    fn test_copy_is_independent() {
        let kind = PrimitiveKind::CharPtr;
        let src = DynamicValue::from("hello");
        let mut dst = kind.copy(&src);
        if let DynamicValue::CharPtr(s) = &mut dst {
            s.push('!');
        }
        assert_eq!(src.as_str(), Some("hello"));
        assert_eq!(dst.as_str(), Some("hello!"));
    }

    #[test]
    fn test_conforms_checks_arity() {
        let desc = TypeDescriptorBuilder::new("Samples")
            .array_field("values", PrimitiveKind::Int, 2)
            .build();
        let good = DynamicValue::Struct(vec![DynamicValue::from(vec![1i32, 2])]);
        let short = DynamicValue::Struct(vec![DynamicValue::from(vec![1i32])]);
        let scalar = DynamicValue::Struct(vec![DynamicValue::Int(1)]);
        assert!(desc.conforms(&good));
        assert!(!desc.conforms(&short));
        assert!(!desc.conforms(&scalar));
    }

    #[test]
    fn test_primitive_json_node() {
        let node = PrimitiveKind::Int.to_json(&DynamicValue::Int(42), 1).expect("json");
        assert_eq!(node, serde_json::json!({"type": "int", "value": [42]}));

        let arr = DynamicValue::from(vec![1i32, 2, 3]);
        let node = PrimitiveKind::Int.to_json(&arr, 3).expect("json");
        assert_eq!(node, serde_json::json!({"type": "int", "value": [1, 2, 3]}));
        assert_eq!(PrimitiveKind::Int.from_json(&node["value"], 3), Some(arr));
    }

    #[test]
    fn test_composite_json_node() {
        let desc = point();
        let value = DynamicValue::Struct(vec![DynamicValue::Int(3), DynamicValue::Int(-4)]);
        let node = desc.to_json(&value, 1).expect("json");
        assert_eq!(
            node,
            serde_json::json!({
                "type": "Point",
                "value": [[
                    {"type": "int", "value": [3]},
                    {"type": "int", "value": [-4]}
                ]]
            })
        );
        assert_eq!(desc.from_json(&node["value"], 1), Some(value));
    }

    #[test]
    fn test_composite_from_json_field_count_mismatch() {
        let desc = point();
        let value = serde_json::json!([[{"type": "int", "value": [3]}]]);
        assert_eq!(desc.from_json(&value, 1), None);
    }

    #[test]
    fn test_from_json_rejects_non_array() {
        assert_eq!(PrimitiveKind::Bool.from_json(&serde_json::json!(true), 1), None);
        assert_eq!(point().from_json(&serde_json::json!({"x": 1}), 1), None);
    }

    #[test]
    fn test_from_json_rejects_wrong_kind() {
        assert_eq!(PrimitiveKind::Bool.from_json(&serde_json::json!([1]), 1), None);
        assert_eq!(PrimitiveKind::Int.from_json(&serde_json::json!([1.5]), 1), None);
        assert_eq!(PrimitiveKind::Double.from_json(&serde_json::json!([1]), 1), None);
    }

    #[test]
    fn test_to_json_rejects_mismatched_value() {
        assert_eq!(PrimitiveKind::Int.to_json(&DynamicValue::Bool(true), 1), None);
        assert_eq!(point().to_json(&DynamicValue::Int(1), 1), None);
    }
}
