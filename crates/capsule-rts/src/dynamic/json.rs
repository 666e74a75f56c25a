// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON mapping of primitive values.
//!
//! | kind | JSON |
//! |------|------|
//! | `bool` | boolean |
//! | `char` | one-character string |
//! | `short`, `int` | integer within the signed range |
//! | `long`, `longlong` | 64-bit signed integer |
//! | `uchar`, `ushort`, `uint`, `ulong`, `ulonglong` | unsigned integer within range |
//! | `float`, `double`, `longdouble` | floating-point number |
//! | `ptr` | unsigned integer |
//! | `charptr` | string |
//!
//! Decoding never coerces: `1` is not a `double`, `1.0` is not an `int`.

use crate::dynamic::{DynamicValue, PrimitiveKind};
use serde_json::{Map, Number, Value};

/// Build a `{"type": .., "value": [..]}` node.
pub(crate) fn node(type_name: &str, values: Vec<Value>) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), Value::String(type_name.to_string()));
    obj.insert("value".into(), Value::Array(values));
    Value::Object(obj)
}

/// Replace the `"type"` member of a node.
pub(crate) fn rename_node(mut node: Value, type_name: &str) -> Value {
    if let Some(obj) = node.as_object_mut() {
        obj.insert("type".into(), Value::String(type_name.to_string()));
    }
    node
}

fn float(v: f64) -> Option<Value> {
    Number::from_f64(v).map(Value::Number)
}

/// Encode one primitive element. `None` if `value` is not of `kind`
/// or is a non-finite float.
pub fn primitive_to_json(kind: PrimitiveKind, value: &DynamicValue) -> Option<Value> {
    let json = match (kind, value) {
        (PrimitiveKind::Bool, DynamicValue::Bool(v)) => Value::Bool(*v),
        (PrimitiveKind::Char, DynamicValue::Char(c)) => Value::String(char::from(*c).to_string()),
        (PrimitiveKind::Short, DynamicValue::Short(v)) => Value::from(*v),
        (PrimitiveKind::Int, DynamicValue::Int(v)) => Value::from(*v),
        (PrimitiveKind::Long, DynamicValue::Long(v))
        | (PrimitiveKind::LongLong, DynamicValue::LongLong(v)) => Value::from(*v),
        (PrimitiveKind::UChar, DynamicValue::UChar(v)) => Value::from(*v),
        (PrimitiveKind::UShort, DynamicValue::UShort(v)) => Value::from(*v),
        (PrimitiveKind::UInt, DynamicValue::UInt(v)) => Value::from(*v),
        (PrimitiveKind::ULong, DynamicValue::ULong(v))
        | (PrimitiveKind::ULongLong, DynamicValue::ULongLong(v))
        | (PrimitiveKind::Ptr, DynamicValue::Ptr(v)) => Value::from(*v),
        (PrimitiveKind::Float, DynamicValue::Float(v)) => float(f64::from(*v))?,
        (PrimitiveKind::Double, DynamicValue::Double(v))
        | (PrimitiveKind::LongDouble, DynamicValue::LongDouble(v)) => float(*v)?,
        (PrimitiveKind::CharPtr, DynamicValue::CharPtr(s)) => Value::String(s.clone()),
        _ => return None,
    };
    Some(json)
}

fn single_char(v: &Value) -> Option<u8> {
    let s = v.as_str()?;
    let mut chars = s.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    u8::try_from(u32::from(c)).ok()
}

fn float_only(v: &Value) -> Option<f64> {
    if v.is_f64() {
        v.as_f64()
    } else {
        None
    }
}

/// Decode one primitive element. `None` on a kind or range mismatch.
pub fn primitive_from_json(kind: PrimitiveKind, v: &Value) -> Option<DynamicValue> {
    let value = match kind {
        PrimitiveKind::Bool => DynamicValue::Bool(v.as_bool()?),
        PrimitiveKind::Char => DynamicValue::Char(single_char(v)?),
        PrimitiveKind::Short => DynamicValue::Short(i16::try_from(v.as_i64()?).ok()?),
        PrimitiveKind::Int => DynamicValue::Int(i32::try_from(v.as_i64()?).ok()?),
        PrimitiveKind::Long => DynamicValue::Long(v.as_i64()?),
        PrimitiveKind::LongLong => DynamicValue::LongLong(v.as_i64()?),
        PrimitiveKind::UChar => DynamicValue::UChar(u8::try_from(v.as_u64()?).ok()?),
        PrimitiveKind::UShort => DynamicValue::UShort(u16::try_from(v.as_u64()?).ok()?),
        PrimitiveKind::UInt => DynamicValue::UInt(u32::try_from(v.as_u64()?).ok()?),
        PrimitiveKind::ULong => DynamicValue::ULong(v.as_u64()?),
        PrimitiveKind::ULongLong => DynamicValue::ULongLong(v.as_u64()?),
        PrimitiveKind::Ptr => DynamicValue::Ptr(v.as_u64()?),
        PrimitiveKind::Float => DynamicValue::Float(float_only(v)? as f32),
        PrimitiveKind::Double => DynamicValue::Double(float_only(v)?),
        PrimitiveKind::LongDouble => DynamicValue::LongDouble(float_only(v)?),
        PrimitiveKind::CharPtr => DynamicValue::CharPtr(v.as_str()?.to_string()),
    };
    Some(value)
}
