// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic value types.

/// A dynamic value that can hold any described type.
///
/// `Struct` holds one entry per field in descriptor order (inherited fields
/// first). A field declared with more than one element holds an `Array`.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    // Primitives
    Bool(bool),
    Char(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    LongLong(i64),
    UChar(u8),
    UShort(u16),
    UInt(u32),
    ULong(u64),
    ULongLong(u64),
    Float(f32),
    Double(f64),
    LongDouble(f64),
    Ptr(u64),
    CharPtr(String),

    // Composites
    Struct(Vec<DynamicValue>),
    Array(Vec<DynamicValue>),
}

impl DynamicValue {
    /// Short label of the variant, for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Char(_) => "char",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::LongLong(_) => "longlong",
            Self::UChar(_) => "uchar",
            Self::UShort(_) => "ushort",
            Self::UInt(_) => "uint",
            Self::ULong(_) => "ulong",
            Self::ULongLong(_) => "ulonglong",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::LongDouble(_) => "longdouble",
            Self::Ptr(_) => "ptr",
            Self::CharPtr(_) => "charptr",
            Self::Struct(_) => "struct",
            Self::Array(_) => "array",
        }
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as a char byte.
    pub fn as_char(&self) -> Option<u8> {
        match self {
            Self::Char(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i16.
    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Self::Short(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i32.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i64 (`long` or `longlong`).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Long(v) | Self::LongLong(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as u8.
    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Self::UChar(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as u16.
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Self::UShort(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as u32.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as u64 (`ulong` or `ulonglong`).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::ULong(v) | Self::ULongLong(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f32.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f64 (`double` or `longdouble`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) | Self::LongDouble(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as a raw pointer value.
    pub fn as_ptr(&self) -> Option<u64> {
        match self {
            Self::Ptr(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::CharPtr(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get struct members.
    pub fn as_struct(&self) -> Option<&[DynamicValue]> {
        match self {
            Self::Struct(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get array elements.
    pub fn as_array(&self) -> Option<&[DynamicValue]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for DynamicValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for DynamicValue {
    fn from(v: i16) -> Self {
        Self::Short(v)
    }
}

impl From<i32> for DynamicValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for DynamicValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<u8> for DynamicValue {
    fn from(v: u8) -> Self {
        Self::UChar(v)
    }
}

impl From<u16> for DynamicValue {
    fn from(v: u16) -> Self {
        Self::UShort(v)
    }
}

impl From<u32> for DynamicValue {
    fn from(v: u32) -> Self {
        Self::UInt(v)
    }
}

impl From<u64> for DynamicValue {
    fn from(v: u64) -> Self {
        Self::ULong(v)
    }
}

impl From<f32> for DynamicValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for DynamicValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

/// Characters outside Latin-1 map to `'?'`.
impl From<char> for DynamicValue {
    fn from(c: char) -> Self {
        Self::Char(u8::try_from(u32::from(c)).unwrap_or(b'?'))
    }
}

impl From<String> for DynamicValue {
    fn from(v: String) -> Self {
        Self::CharPtr(v)
    }
}

impl From<&str> for DynamicValue {
    fn from(v: &str) -> Self {
        Self::CharPtr(v.to_string())
    }
}

impl<T: Into<DynamicValue>> From<Vec<T>> for DynamicValue {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_values() {
        let v = DynamicValue::from(42u32);
        assert_eq!(v.as_u32(), Some(42));
        assert_eq!(v.as_i32(), None);

        let v = DynamicValue::from(std::f64::consts::PI);
        assert_eq!(v.as_f64(), Some(std::f64::consts::PI));

        let v = DynamicValue::from("hello");
        assert_eq!(v.as_str(), Some("hello"));
        assert_eq!(v.label(), "charptr");
    }

    #[test]
    fn test_long_variants_share_accessor() {
        assert_eq!(DynamicValue::Long(-7).as_i64(), Some(-7));
        assert_eq!(DynamicValue::LongLong(7).as_i64(), Some(7));
        assert_eq!(DynamicValue::ULongLong(9).as_u64(), Some(9));
        assert_eq!(DynamicValue::LongDouble(0.5).as_f64(), Some(0.5));
    }

    #[test]
    fn test_array_from_vec() {
        let v = DynamicValue::from(vec![1i32, 2, 3]);
        let arr = v.as_array().expect("array");
        assert_eq!(arr.len(), 3);
        assert_eq!(arr[1].as_i32(), Some(2));
    }

    #[test]
    fn test_struct_members() {
        let v = DynamicValue::Struct(vec![DynamicValue::Char(b'A'), DynamicValue::Bool(true)]);
        let members = v.as_struct().expect("struct");
        assert_eq!(members[0].as_char(), Some(b'A'));
        assert_eq!(members[1].as_bool(), Some(true));
    }
}
