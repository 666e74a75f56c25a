// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Human-readable rendering of dynamic values.
//!
//! Primitives print as `{int 5}`; composites as `{Point:{x:{int 1}}{y:{int 2}}}`,
//! with `[i]` after the type name for each element of a composite array.

use crate::dynamic::{ObjectType, PrimitiveKind, TypeDescriptor, TypeKind};
use crate::dynamic::DynamicValue;
use std::fmt::{self, Write};

fn printable(c: u8) -> char {
    if (0x20..0x7f).contains(&c) {
        char::from(c)
    } else {
        '.'
    }
}

fn element(kind: PrimitiveKind, value: &DynamicValue, out: &mut dyn Write) -> fmt::Result {
    match value {
        DynamicValue::Bool(v) => write!(out, "{{bool {}}}", v),
        DynamicValue::Char(c) => write!(out, "{{char 0x{:02X} '{}'}}", c, printable(*c)),
        DynamicValue::Short(v) => write!(out, "{{short {}}}", v),
        DynamicValue::Int(v) => write!(out, "{{int {}}}", v),
        DynamicValue::Long(v) => write!(out, "{{long {}}}", v),
        DynamicValue::LongLong(v) => write!(out, "{{longlong {}}}", v),
        DynamicValue::UChar(v) => write!(out, "{{uchar {}}}", v),
        DynamicValue::UShort(v) => write!(out, "{{ushort {}}}", v),
        DynamicValue::UInt(v) => write!(out, "{{uint {}}}", v),
        DynamicValue::ULong(v) => write!(out, "{{ulong {}}}", v),
        DynamicValue::ULongLong(v) => write!(out, "{{ulonglong {}}}", v),
        DynamicValue::Float(v) => write!(out, "{{float {:.6}}}", v),
        DynamicValue::Double(v) => write!(out, "{{double {:.6}}}", v),
        DynamicValue::LongDouble(v) => write!(out, "{{longdouble {:.6}}}", v),
        DynamicValue::Ptr(v) => write!(out, "{{ptr 0x{:x}}}", v),
        DynamicValue::CharPtr(s) => write!(out, "{{charptr \"{}\"}}", s),
        DynamicValue::Struct(_) | DynamicValue::Array(_) => {
            write!(out, "{{{} (unable to print)}}", kind.name())
        }
    }
}

/// Print a primitive element, or each element of an array.
pub(crate) fn primitive(kind: PrimitiveKind, value: &DynamicValue, out: &mut dyn Write) -> fmt::Result {
    match value {
        DynamicValue::Array(items) => items.iter().try_for_each(|v| element(kind, v, out)),
        v => element(kind, v, out),
    }
}

fn struct_element(
    desc: &TypeDescriptor,
    value: &DynamicValue,
    index: Option<usize>,
    out: &mut dyn Write,
) -> fmt::Result {
    write!(out, "{{{}", desc.name)?;
    if let Some(i) = index {
        write!(out, "[{}]", i)?;
    }
    out.write_char(':')?;
    match value.as_struct() {
        Some(members) => {
            for (field, member) in desc.fields().iter().zip(members) {
                write!(out, "{{{}:", field.name)?;
                match (&field.type_desc.kind, member) {
                    (TypeKind::Struct(_), DynamicValue::Array(items)) => {
                        for (i, item) in items.iter().enumerate() {
                            struct_element(&field.type_desc, item, Some(i), out)?;
                        }
                    }
                    _ => field.type_desc.print(member, out)?,
                }
                out.write_char('}')?;
            }
        }
        None => out.write_str("(unable to print)")?,
    }
    out.write_char('}')
}

/// Print a composite value.
pub(crate) fn composite(desc: &TypeDescriptor, value: &DynamicValue, out: &mut dyn Write) -> fmt::Result {
    struct_element(desc, value, None, out)
}

/// Render `value` to a string.
pub fn to_string(desc: &TypeDescriptor, value: &DynamicValue) -> String {
    let mut s = String::new();
    // Writing into a String cannot fail.
    let _ = desc.print(value, &mut s);
    s
}
