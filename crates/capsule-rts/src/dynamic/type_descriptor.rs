// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors for runtime type information.

use std::sync::Arc;

/// Primitive type kinds.
///
/// Each kind carries a canonical wire name used in the `"type"` member of
/// JSON nodes, so descriptors survive a trip to another host unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Char,
    Short,
    Int,
    Long,
    LongLong,
    UChar,
    UShort,
    UInt,
    ULong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    Ptr,
    CharPtr,
}

impl PrimitiveKind {
    /// Every primitive kind, in declaration order.
    pub const ALL: [PrimitiveKind; 16] = [
        Self::Bool,
        Self::Char,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::LongLong,
        Self::UChar,
        Self::UShort,
        Self::UInt,
        Self::ULong,
        Self::ULongLong,
        Self::Float,
        Self::Double,
        Self::LongDouble,
        Self::Ptr,
        Self::CharPtr,
    ];

    /// Canonical type name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::LongLong => "longlong",
            Self::UChar => "uchar",
            Self::UShort => "ushort",
            Self::UInt => "uint",
            Self::ULong => "ulong",
            Self::ULongLong => "ulonglong",
            Self::Float => "float",
            Self::Double => "double",
            Self::LongDouble => "longdouble",
            Self::Ptr => "ptr",
            Self::CharPtr => "charptr",
        }
    }

    /// Look up a kind by its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// In-memory size in bytes (LP64 layout).
    pub fn size(&self) -> usize {
        match self {
            Self::Bool | Self::Char | Self::UChar => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Long | Self::LongLong | Self::ULong | Self::ULongLong | Self::Double => 8,
            Self::Ptr | Self::CharPtr => 8,
            Self::LongDouble => 16,
        }
    }

    /// Encoded size in bytes (None for strings).
    ///
    /// `longdouble` travels as an IEEE double.
    pub fn wire_size(&self) -> Option<usize> {
        match self {
            Self::CharPtr => None,
            Self::LongDouble => Some(8),
            other => Some(other.size()),
        }
    }

    /// Check if this kind owns heap data (requires a deep copy).
    pub fn is_string(&self) -> bool {
        matches!(self, Self::CharPtr)
    }
}

/// Type kind enumeration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Primitive leaf.
    Primitive(PrimitiveKind),
    /// Composite with named fields, in declaration order.
    Struct(Vec<FieldDescriptor>),
}

/// A complete type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Type name.
    pub name: String,
    /// Type kind.
    pub kind: TypeKind,
    /// Superclass whose fields precede this type's own fields.
    pub super_type: Option<Arc<TypeDescriptor>>,
}

impl TypeDescriptor {
    /// Create a new type descriptor.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            super_type: None,
        }
    }

    /// Create a primitive type descriptor named after its kind.
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(kind.name(), TypeKind::Primitive(kind))
    }

    /// Create a struct type descriptor.
    pub fn struct_type(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self::new(name, TypeKind::Struct(fields))
    }

    /// The opaque `empty` marker: a composite without fields.
    pub fn empty() -> Self {
        Self::struct_type("empty", Vec::new())
    }

    /// Resolve a predefined descriptor by name (`"int"`, `"charptr"`, `"empty"`, ...).
    pub fn builtin(name: &str) -> Option<Arc<TypeDescriptor>> {
        if name == "empty" {
            return Some(Arc::new(Self::empty()));
        }
        PrimitiveKind::from_name(name).map(|k| Arc::new(Self::primitive(k)))
    }

    /// Chain a superclass.
    pub fn with_super(mut self, super_type: Arc<TypeDescriptor>) -> Self {
        self.super_type = Some(super_type);
        self
    }

    /// Check if this is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(_))
    }

    /// Check if this is a struct type.
    pub fn is_struct(&self) -> bool {
        matches!(self.kind, TypeKind::Struct(_))
    }

    /// Get the primitive kind, if any.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.kind {
            TypeKind::Primitive(k) => Some(k),
            TypeKind::Struct(_) => None,
        }
    }

    /// A composite with no fields anywhere in its superclass chain.
    pub fn is_empty(&self) -> bool {
        self.is_struct() && self.num_fields() == 0
    }

    /// Fields declared directly on this type.
    pub fn own_fields(&self) -> &[FieldDescriptor] {
        match &self.kind {
            TypeKind::Struct(fields) => fields,
            TypeKind::Primitive(_) => &[],
        }
    }

    /// All fields, superclass fields first.
    pub fn fields(&self) -> Vec<&FieldDescriptor> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a FieldDescriptor>) {
        if let Some(sup) = &self.super_type {
            sup.collect_fields(out);
        }
        out.extend(self.own_fields().iter());
    }

    /// Total field count including inherited fields.
    pub fn num_fields(&self) -> usize {
        self.super_type.as_ref().map_or(0, |s| s.num_fields()) + self.own_fields().len()
    }

    /// Get field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().into_iter().find(|f| f.name == name)
    }

    /// Get field index by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields().iter().position(|f| f.name == name)
    }

    /// In-memory size of one instance (fields packed, no padding).
    pub fn size_of(&self) -> usize {
        match &self.kind {
            TypeKind::Primitive(p) => p.size(),
            TypeKind::Struct(_) => self
                .fields()
                .iter()
                .map(|f| f.type_desc.size_of() * f.array_size)
                .sum(),
        }
    }

    /// Fixed encoded size, or None if any field is a string.
    pub fn wire_size(&self) -> Option<usize> {
        match &self.kind {
            TypeKind::Primitive(p) => p.wire_size(),
            TypeKind::Struct(_) => {
                let mut total = 0;
                for f in self.fields() {
                    total += f.type_desc.wire_size()? * f.array_size;
                }
                Some(total)
            }
        }
    }
}

/// Field descriptor for struct members.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: String,
    /// Field type.
    pub type_desc: Arc<TypeDescriptor>,
    /// Number of elements (1 for scalars).
    pub array_size: usize,
}

impl FieldDescriptor {
    /// Create a new scalar field descriptor.
    pub fn new(name: impl Into<String>, type_desc: Arc<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            type_desc,
            array_size: 1,
        }
    }

    /// Set the element count. Zero is clamped to one.
    pub fn with_array_size(mut self, array_size: usize) -> Self {
        self.array_size = array_size.max(1);
        self
    }

    /// Check if this field holds more than one element.
    pub fn is_array(&self) -> bool {
        self.array_size > 1
    }
}
