// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder API for TypeDescriptor.

use crate::dynamic::{FieldDescriptor, PrimitiveKind, TypeDescriptor};
use std::sync::Arc;

/// Builder for composite TypeDescriptor instances.
#[derive(Debug)]
pub struct TypeDescriptorBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
    super_type: Option<Arc<TypeDescriptor>>,
}

impl TypeDescriptorBuilder {
    /// Create a new builder for a composite type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            super_type: None,
        }
    }

    /// Inherit the fields of `super_type` ahead of this type's own.
    pub fn inherits(mut self, super_type: Arc<TypeDescriptor>) -> Self {
        self.super_type = Some(super_type);
        self
    }

    /// Add a primitive field.
    pub fn field(mut self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        let type_desc = Arc::new(TypeDescriptor::primitive(kind));
        self.fields.push(FieldDescriptor::new(name, type_desc));
        self
    }

    /// Add a field with a type descriptor.
    pub fn field_with_type(
        mut self,
        name: impl Into<String>,
        type_desc: Arc<TypeDescriptor>,
    ) -> Self {
        self.fields.push(FieldDescriptor::new(name, type_desc));
        self
    }

    /// Add a string (`charptr`) field.
    pub fn string_field(self, name: impl Into<String>) -> Self {
        self.field(name, PrimitiveKind::CharPtr)
    }

    /// Add a fixed-size primitive array field.
    pub fn array_field(
        mut self,
        name: impl Into<String>,
        element_kind: PrimitiveKind,
        length: usize,
    ) -> Self {
        let type_desc = Arc::new(TypeDescriptor::primitive(element_kind));
        self.fields
            .push(FieldDescriptor::new(name, type_desc).with_array_size(length));
        self
    }

    /// Add a nested composite field.
    pub fn nested_field(self, name: impl Into<String>, nested: Arc<TypeDescriptor>) -> Self {
        self.field_with_type(name, nested)
    }

    /// Add a fixed-size array of a nested composite.
    pub fn nested_array_field(
        mut self,
        name: impl Into<String>,
        nested: Arc<TypeDescriptor>,
        length: usize,
    ) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, nested).with_array_size(length));
        self
    }

    /// Build the TypeDescriptor.
    pub fn build(self) -> TypeDescriptor {
        let desc = TypeDescriptor::struct_type(self.name, self.fields);
        match self.super_type {
            Some(sup) => desc.with_super(sup),
            None => desc,
        }
    }
}
