// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptor registry
//!
//! Self-describing values that cross process and host boundaries without
//! compile-time knowledge of their layout.
//!
//! # Features
//!
//! - **TypeDescriptor**: primitive kinds and composites with array fields and superclass chaining
//! - **ObjectType**: initialize/copy/encode/decode/print/toJSON/fromJSON per type
//! - **DynamicData**: checked container with field access by name
//! - **Builder API**: fluent interface for building type descriptors
//! - **Binary and JSON codecs**: packed little-endian and `{type,value}` JSON nodes
//!
//! # Example
//!
//! ```rust
//! use capsule_rts::dynamic::{DynamicData, PrimitiveKind, TypeDescriptorBuilder};
//! use std::sync::Arc;
//!
//! let descriptor = Arc::new(TypeDescriptorBuilder::new("Reading")
//!     .field("sensor", PrimitiveKind::UInt)
//!     .field("celsius", PrimitiveKind::Double)
//!     .build());
//!
//! let mut data = DynamicData::new(&descriptor);
//! data.set("sensor", 42u32).unwrap();
//! data.set("celsius", 23.5f64).unwrap();
//!
//! let node = data.to_json().unwrap();
//! let back = DynamicData::from_json(&descriptor, &node).unwrap();
//! assert_eq!(back.get::<f64>("celsius").unwrap(), 23.5);
//! ```

pub mod binary;
mod builder;
mod dynamic_data;
pub mod json;
mod object_type;
pub mod print;
mod serializer;
mod type_descriptor;
mod value;

pub use binary::{decode_dynamic, encode_dynamic, BinaryCodecError};
pub use builder::TypeDescriptorBuilder;
pub use dynamic_data::{DynamicData, DynamicDataError, FromDynamicValue, IntoDynamicValue};
pub use object_type::ObjectType;
pub use serializer::{CapsuleSerializer, CapsuleSnapshot, SerializerError};
pub use type_descriptor::{FieldDescriptor, PrimitiveKind, TypeDescriptor, TypeKind};
pub use value::DynamicValue;

#[cfg(test)]
mod tests;
