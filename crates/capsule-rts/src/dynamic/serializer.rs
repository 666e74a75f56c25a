// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capsule attribute snapshots.
//!
//! A snapshot is `{"fields":[<node>, ...],"currentState":n}`, one
//! `{type,value}` node per attribute in the order they were added.
//! `currentState` is omitted when the capsule has no active state.

use crate::dynamic::{DynamicValue, FieldDescriptor, ObjectType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Snapshot errors.
#[derive(Debug, Error)]
pub enum SerializerError {
    #[error("attribute {0} does not match its descriptor")]
    Mismatch(String),

    #[error("no attribute at index {0}")]
    MissingField(usize),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialized form of a capsule's attributes and state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapsuleSnapshot {
    pub fields: Vec<Value>,
    #[serde(
        rename = "currentState",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_state: Option<i32>,
}

impl CapsuleSnapshot {
    /// Parse a snapshot document.
    pub fn read(json: &str) -> Result<Self, SerializerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode the attribute at `index` against its descriptor.
    pub fn field(
        &self,
        index: usize,
        field: &FieldDescriptor,
    ) -> Result<DynamicValue, SerializerError> {
        let node = self
            .fields
            .get(index)
            .ok_or(SerializerError::MissingField(index))?;
        node.get("value")
            .and_then(|v| field.type_desc.from_json(v, field.array_size))
            .ok_or_else(|| SerializerError::Mismatch(field.name.clone()))
    }
}

/// Accumulates capsule attributes into a [`CapsuleSnapshot`].
#[derive(Debug, Default)]
pub struct CapsuleSerializer {
    snapshot: CapsuleSnapshot,
}

impl CapsuleSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one attribute.
    pub fn add_field(
        &mut self,
        field: &FieldDescriptor,
        value: &DynamicValue,
    ) -> Result<(), SerializerError> {
        let node = field
            .type_desc
            .to_json(value, field.array_size)
            .ok_or_else(|| SerializerError::Mismatch(field.name.clone()))?;
        self.snapshot.fields.push(node);
        Ok(())
    }

    /// Finish the document.
    pub fn write(mut self, current_state: Option<i32>) -> Result<String, SerializerError> {
        self.snapshot.current_state = current_state;
        Ok(serde_json::to_string(&self.snapshot)?)
    }
}
