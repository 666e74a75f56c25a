// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Signal Registry
//!
//! Maps `(protocol, signal)` to a numeric id and a payload descriptor,
//! separately for inbound and outbound signals. Keys are case-insensitive.
//!
//! Also owns the JSON body carried in steady-state wire messages:
//!
//! ```json
//! {"signal":"position","params":[{"name":"x","type":"int","value":3}]}
//! ```
//!
//! A composite parameter carries a nested array of `{name,type,value}`
//! objects; a parameter declared with more than one element carries an array
//! with one entry per element.

use crate::dynamic::{json, DynamicData, DynamicValue, FieldDescriptor, TypeDescriptor, TypeKind};
use crate::signal::{CommsPort, Signal, SignalId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Signal registry errors.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Malformed signal body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown signal {signal} for protocol {protocol}")]
    UnknownSignal { protocol: String, signal: String },

    #[error("Signal {signal} rejected: {reason}")]
    Mismatch { signal: String, reason: String },

    #[error("Cannot resolve outbound payload of {protocol}::{signal}")]
    UnresolvedPayload { protocol: String, signal: String },

    #[error("Signal {0} has no source port")]
    NoSourcePort(String),

    #[error("Cannot encode signal {signal}: {reason}")]
    Encode { signal: String, reason: String },
}

impl SignalError {
    /// Programming errors in capsule code; the process cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedPayload { .. } | Self::NoSourcePort(_) | Self::Encode { .. }
        )
    }

    fn mismatch(signal: &str, reason: impl Into<String>) -> Self {
        Self::Mismatch {
            signal: signal.to_string(),
            reason: reason.into(),
        }
    }
}

/// Signal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

#[derive(Debug, Clone)]
struct SignalEntry {
    name: String,
    id: SignalId,
    payload: Arc<TypeDescriptor>,
}

/// protocol (lowercase) -> signal name (lowercase) -> entry
type SignalTable = HashMap<String, HashMap<String, SignalEntry>>;

#[derive(Serialize)]
struct SignalBody<'a> {
    signal: &'a str,
    params: Vec<Value>,
}

#[derive(Deserialize)]
struct IncomingBody {
    signal: String,
    #[serde(default)]
    params: Option<Value>,
}

/// Process-wide signal directory, shared through `Arc`.
#[derive(Debug, Default)]
pub struct SignalRegistry {
    inbound: RwLock<SignalTable>,
    outbound: RwLock<SignalTable>,
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

fn payload_or_none(payload: &Arc<TypeDescriptor>) -> Option<Arc<TypeDescriptor>> {
    if payload.is_empty() {
        None
    } else {
        Some(Arc::clone(payload))
    }
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, direction: Direction) -> &RwLock<SignalTable> {
        match direction {
            Direction::In => &self.inbound,
            Direction::Out => &self.outbound,
        }
    }

    fn register(
        &self,
        direction: Direction,
        protocol: &str,
        name: &str,
        id: SignalId,
        payload: Arc<TypeDescriptor>,
    ) -> bool {
        if !payload.is_struct() {
            log::warn!(
                "[SignalRegistry] {} signal {}::{} payload {} is not a composite",
                direction.label(),
                protocol,
                name,
                payload.name
            );
            return false;
        }
        let mut table = self.table(direction).write();
        let signals = table.entry(key(protocol)).or_default();
        if signals.contains_key(&key(name)) {
            log::warn!(
                "[SignalRegistry] {} signal {}::{} already registered",
                direction.label(),
                protocol,
                name
            );
            return false;
        }
        signals.insert(
            key(name),
            SignalEntry {
                name: name.to_string(),
                id,
                payload,
            },
        );
        log::debug!(
            "[SignalRegistry] registered {} signal {}::{} id={}",
            direction.label(),
            protocol,
            name,
            id
        );
        true
    }

    fn entry(&self, direction: Direction, protocol: &str, name: &str) -> Option<SignalEntry> {
        self.table(direction)
            .read()
            .get(&key(protocol))
            .and_then(|signals| signals.get(&key(name)))
            .cloned()
    }

    /// Register an outbound signal. Returns `false` if `(protocol, name)` is taken
    /// or `payload` is not a composite.
    ///
    /// Signals without a payload register [`TypeDescriptor::empty`].
    pub fn register_out_signal(
        &self,
        protocol: &str,
        name: &str,
        id: SignalId,
        payload: Arc<TypeDescriptor>,
    ) -> bool {
        self.register(Direction::Out, protocol, name, id, payload)
    }

    /// Register an inbound signal. Returns `false` if `(protocol, name)` is taken
    /// or `payload` is not a composite.
    pub fn register_in_signal(
        &self,
        protocol: &str,
        name: &str,
        id: SignalId,
        payload: Arc<TypeDescriptor>,
    ) -> bool {
        self.register(Direction::In, protocol, name, id, payload)
    }

    pub fn get_out_signal_id(&self, protocol: &str, name: &str) -> Option<SignalId> {
        self.entry(Direction::Out, protocol, name).map(|e| e.id)
    }

    pub fn get_in_signal_id(&self, protocol: &str, name: &str) -> Option<SignalId> {
        self.entry(Direction::In, protocol, name).map(|e| e.id)
    }

    /// Outbound payload descriptor; `None` when unknown or without fields.
    pub fn get_out_signal_payload(&self, protocol: &str, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.entry(Direction::Out, protocol, name)
            .and_then(|e| payload_or_none(&e.payload))
    }

    /// Inbound payload descriptor; `None` when unknown or without fields.
    pub fn get_in_signal_payload(&self, protocol: &str, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.entry(Direction::In, protocol, name)
            .and_then(|e| payload_or_none(&e.payload))
    }

    /// Number of protocols known in a direction.
    pub fn protocol_count(&self, direction: Direction) -> usize {
        self.table(direction).read().len()
    }

    /// Encode `signal` as a JSON body, using the outbound table of its
    /// source port's protocol.
    pub fn to_json(&self, signal: &Signal) -> Result<String, SignalError> {
        let port = signal
            .src_port()
            .ok_or_else(|| SignalError::NoSourcePort(signal.name().to_string()))?;
        let entry = self
            .entry(Direction::Out, port.protocol(), signal.name())
            .ok_or_else(|| SignalError::UnresolvedPayload {
                protocol: port.protocol().to_string(),
                signal: signal.name().to_string(),
            })?;

        let encode_err = |reason: &str| SignalError::Encode {
            signal: signal.name().to_string(),
            reason: reason.to_string(),
        };

        let mut params = Vec::new();
        if !entry.payload.is_empty() {
            let payload = signal
                .payload()
                .ok_or_else(|| encode_err("payload expected"))?;
            let members = match (&entry.payload.kind, payload.value()) {
                (TypeKind::Struct(_), DynamicValue::Struct(members)) => members.as_slice(),
                _ => return Err(encode_err("payload is not a composite")),
            };
            let fields = entry.payload.fields();
            if members.len() != fields.len() {
                return Err(encode_err("payload field count"));
            }
            for (field, member) in fields.iter().zip(members) {
                params.push(
                    param_to_json(field, member)
                        .ok_or_else(|| encode_err(&format!("field {}", field.name)))?,
                );
            }
        }

        let body = SignalBody {
            signal: signal.name(),
            params,
        };
        Ok(serde_json::to_string(&body)?)
    }

    /// Decode a JSON body received on `port`.
    ///
    /// The signal is resolved in the inbound table of the port's protocol.
    /// Every failure is recoverable: the message is dropped.
    pub fn from_json(&self, body: &str, port: &Arc<CommsPort>) -> Result<Signal, SignalError> {
        let incoming: IncomingBody = serde_json::from_str(body)?;
        let name = incoming.signal.as_str();
        let entry = self
            .entry(Direction::In, port.protocol(), name)
            .ok_or_else(|| SignalError::UnknownSignal {
                protocol: port.protocol().to_string(),
                signal: name.to_string(),
            })?;

        let signal = Signal::new(name, entry.id).with_src_port(Arc::clone(port));

        let Some(descriptor) = payload_or_none(&entry.payload) else {
            return match incoming.params {
                None | Some(Value::Null) => Ok(signal),
                Some(Value::Array(items)) if items.is_empty() => Ok(signal),
                Some(_) => Err(SignalError::mismatch(name, "signal carries no payload")),
            };
        };

        let params = incoming
            .params
            .as_ref()
            .and_then(Value::as_array)
            .ok_or_else(|| SignalError::mismatch(name, "missing params"))?;
        let fields = descriptor.fields();
        if params.len() != fields.len() {
            return Err(SignalError::mismatch(
                name,
                format!("expected {} params, got {}", fields.len(), params.len()),
            ));
        }

        let mut members = Vec::with_capacity(fields.len());
        for (field, param) in fields.iter().zip(params) {
            let member = param_from_json(field, param)
                .ok_or_else(|| SignalError::mismatch(name, format!("param {}", field.name)))?;
            members.push(member);
        }

        let payload = DynamicData::from_value(&descriptor, DynamicValue::Struct(members))
            .map_err(|e| SignalError::mismatch(name, e.to_string()))?;
        Ok(signal.with_payload(payload))
    }

    /// Log every registration.
    pub fn debug_output(&self) {
        for direction in [Direction::In, Direction::Out] {
            for (protocol, signals) in self.table(direction).read().iter() {
                for entry in signals.values() {
                    log::debug!(
                        "[SignalRegistry] {} {}::{} id={} payload={}",
                        direction.label(),
                        protocol,
                        entry.name,
                        entry.id,
                        entry.payload.name
                    );
                }
            }
        }
    }
}

/// `{"name":..,"type":..,"value":..}` for one field.
fn param_to_json(field: &FieldDescriptor, value: &DynamicValue) -> Option<Value> {
    let value = if field.is_array() {
        let items = value.as_array()?;
        if items.len() != field.array_size {
            return None;
        }
        Value::Array(
            items
                .iter()
                .map(|item| element_to_json(&field.type_desc, item))
                .collect::<Option<Vec<_>>>()?,
        )
    } else {
        element_to_json(&field.type_desc, value)?
    };

    let mut obj = Map::new();
    obj.insert("name".into(), Value::String(field.name.clone()));
    obj.insert("type".into(), Value::String(field.type_desc.name.clone()));
    obj.insert("value".into(), value);
    Some(Value::Object(obj))
}

fn element_to_json(desc: &TypeDescriptor, value: &DynamicValue) -> Option<Value> {
    match &desc.kind {
        TypeKind::Primitive(kind) => json::primitive_to_json(*kind, value),
        TypeKind::Struct(_) => {
            let members = value.as_struct()?;
            let fields = desc.fields();
            if members.len() != fields.len() {
                return None;
            }
            Some(Value::Array(
                fields
                    .iter()
                    .zip(members)
                    .map(|(f, m)| param_to_json(f, m))
                    .collect::<Option<Vec<_>>>()?,
            ))
        }
    }
}

/// Inverse of [`param_to_json`]. `"name"` is informational; `"type"` is
/// optional but must match when present.
fn param_from_json(field: &FieldDescriptor, param: &Value) -> Option<DynamicValue> {
    let obj = param.as_object()?;
    if let Some(type_name) = obj.get("type") {
        if type_name.as_str()? != field.type_desc.name {
            return None;
        }
    }
    let value = obj.get("value")?;
    if field.is_array() {
        let items = value.as_array()?;
        if items.len() != field.array_size {
            return None;
        }
        Some(DynamicValue::Array(
            items
                .iter()
                .map(|item| element_from_json(&field.type_desc, item))
                .collect::<Option<Vec<_>>>()?,
        ))
    } else {
        element_from_json(&field.type_desc, value)
    }
}

fn element_from_json(desc: &TypeDescriptor, value: &Value) -> Option<DynamicValue> {
    match &desc.kind {
        TypeKind::Primitive(kind) => json::primitive_from_json(*kind, value),
        TypeKind::Struct(_) => {
            let params = value.as_array()?;
            let fields = desc.fields();
            if params.len() != fields.len() {
                return None;
            }
            Some(DynamicValue::Struct(
                fields
                    .iter()
                    .zip(params)
                    .map(|(f, p)| param_from_json(f, p))
                    .collect::<Option<Vec<_>>>()?,
            ))
        }
    }
}
