// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire envelopes.
//!
//! Bootstrap envelopes carry exactly one phase member:
//!
//! ```json
//! {"sender":"main","receiver":"edge","deployment":"<plan JSON text>"}
//! {"sender":"edge","receiver":"main","ready":true}
//! {"sender":"main","receiver":"edge","go":true}
//! ```
//!
//! Steady-state traffic uses [`WireMessage`], whose `payload` is the signal
//! body as embedded JSON text and `payloadSize` its byte length.

use crate::communicator::CommunicatorError;
use crate::deployment::Host;
use crate::signal::CommsPort;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Serialize, Deserialize)]
struct RawEnvelope {
    sender: String,
    receiver: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deployment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ready: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    go: Option<bool>,
}

/// A bootstrap handshake message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Deployment {
        sender: String,
        receiver: String,
        plan: String,
    },
    Ready {
        sender: String,
        receiver: String,
    },
    Go {
        sender: String,
        receiver: String,
    },
}

impl Envelope {
    pub fn deployment(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        plan: impl Into<String>,
    ) -> Self {
        Self::Deployment {
            sender: sender.into(),
            receiver: receiver.into(),
            plan: plan.into(),
        }
    }

    pub fn ready(sender: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self::Ready {
            sender: sender.into(),
            receiver: receiver.into(),
        }
    }

    pub fn go(sender: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self::Go {
            sender: sender.into(),
            receiver: receiver.into(),
        }
    }

    /// Phase member name.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Deployment { .. } => "deployment",
            Self::Ready { .. } => "ready",
            Self::Go { .. } => "go",
        }
    }

    pub fn sender(&self) -> &str {
        match self {
            Self::Deployment { sender, .. } | Self::Ready { sender, .. } | Self::Go { sender, .. } => {
                sender
            }
        }
    }

    pub fn receiver(&self) -> &str {
        match self {
            Self::Deployment { receiver, .. }
            | Self::Ready { receiver, .. }
            | Self::Go { receiver, .. } => receiver,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let raw = match self {
            Self::Deployment {
                sender,
                receiver,
                plan,
            } => RawEnvelope {
                sender: sender.clone(),
                receiver: receiver.clone(),
                deployment: Some(plan.clone()),
                ready: None,
                go: None,
            },
            Self::Ready { sender, receiver } => RawEnvelope {
                sender: sender.clone(),
                receiver: receiver.clone(),
                deployment: None,
                ready: Some(true),
                go: None,
            },
            Self::Go { sender, receiver } => RawEnvelope {
                sender: sender.clone(),
                receiver: receiver.clone(),
                deployment: None,
                ready: None,
                go: Some(true),
            },
        };
        serde_json::to_vec(&raw)
    }

    /// Parse an envelope; exactly one phase member must be present.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CommunicatorError> {
        let raw: RawEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| CommunicatorError::Malformed(format!("envelope: {}", e)))?;

        match (raw.deployment, raw.ready, raw.go) {
            (Some(plan), None, None) => Ok(Self::Deployment {
                sender: raw.sender,
                receiver: raw.receiver,
                plan,
            }),
            (None, Some(true), None) => Ok(Self::Ready {
                sender: raw.sender,
                receiver: raw.receiver,
            }),
            (None, None, Some(true)) => Ok(Self::Go {
                sender: raw.sender,
                receiver: raw.receiver,
            }),
            _ => Err(CommunicatorError::Malformed(format!(
                "envelope from {} has no single phase member",
                raw.sender
            ))),
        }
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.phase(), self.sender(), self.receiver())
    }
}

/// Steady-state signal envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub dest_slot: String,
    pub dest_port: usize,
    pub dest_internal: bool,
    pub src_slot: String,
    pub src_port: usize,
    pub src_internal: bool,
    pub protocol_name: String,
    pub signal_name: String,
    pub payload: String,
    pub payload_size: usize,
}

impl WireMessage {
    /// Address a signal body from `src` to `dest`. The protocol is the
    /// source port's.
    pub fn between(
        dest: &CommsPort,
        src: &CommsPort,
        src_port_index: usize,
        signal_name: impl Into<String>,
        payload: String,
    ) -> Self {
        Self {
            dest_slot: dest.slot.clone(),
            dest_port: dest.role_index,
            dest_internal: dest.is_internal(),
            src_slot: src.slot.clone(),
            src_port: src_port_index,
            src_internal: src.is_internal(),
            protocol_name: src.protocol().to_string(),
            signal_name: signal_name.into(),
            payload_size: payload.len(),
            payload,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse a message and check `payloadSize` against the payload.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CommunicatorError> {
        let message: Self = serde_json::from_slice(bytes)
            .map_err(|e| CommunicatorError::Malformed(format!("message: {}", e)))?;
        if message.payload_size != message.payload.len() {
            return Err(CommunicatorError::Malformed(format!(
                "payloadSize {} does not match payload of {} bytes",
                message.payload_size,
                message.payload.len()
            )));
        }
        Ok(message)
    }
}

impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}[{}] -> {}[{}] ({} bytes)",
            self.protocol_name,
            self.signal_name,
            self.src_slot,
            self.dest_slot,
            self.dest_port,
            self.payload_size
        )
    }
}

/// A message waiting in the outbound queue.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub dest_host: Arc<Host>,
    pub message: WireMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::ProtocolRole;

    #[test]
    fn test_bootstrap_envelope_shapes() {
        let bytes = Envelope::ready("edge", "main").to_bytes().expect("encode");
        assert_eq!(
            std::str::from_utf8(&bytes).expect("utf8"),
            r#"{"sender":"edge","receiver":"main","ready":true}"#
        );

        let bytes = Envelope::go("main", "edge").to_bytes().expect("encode");
        assert_eq!(
            std::str::from_utf8(&bytes).expect("utf8"),
            r#"{"sender":"main","receiver":"edge","go":true}"#
        );

        let plan = r#"{"hosts":[]}"#;
        let bytes = Envelope::deployment("main", "edge", plan)
            .to_bytes()
            .expect("encode");
        let parsed = Envelope::from_slice(&bytes).expect("decode");
        assert_eq!(parsed, Envelope::deployment("main", "edge", plan));
        assert_eq!(parsed.phase(), "deployment");
        assert_eq!(parsed.to_string(), "deployment main -> edge");
    }

    #[test]
    fn test_envelope_needs_one_phase() {
        assert!(Envelope::from_slice(br#"{"sender":"a","receiver":"b"}"#).is_err());
        assert!(
            Envelope::from_slice(br#"{"sender":"a","receiver":"b","ready":true,"go":true}"#)
                .is_err()
        );
        assert!(Envelope::from_slice(br#"{"sender":"a","receiver":"b","ready":false}"#).is_err());
        let err = Envelope::from_slice(b"not json").expect_err("garbage");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_wire_message_fields() {
        let dest = CommsPort::border("top.sensor", ProtocolRole::new("cmd", "Control"), 2);
        let src = CommsPort::internal("top", ProtocolRole::new("ctl", "Control"), 0);
        let payload = r#"{"signal":"start","params":[]}"#.to_string();
        let message = WireMessage::between(&dest, &src, 1, "start", payload.clone());

        assert_eq!(message.dest_port, 2);
        assert!(!message.dest_internal);
        assert!(message.src_internal);
        assert_eq!(message.src_port, 1);
        assert_eq!(message.protocol_name, "Control");
        assert_eq!(message.payload_size, payload.len());

        let value: serde_json::Value =
            serde_json::from_slice(&message.to_bytes().expect("encode")).expect("json");
        let object = value.as_object().expect("object");
        assert_eq!(object.len(), 10);
        assert_eq!(object["destSlot"], "top.sensor");
        assert_eq!(object["protocolName"], "Control");
        assert_eq!(object["payload"], payload.as_str());

        let parsed = WireMessage::from_slice(&message.to_bytes().expect("encode")).expect("decode");
        assert_eq!(parsed, message);
    }

    #[test]
    fn test_payload_size_mismatch_is_malformed() {
        let body = br#"{"destSlot":"a","destPort":0,"destInternal":false,"srcSlot":"b","srcPort":0,
"srcInternal":false,"protocolName":"P","signalName":"s","payload":"{}","payloadSize":9}"#;
        let err = WireMessage::from_slice(body).expect_err("size mismatch");
        assert!(matches!(err, CommunicatorError::Malformed(_)));
    }
}
