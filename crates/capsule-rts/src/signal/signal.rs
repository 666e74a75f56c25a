// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Signal instances.

use crate::dynamic::DynamicData;
use crate::signal::CommsPort;
use std::fmt;
use std::sync::Arc;

/// Numeric signal identifier, resolved from (protocol, name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(pub i32);

impl SignalId {
    /// Reserved id of the `INITIALIZE` bootstrap signal.
    pub const INVALID: SignalId = SignalId(-1);

    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of the bootstrap signal delivered to freshly created capsules.
pub const INITIALIZE_SIGNAL: &str = "INITIALIZE";

/// A named event with an optional typed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    name: String,
    id: SignalId,
    src_port: Option<Arc<CommsPort>>,
    payload: Option<DynamicData>,
}

impl Signal {
    pub fn new(name: impl Into<String>, id: SignalId) -> Self {
        Self {
            name: name.into(),
            id,
            src_port: None,
            payload: None,
        }
    }

    /// The `INITIALIZE` signal (invalid id, no port, no payload).
    pub fn initialize_signal() -> Self {
        Self::new(INITIALIZE_SIGNAL, SignalId::INVALID)
    }

    /// Set the port the signal is sent from.
    pub fn with_src_port(mut self, port: Arc<CommsPort>) -> Self {
        self.src_port = Some(port);
        self
    }

    /// Attach a payload; the signal owns its copy.
    pub fn with_payload(mut self, payload: DynamicData) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> SignalId {
        self.id
    }

    pub fn src_port(&self) -> Option<&Arc<CommsPort>> {
        self.src_port.as_ref()
    }

    pub fn payload(&self) -> Option<&DynamicData> {
        self.payload.as_ref()
    }

    pub fn is_initialize(&self) -> bool {
        self.id == SignalId::INVALID && self.name == INITIALIZE_SIGNAL
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)?;
        if let Some(payload) = &self.payload {
            write!(f, " {}", payload)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_signal() {
        let s = Signal::initialize_signal();
        assert!(s.is_initialize());
        assert!(!s.id().is_valid());
        assert!(s.src_port().is_none());
        assert!(s.payload().is_none());
        assert!(!Signal::new("INITIALIZE", SignalId(3)).is_initialize());
    }

    #[test]
    fn test_display() {
        assert_eq!(Signal::new("ping", SignalId(4)).to_string(), "ping(4)");
    }
}
