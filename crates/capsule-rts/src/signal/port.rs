// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ports and protocol roles.

use std::fmt;

/// The protocol a port implements, under a role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtocolRole {
    /// Role (port) name as declared on the capsule.
    pub name: String,
    /// Protocol name; selects the signal set in the registry.
    pub protocol: String,
}

impl ProtocolRole {
    pub fn new(name: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol: protocol.into(),
        }
    }
}

/// A communication endpoint on a capsule instance.
///
/// `role_index` is the port's position in its capsule's border or internal
/// port list; it is what travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommsPort {
    /// Name of the slot owning the capsule.
    pub slot: String,
    pub role: ProtocolRole,
    pub role_index: usize,
    /// Border ports face the capsule's container; internal ports face its parts.
    pub border: bool,
}

impl CommsPort {
    /// Create a border port.
    pub fn border(slot: impl Into<String>, role: ProtocolRole, role_index: usize) -> Self {
        Self {
            slot: slot.into(),
            role,
            role_index,
            border: true,
        }
    }

    /// Create an internal port.
    pub fn internal(slot: impl Into<String>, role: ProtocolRole, role_index: usize) -> Self {
        Self {
            border: false,
            ..Self::border(slot, role, role_index)
        }
    }

    pub fn is_internal(&self) -> bool {
        !self.border
    }

    /// Protocol implemented by this port.
    pub fn protocol(&self) -> &str {
        &self.role.protocol
    }
}

impl fmt::Display for CommsPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}[{}]({})",
            self.slot,
            self.role.name,
            self.role_index,
            if self.border { "border" } else { "internal" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_kinds() {
        let role = ProtocolRole::new("ping", "PingPong");
        let b = CommsPort::border("top.pinger", role.clone(), 0);
        let i = CommsPort::internal("top", role, 2);
        assert!(!b.is_internal());
        assert!(i.is_internal());
        assert_eq!(i.protocol(), "PingPong");
        assert_eq!(b.to_string(), "top.pinger.ping[0](border)");
        assert_eq!(i.to_string(), "top.ping[2](internal)");
    }
}
