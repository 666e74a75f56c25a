// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Node configuration.
//!
//! A node file holds the runtime settings, the signal declarations of every
//! protocol and the static slot tree. TOML by default, JSON for `.json`
//! files.

use crate::behavior::LoggingBehavior;
use capsule_rts::deployment::{BasicCapsuleClass, CapsuleBehavior, CapsulePart, Slot};
use capsule_rts::dynamic::{PrimitiveKind, TypeDescriptor, TypeDescriptorBuilder};
use capsule_rts::signal::{SignalId, SignalRegistry};
use capsule_rts::RuntimeConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Runtime(#[from] capsule_rts::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Node configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Runtime settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Signal declarations.
    #[serde(default)]
    pub protocols: Vec<ProtocolConfig>,

    /// Static slot tree.
    #[serde(default)]
    pub slots: Vec<SlotConfig>,
}

/// Signals of one protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub name: String,

    /// Signals received on ports of this protocol.
    #[serde(default)]
    pub in_signals: Vec<SignalConfig>,

    /// Signals sent on ports of this protocol.
    #[serde(default)]
    pub out_signals: Vec<SignalConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub name: String,
    pub id: i32,

    /// Payload fields; none means an empty payload.
    #[serde(default)]
    pub params: Vec<ParamConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamConfig {
    pub name: String,

    /// Primitive wire name (`int`, `charptr`, ...).
    #[serde(rename = "type")]
    pub type_name: String,

    /// Element count.
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortConfig {
    pub role: String,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartConfig {
    pub name: String,
    #[serde(default)]
    pub slots: Vec<String>,
}

/// One slot of the static tree; its name is the capsule instance name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub border_ports: Vec<PortConfig>,
    #[serde(default)]
    pub internal_ports: Vec<PortConfig>,
    #[serde(default)]
    pub parts: Vec<PartConfig>,
}

impl NodeConfig {
    /// Load configuration from a TOML or JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Two-slot example used by `gen-config`.
    pub fn example() -> Self {
        let data = |role: &str| PortConfig {
            role: role.to_string(),
            protocol: "Data".to_string(),
        };
        let reading = SignalConfig {
            name: "reading".to_string(),
            id: 1,
            params: vec![
                ParamConfig {
                    name: "sensor".to_string(),
                    type_name: "uint".to_string(),
                    count: 1,
                },
                ParamConfig {
                    name: "celsius".to_string(),
                    type_name: "double".to_string(),
                    count: 1,
                },
            ],
        };
        Self {
            runtime: RuntimeConfig::default()
                .with_local_address("tcp://127.0.0.1:7000")
                .with_plan_path("plan.json"),
            protocols: vec![ProtocolConfig {
                name: "Data".to_string(),
                in_signals: vec![reading.clone()],
                out_signals: vec![reading],
            }],
            slots: vec![
                SlotConfig {
                    name: "top".to_string(),
                    class: "Top".to_string(),
                    border_ports: vec![data("out")],
                    internal_ports: Vec::new(),
                    parts: vec![PartConfig {
                        name: "sensors".to_string(),
                        slots: vec!["top.sensor".to_string()],
                    }],
                },
                SlotConfig {
                    name: "top.sensor".to_string(),
                    class: "Sensor".to_string(),
                    border_ports: vec![data("in")],
                    internal_ports: Vec::new(),
                    parts: Vec::new(),
                },
            ],
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.runtime.validate()?;

        let mut names = HashSet::new();
        for slot in &self.slots {
            if !names.insert(slot.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Slot {} declared twice",
                    slot.name
                )));
            }
        }
        for slot in &self.slots {
            for child in slot.parts.iter().flat_map(|p| p.slots.iter()) {
                if !names.contains(child.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "Slot {} has undeclared child {}",
                        slot.name, child
                    )));
                }
            }
        }

        for protocol in &self.protocols {
            for signal in protocol.in_signals.iter().chain(&protocol.out_signals) {
                for param in &signal.params {
                    if PrimitiveKind::from_name(&param.type_name).is_none() {
                        return Err(ConfigError::Invalid(format!(
                            "Signal {}.{} param {} has unknown type {}",
                            protocol.name, signal.name, param.name, param.type_name
                        )));
                    }
                    if param.count == 0 {
                        return Err(ConfigError::Invalid(format!(
                            "Signal {}.{} param {} has zero count",
                            protocol.name, signal.name, param.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Register every declared signal.
    pub fn build_registry(&self) -> Result<SignalRegistry, ConfigError> {
        let registry = SignalRegistry::new();
        for protocol in &self.protocols {
            for signal in &protocol.in_signals {
                let payload = payload_type(&protocol.name, signal)?;
                if !registry.register_in_signal(&protocol.name, &signal.name, SignalId(signal.id), payload) {
                    return Err(ConfigError::Invalid(format!(
                        "In signal {}.{} declared twice",
                        protocol.name, signal.name
                    )));
                }
            }
            for signal in &protocol.out_signals {
                let payload = payload_type(&protocol.name, signal)?;
                if !registry.register_out_signal(&protocol.name, &signal.name, SignalId(signal.id), payload) {
                    return Err(ConfigError::Invalid(format!(
                        "Out signal {}.{} declared twice",
                        protocol.name, signal.name
                    )));
                }
            }
        }
        Ok(registry)
    }

    /// Build the static slot tree; every capsule logs what it receives.
    pub fn build_slots(&self) -> Vec<Arc<Slot>> {
        self.slots
            .iter()
            .map(|config| {
                let class = config
                    .border_ports
                    .iter()
                    .fold(BasicCapsuleClass::new(&config.class), |class, port| {
                        class.border_port(&port.role, &port.protocol)
                    });
                let class = config
                    .internal_ports
                    .iter()
                    .fold(class, |class, port| class.internal_port(&port.role, &port.protocol))
                    .behavior(|_: &str| -> Box<dyn CapsuleBehavior> { Box::new(LoggingBehavior::default()) });

                let slot = config.parts.iter().fold(
                    Slot::new(&config.name, Arc::new(class)),
                    |slot, part| slot.with_part(CapsulePart::new(&part.name, part.slots.clone())),
                );
                Arc::new(slot)
            })
            .collect()
    }
}

fn payload_type(protocol: &str, signal: &SignalConfig) -> Result<Arc<TypeDescriptor>, ConfigError> {
    if signal.params.is_empty() {
        return Ok(Arc::new(TypeDescriptor::empty()));
    }
    let mut builder = TypeDescriptorBuilder::new(format!("{}_{}", protocol, signal.name));
    for param in &signal.params {
        let kind = PrimitiveKind::from_name(&param.type_name).ok_or_else(|| {
            ConfigError::Invalid(format!("Unknown param type {}", param.type_name))
        })?;
        builder = builder.array_field(&param.name, kind, param.count);
    }
    Ok(Arc::new(builder.build()))
}
