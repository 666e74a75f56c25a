// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capsule deployment node.
//!
//! Runs one host of a distributed capsule deployment over TCP. The node file
//! declares the signals and the static slot tree; the deployment plan decides
//! which slots run here.
//!
//! # Example
//!
//! ```rust,no_run
//! use capsule_rts_node::NodeConfig;
//!
//! let config = NodeConfig::from_file("node.toml").unwrap();
//! let registry = config.build_registry().unwrap();
//! let slots = config.build_slots();
//! ```

pub mod behavior;
pub mod config;
pub mod shutdown;

pub use behavior::LoggingBehavior;
pub use shutdown::install_abort_handler;
pub use config::{ConfigError, NodeConfig, ParamConfig, PortConfig, ProtocolConfig, SignalConfig, SlotConfig};
