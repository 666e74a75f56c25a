// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # capsule-rts - distributed deployment runtime for capsule systems
//!
//! Decides which capsule runs on which host, bootstraps every host of a
//! deployment and carries signals between them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use capsule_rts::deployment::{BasicCapsuleClass, DeploymentMap, QueueControllerFactory, Slot};
//! use capsule_rts::transport::TcpTransport;
//! use capsule_rts::{ExecutionDirector, RuntimeConfig, SignalRegistry};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let map = Arc::new(DeploymentMap::new());
//!     map.from_file("plan.json")?;
//!     map.set_default_slot_list(vec![Arc::new(Slot::new(
//!         "top",
//!         Arc::new(BasicCapsuleClass::new("Top")),
//!     ))])?;
//!
//!     let config = RuntimeConfig::default().with_local_address("tcp://127.0.0.1:7000");
//!     let director = ExecutionDirector::new(
//!         map,
//!         Arc::new(SignalRegistry::new()),
//!         Arc::new(TcpTransport::new(config.tcp_options())),
//!         config,
//!         Arc::new(QueueControllerFactory),
//!     );
//!     director.spawn()?;
//!     director.join()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |                     ExecutionDirector                         |
//! |   slot placement | 4-phase handshake | dispatch pump          |
//! +------------------------------+--------------------------------+
//! |        DeploymentMap         |          Communicator          |
//! | hosts, controllers, capsules | envelopes, outbound queue      |
//! | slots, assignments           |                                |
//! +------------------------------+--------------------------------+
//! |        SignalRegistry        |           Transport            |
//! | (protocol, signal) -> id     | TCP | in-process               |
//! +------------------------------+--------------------------------+
//! |                 dynamic (TypeDescriptor)                      |
//! |   descriptors | DynamicData | binary and JSON codecs          |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`dynamic`] - type descriptors and self-describing values
//! - [`signal`] - signals, ports and the Signal Registry
//! - [`deployment`] - hosts, controllers, capsules, slots and the Deployment Map
//! - [`transport`] - request/reply transports
//! - [`communicator`] - bootstrap handshake and message pump
//! - [`director`] - Execution Director
//! - [`config`] - runtime configuration

pub mod communicator;
pub mod config;
pub mod deployment;
pub mod director;
pub mod dynamic;
pub mod signal;
pub mod transport;

pub use communicator::{Communicator, CommunicatorError};
pub use config::{ConfigError, RuntimeConfig};
pub use deployment::{DeploymentError, DeploymentMap};
pub use director::{DirectorError, DirectorHandle, ExecutionDirector};
pub use signal::{Signal, SignalError, SignalRegistry};
pub use transport::{Transport, TransportError};
