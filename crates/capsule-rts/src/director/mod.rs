// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution Director: places slots, runs the handshake and pumps signals
//! between hosts.

#[allow(clippy::module_inception)]
mod director;
mod handle;

pub use director::ExecutionDirector;
pub use handle::DirectorHandle;

use crate::communicator::CommunicatorError;
use crate::deployment::DeploymentError;
use crate::signal::SignalError;
use thiserror::Error;

/// Name of the controller that takes unmapped slots in a local run.
pub const DEFAULT_CONTROLLER: &str = "DefaultController";

/// Execution Director errors.
#[derive(Debug, Error)]
pub enum DirectorError {
    #[error(transparent)]
    Communicator(#[from] CommunicatorError),

    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error("Local host with address '{0}' not found in deployment plan")]
    LocalHostNotFound(String),

    #[error("Missing host for controller {0}")]
    MissingHost(String),

    #[error("Remote slot {0} has no host")]
    NoSlotHost(String),

    #[error("Invalid {role} slot {slot}")]
    UnknownSlot { role: &'static str, slot: String },

    #[error("No capsule in slot {0}")]
    NoCapsule(String),

    #[error("No controller for capsule {0}")]
    NoController(String),

    #[error("Slot {slot} has no port {index} (internal: {internal})")]
    UnknownPort {
        slot: String,
        index: usize,
        internal: bool,
    },

    #[error("Error delivering signal {signal} to controller {controller}")]
    DeliveryFailed { signal: String, controller: String },

    #[error("Destination slot {0} is remote but no communicator instance found")]
    NoCommunicator(String),

    #[error("Execution director is already running")]
    AlreadyRunning,

    #[error("Cannot start execution director thread: {0}")]
    Spawn(String),

    #[error("Execution director thread panicked")]
    Panicked,
}

impl DirectorError {
    /// Topology, transport and bootstrap failures stop the process.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Communicator(e) => e.is_fatal(),
            Self::Deployment(e) => e.is_fatal(),
            Self::Signal(e) => e.is_fatal(),
            Self::AlreadyRunning => false,
            _ => true,
        }
    }
}
