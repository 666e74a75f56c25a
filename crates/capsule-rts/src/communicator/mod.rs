// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Inter-host communicator: bootstrap handshake and message pump.

#[allow(clippy::module_inception)]
mod communicator;
mod envelope;

pub use communicator::Communicator;
pub use envelope::{Envelope, OutboundMessage, WireMessage};

use crate::deployment::DeploymentError;
use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Communicator errors.
#[derive(Debug, Error)]
pub enum CommunicatorError {
    #[error("Cannot bind to address {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: TransportError,
    },

    #[error("Unable to connect to host {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: TransportError,
    },

    #[error("Error sending to host {host}: {source}")]
    Send {
        host: String,
        #[source]
        source: TransportError,
    },

    #[error("Error receiving {phase}: {source}")]
    Receive {
        phase: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("Timed out after {timeout:?} waiting for {phase}")]
    HandshakeTimeout {
        phase: &'static str,
        timeout: Duration,
    },

    #[error("Unexpected message received while waiting for {phase}: {detail}")]
    UnexpectedMessage { phase: &'static str, detail: String },

    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Local host not set")]
    NoLocalHost,

    #[error("Cannot encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    #[error("Aborted")]
    Aborted,
}

impl CommunicatorError {
    /// Control-channel failures stop the process; a single malformed
    /// message or an abort does not.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Malformed(_) | Self::Aborted => false,
            Self::Deployment(e) => e.is_fatal(),
            _ => true,
        }
    }
}
