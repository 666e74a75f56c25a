// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message transports.
//!
//! A transport moves opaque byte messages between string-addressed
//! endpoints. Each process binds exactly one [`Listener`] and opens one
//! outbound [`Connection`] per peer host; messages are delivered whole and
//! in order per connection.
//!
//! | Transport | Addresses | Use |
//! |-----------|-----------|-----|
//! | [`TcpTransport`] | `tcp://host:port`, `host:port` | between processes |
//! | [`MemoryTransport`] | any string | tests, single-process simulations |

pub mod frame;
mod memory;
mod tcp;

pub use memory::MemoryTransport;
pub use tcp::{TcpOptions, TcpTransport};

use std::time::Duration;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Cannot bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Address {0} is already bound")]
    AddressInUse(String),

    #[error("Unable to connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("Error sending to {address}: {source}")]
    Send {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Endpoint closed")]
    Closed,
}

/// Factory for endpoints.
pub trait Transport: Send + Sync {
    /// Bind the local receiving endpoint.
    fn bind(&self, address: &str) -> Result<Box<dyn Listener>, TransportError>;

    /// Open an outbound connection to a peer endpoint.
    fn connect(&self, address: &str) -> Result<Box<dyn Connection>, TransportError>;
}

/// Receiving side of an endpoint.
pub trait Listener: Send {
    /// Address this listener was bound with.
    fn address(&self) -> &str;

    /// Block until a message arrives.
    fn recv(&self) -> Result<Vec<u8>, TransportError>;

    /// Block up to `timeout`; `Ok(None)` when nothing arrived.
    fn recv_timeout(&self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError>;

    /// Return a pending message without blocking.
    fn try_recv(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Stop receiving and release the address.
    fn shutdown(&self);
}

/// Sending side of a connection to one peer.
pub trait Connection: Send + Sync {
    /// Peer address.
    fn address(&self) -> &str;

    /// Send one whole message.
    fn send(&self, message: &[u8]) -> Result<(), TransportError>;

    /// Close the connection.
    fn shutdown(&self);
}
