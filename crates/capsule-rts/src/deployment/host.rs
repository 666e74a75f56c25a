// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hosts and their handshake state.

use crate::transport::{Connection, TransportError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A process endpoint reachable over the transport.
///
/// Handshake flags only ever go from `false` to `true`; the `mark_*`
/// helpers report whether the call performed that transition.
/// `connected` is the exception and is reset by [`Host::detach`].
pub struct Host {
    name: String,
    address: String,
    local: AtomicBool,
    connected: AtomicBool,
    deployed: AtomicBool,
    signaled: AtomicBool,
    go_signaled: AtomicBool,
    got_ack: AtomicBool,
    got_go: AtomicBool,
    connection: Mutex<Option<Arc<dyn Connection>>>,
}

impl Host {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            local: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            deployed: AtomicBool::new(false),
            signaled: AtomicBool::new(false),
            go_signaled: AtomicBool::new(false),
            got_ack: AtomicBool::new(false),
            got_go: AtomicBool::new(false),
            connection: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_local(&self) -> bool {
        self.local.load(Ordering::Acquire)
    }

    pub fn mark_local(&self) -> bool {
        !self.local.swap(true, Ordering::AcqRel)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Deployment plan sent to this host.
    pub fn is_deployed(&self) -> bool {
        self.deployed.load(Ordering::Acquire)
    }

    pub fn mark_deployed(&self) -> bool {
        !self.deployed.swap(true, Ordering::AcqRel)
    }

    /// Ready sent to this host.
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }

    pub fn mark_signaled(&self) -> bool {
        !self.signaled.swap(true, Ordering::AcqRel)
    }

    /// Go sent to this host.
    pub fn is_go_signaled(&self) -> bool {
        self.go_signaled.load(Ordering::Acquire)
    }

    pub fn mark_go_signaled(&self) -> bool {
        !self.go_signaled.swap(true, Ordering::AcqRel)
    }

    /// Ready received from this host.
    pub fn got_ack(&self) -> bool {
        self.got_ack.load(Ordering::Acquire)
    }

    pub fn mark_got_ack(&self) -> bool {
        !self.got_ack.swap(true, Ordering::AcqRel)
    }

    /// Go received from this host.
    pub fn got_go(&self) -> bool {
        self.got_go.load(Ordering::Acquire)
    }

    pub fn mark_got_go(&self) -> bool {
        !self.got_go.swap(true, Ordering::AcqRel)
    }

    /// Install the outbound connection and mark the host connected.
    pub fn attach(&self, connection: Box<dyn Connection>) {
        let previous = self.connection.lock().replace(Arc::from(connection));
        if let Some(old) = previous {
            old.shutdown();
        }
        self.connected.store(true, Ordering::Release);
    }

    /// Close the outbound connection, if any.
    pub fn detach(&self) {
        if let Some(conn) = self.connection.lock().take() {
            conn.shutdown();
        }
        self.connected.store(false, Ordering::Release);
    }

    /// Send one message over the outbound connection.
    ///
    /// The send runs outside the host lock; it may block while the
    /// connection is being established.
    pub fn send(&self, message: &[u8]) -> Result<(), TransportError> {
        let conn = self
            .connection
            .lock()
            .clone()
            .ok_or(TransportError::Closed)?;
        conn.send(message)
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("local", &self.is_local())
            .field("connected", &self.is_connected())
            .field("deployed", &self.is_deployed())
            .field("signaled", &self.is_signaled())
            .field("go_signaled", &self.is_go_signaled())
            .field("got_ack", &self.got_ack())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, Transport};

    #[test]
    fn test_flags_transition_once() {
        let host = Host::new("child", "mem://child");
        assert!(!host.is_deployed());
        assert!(host.mark_deployed());
        assert!(!host.mark_deployed());
        assert!(host.is_deployed());

        assert!(host.mark_signaled());
        assert!(host.mark_go_signaled());
        assert!(host.mark_got_ack());
        assert!(host.mark_got_go());
        assert!(!host.mark_got_go());
    }

    #[test]
    fn test_attach_and_send() {
        let transport = MemoryTransport::new();
        let listener = transport.bind("mem://child").expect("bind");
        let host = Host::new("child", "mem://child");

        assert!(matches!(host.send(b"x"), Err(TransportError::Closed)));

        host.attach(transport.connect(host.address()).expect("connect"));
        assert!(host.is_connected());
        host.send(b"hello").expect("send");
        assert_eq!(listener.try_recv().expect("recv"), Some(b"hello".to_vec()));

        host.detach();
        assert!(!host.is_connected());
        assert!(host.send(b"x").is_err());
    }

    /// Blocks every send until released.
    struct GatedConnection {
        entered: crossbeam::channel::Sender<()>,
        release: crossbeam::channel::Receiver<()>,
    }

    impl Connection for GatedConnection {
        fn address(&self) -> &str {
            "mem://gated"
        }

        fn send(&self, _message: &[u8]) -> Result<(), TransportError> {
            let _ = self.entered.send(());
            let _ = self.release.recv();
            Ok(())
        }

        fn shutdown(&self) {}
    }

    #[test]
    fn test_blocked_send_does_not_hold_host() {
        let (entered_tx, entered_rx) = crossbeam::channel::unbounded();
        let (release_tx, release_rx) = crossbeam::channel::unbounded();
        let host = Arc::new(Host::new("slow", "mem://gated"));
        host.attach(Box::new(GatedConnection {
            entered: entered_tx,
            release: release_rx,
        }));

        let sender = Arc::clone(&host);
        let in_flight = std::thread::spawn(move || sender.send(b"x"));
        entered_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("send started");

        // The host stays usable while the send is blocked.
        host.detach();
        assert!(!host.is_connected());

        release_tx.send(()).expect("release");
        in_flight.join().expect("join").expect("send");
    }
}
