// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport.
//!
//! Every address maps to one mailbox in a shared hub. Mailboxes are created
//! by whichever side shows up first, so a peer may connect and send before
//! the receiver binds.

use crate::transport::{Connection, Listener, Transport, TransportError};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Hub {
    mailboxes: Mutex<HashMap<String, (Sender<Vec<u8>>, Receiver<Vec<u8>>)>>,
    bound: Mutex<HashSet<String>>,
}

impl Hub {
    fn mailbox(&self, address: &str) -> (Sender<Vec<u8>>, Receiver<Vec<u8>>) {
        self.mailboxes
            .lock()
            .entry(address.to_string())
            .or_insert_with(channel::unbounded)
            .clone()
    }
}

/// In-process transport; clones share the same hub.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    hub: Arc<Hub>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages waiting at `address`.
    pub fn pending(&self, address: &str) -> usize {
        self.hub
            .mailboxes
            .lock()
            .get(address)
            .map_or(0, |(_, rx)| rx.len())
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("bound", &self.hub.bound.lock().len())
            .finish()
    }
}

impl Transport for MemoryTransport {
    fn bind(&self, address: &str) -> Result<Box<dyn Listener>, TransportError> {
        if !self.hub.bound.lock().insert(address.to_string()) {
            return Err(TransportError::AddressInUse(address.to_string()));
        }
        let (_, rx) = self.hub.mailbox(address);
        log::debug!("[MemoryTransport] bound {}", address);
        Ok(Box::new(MemoryListener {
            address: address.to_string(),
            rx,
            hub: Arc::clone(&self.hub),
            closed: AtomicBool::new(false),
        }))
    }

    fn connect(&self, address: &str) -> Result<Box<dyn Connection>, TransportError> {
        let (tx, _) = self.hub.mailbox(address);
        Ok(Box::new(MemoryConnection {
            address: address.to_string(),
            tx: Mutex::new(Some(tx)),
        }))
    }
}

struct MemoryListener {
    address: String,
    rx: Receiver<Vec<u8>>,
    hub: Arc<Hub>,
    closed: AtomicBool,
}

impl MemoryListener {
    fn check_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Listener for MemoryListener {
    fn address(&self) -> &str {
        &self.address
    }

    fn recv(&self) -> Result<Vec<u8>, TransportError> {
        self.check_open()?;
        self.rx.recv().map_err(|_| TransportError::Closed)
    }

    fn recv_timeout(&self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        self.check_open()?;
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn try_recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        self.check_open()?;
        match self.rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.hub.bound.lock().remove(&self.address);
            self.hub.mailboxes.lock().remove(&self.address);
        }
    }
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct MemoryConnection {
    address: String,
    tx: Mutex<Option<Sender<Vec<u8>>>>,
}

impl Connection for MemoryConnection {
    fn address(&self) -> &str {
        &self.address
    }

    fn send(&self, message: &[u8]) -> Result<(), TransportError> {
        let guard = self.tx.lock();
        let tx = guard.as_ref().ok_or(TransportError::Closed)?;
        tx.send(message.to_vec()).map_err(|_| TransportError::Closed)
    }

    fn shutdown(&self) {
        self.tx.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_before_bind_is_delivered() {
        let transport = MemoryTransport::new();
        let conn = transport.connect("node-b").expect("connect");
        conn.send(b"early").expect("send");
        assert_eq!(transport.pending("node-b"), 1);

        let listener = transport.bind("node-b").expect("bind");
        assert_eq!(listener.try_recv().expect("recv"), Some(b"early".to_vec()));
        assert_eq!(listener.try_recv().expect("recv"), None);
    }

    #[test]
    fn test_double_bind_rejected() {
        let transport = MemoryTransport::new();
        let _listener = transport.bind("a").expect("bind");
        assert!(matches!(
            transport.bind("a"),
            Err(TransportError::AddressInUse(_))
        ));
    }

    #[test]
    fn test_recv_timeout_and_order() {
        let transport = MemoryTransport::new();
        let listener = transport.bind("a").expect("bind");
        assert_eq!(
            listener.recv_timeout(Duration::from_millis(5)).expect("recv"),
            None
        );

        let conn = transport.connect("a").expect("connect");
        for i in 0..3u8 {
            conn.send(&[i]).expect("send");
        }
        for i in 0..3u8 {
            assert_eq!(listener.recv().expect("recv"), vec![i]);
        }
    }

    #[test]
    fn test_shutdown() {
        let transport = MemoryTransport::new();
        let listener = transport.bind("a").expect("bind");
        let conn = transport.connect("a").expect("connect");
        conn.shutdown();
        assert!(matches!(conn.send(b"x"), Err(TransportError::Closed)));

        listener.shutdown();
        assert!(matches!(listener.try_recv(), Err(TransportError::Closed)));
        assert!(transport.bind("a").is_ok());
    }
}
