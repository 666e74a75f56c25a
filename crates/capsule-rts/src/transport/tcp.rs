// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TCP transport.
//!
//! The listener accepts any number of peers; one reader thread per accepted
//! stream pushes whole frames into a shared channel. Outbound connections
//! are established lazily on first send and retried until
//! [`TcpOptions::connect_timeout`] expires, so a parent may address a child
//! that has not bound yet.

use crate::transport::frame::{self, DEFAULT_MAX_MESSAGE_SIZE};
use crate::transport::{Connection, Listener, Transport, TransportError};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Accept loop polling interval.
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Delay between connection attempts.
const CONNECT_RETRY: Duration = Duration::from_millis(20);

/// TCP transport options.
#[derive(Debug, Clone)]
pub struct TcpOptions {
    /// How long a send keeps retrying to reach an unbound peer.
    pub connect_timeout: Duration,
    /// Largest accepted frame payload.
    pub max_message_size: usize,
    /// Disable Nagle's algorithm on outbound streams.
    pub nodelay: bool,
    /// Listen backlog.
    pub backlog: i32,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            nodelay: true,
            backlog: 128,
        }
    }
}

/// TCP transport.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    options: TcpOptions,
}

impl TcpTransport {
    pub fn new(options: TcpOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TcpOptions {
        &self.options
    }
}

/// Resolve `tcp://host:port` or `host:port`. A `*` host binds all interfaces.
pub(crate) fn resolve(address: &str) -> Result<SocketAddr, TransportError> {
    let stripped = address.strip_prefix("tcp://").unwrap_or(address);
    let target = match stripped.strip_prefix("*:") {
        Some(port) => format!("0.0.0.0:{}", port),
        None => stripped.to_string(),
    };
    target
        .to_socket_addrs()
        .map_err(|_| TransportError::InvalidAddress(address.to_string()))?
        .next()
        .ok_or_else(|| TransportError::InvalidAddress(address.to_string()))
}

fn bind_socket(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    let listener: TcpListener = socket.into();
    listener.set_nonblocking(true)?;
    Ok(listener)
}

impl Transport for TcpTransport {
    fn bind(&self, address: &str) -> Result<Box<dyn Listener>, TransportError> {
        Ok(Box::new(self.bind_endpoint(address)?))
    }

    fn connect(&self, address: &str) -> Result<Box<dyn Connection>, TransportError> {
        let addr = resolve(address)?;
        Ok(Box::new(TcpConnection {
            address: address.to_string(),
            addr,
            options: self.options.clone(),
            stream: Mutex::new(None),
            closed: AtomicBool::new(false),
        }))
    }
}

impl TcpTransport {
    fn bind_endpoint(&self, address: &str) -> Result<TcpListenerEndpoint, TransportError> {
        let addr = resolve(address)?;
        let listener = bind_socket(addr, self.options.backlog).map_err(|source| {
            TransportError::Bind {
                address: address.to_string(),
                source,
            }
        })?;

        let (tx, rx) = channel::unbounded();
        let shared = Arc::new(ListenerShared {
            closed: AtomicBool::new(false),
            next_stream: AtomicU64::new(0),
            streams: Mutex::new(HashMap::new()),
        });

        let accept_shared = Arc::clone(&shared);
        let max_size = self.options.max_message_size;
        let label = address.to_string();
        thread::Builder::new()
            .name("capsule-tcp-accept".to_string())
            .spawn(move || accept_loop(listener, tx, accept_shared, max_size, label))
            .map_err(|source| TransportError::Bind {
                address: address.to_string(),
                source,
            })?;

        log::debug!("[TcpTransport] listening on {} ({})", address, addr);
        Ok(TcpListenerEndpoint {
            address: address.to_string(),
            rx,
            shared,
        })
    }
}

struct ListenerShared {
    closed: AtomicBool,
    next_stream: AtomicU64,
    /// Accepted streams still served by a reader, kept for shutdown.
    streams: Mutex<HashMap<u64, TcpStream>>,
}

impl ListenerShared {
    #[cfg(test)]
    fn open_streams(&self) -> usize {
        self.streams.lock().len()
    }
}

fn accept_loop(
    listener: TcpListener,
    tx: Sender<Vec<u8>>,
    shared: Arc<ListenerShared>,
    max_size: usize,
    label: String,
) {
    while !shared.closed.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = spawn_reader(stream, peer, tx.clone(), &shared, max_size) {
                    log::warn!("[TcpTransport] {}: cannot serve {}: {}", label, peer, e);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                log::warn!("[TcpTransport] {}: accept failed: {}", label, e);
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
    log::debug!("[TcpTransport] {}: accept loop stopped", label);
}

fn spawn_reader(
    stream: TcpStream,
    peer: SocketAddr,
    tx: Sender<Vec<u8>>,
    shared: &Arc<ListenerShared>,
    max_size: usize,
) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    let id = shared.next_stream.fetch_add(1, Ordering::Relaxed);
    shared.streams.lock().insert(id, stream.try_clone()?);
    let reader_shared = Arc::clone(shared);
    thread::Builder::new()
        .name("capsule-tcp-reader".to_string())
        .spawn(move || {
            let mut stream = stream;
            loop {
                match frame::read_frame(&mut stream, max_size) {
                    Ok(Some(payload)) => {
                        if tx.send(payload).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        if !reader_shared.closed.load(Ordering::Acquire) {
                            log::warn!("[TcpTransport] read from {} failed: {}", peer, e);
                        }
                        break;
                    }
                }
            }
            reader_shared.streams.lock().remove(&id);
            log::debug!("[TcpTransport] peer {} disconnected", peer);
        })
        .map_err(|e| {
            shared.streams.lock().remove(&id);
            e
        })?;
    Ok(())
}

struct TcpListenerEndpoint {
    address: String,
    rx: Receiver<Vec<u8>>,
    shared: Arc<ListenerShared>,
}

impl TcpListenerEndpoint {
    fn check_open(&self) -> Result<(), TransportError> {
        if self.shared.closed.load(Ordering::Acquire) {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Listener for TcpListenerEndpoint {
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
            // The accept loop holds a sender until shutdown.
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn shutdown(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for (_, stream) in self.shared.streams.lock().drain() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        log::debug!("[TcpTransport] {} shut down", self.address);
    }
}

impl Drop for TcpListenerEndpoint {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct TcpConnection {
    address: String,
    addr: SocketAddr,
    options: TcpOptions,
    stream: Mutex<Option<TcpStream>>,
    closed: AtomicBool,
}

impl TcpConnection {
    fn establish(&self) -> Result<TcpStream, TransportError> {
        let deadline = Instant::now() + self.options.connect_timeout;
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(TransportError::Closed);
            }
            match TcpStream::connect(self.addr) {
                Ok(stream) => {
                    if self.options.nodelay {
                        let _ = stream.set_nodelay(true);
                    }
                    log::debug!("[TcpTransport] connected to {}", self.address);
                    return Ok(stream);
                }
                Err(e) if Instant::now() >= deadline => {
                    return Err(TransportError::Connect {
                        address: self.address.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(_) => thread::sleep(CONNECT_RETRY),
            }
        }
    }
}

impl Connection for TcpConnection {
    fn address(&self) -> &str {
        &self.address
    }

    fn send(&self, message: &[u8]) -> Result<(), TransportError> {
        let frame = frame::encode(message, self.options.max_message_size)?;
        let mut guard = self.stream.lock();
        if guard.is_none() {
            // Connecting may retry for the whole connect timeout.
            drop(guard);
            let stream = self.establish()?;
            guard = self.stream.lock();
            if guard.is_none() {
                *guard = Some(stream);
            }
        }
        let stream = guard.as_mut().ok_or(TransportError::Closed)?;
        let result = stream.write_all(&frame).and_then(|()| stream.flush());
        if let Err(source) = result {
            // Reconnect on the next send.
            *guard = None;
            return Err(TransportError::Send {
                address: self.address.clone(),
                source,
            });
        }
        Ok(())
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(stream) = self.stream.lock().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
