// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Inter-host communicator.
//!
//! Owns the single local listener of the process and drives both the
//! bootstrap handshake (deployment → ready → go) and the steady-state pump.
//!
//! ```text
//!   parent                          child
//!     | connect                       |
//!     |-- deployment --------------->| decode plan
//!     |                               | connect back
//!     |<------------------- ready ----|
//!     |-- go ----------------------->|
//!     |<======= wire messages ======>|
//! ```
//!
//! Handshake receives block at most `handshake_timeout` per message.

use crate::communicator::{CommunicatorError, Envelope, OutboundMessage, WireMessage};
use crate::config::RuntimeConfig;
use crate::deployment::{DeploymentMap, Host};
use crate::transport::{Listener, Transport};
use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Receive slice while waiting on a handshake, so an abort is noticed.
const HANDSHAKE_SLICE: Duration = Duration::from_millis(50);

/// Handshake and message pump for one process.
pub struct Communicator {
    transport: Arc<dyn Transport>,
    listener: Box<dyn Listener>,
    map: Arc<DeploymentMap>,
    config: RuntimeConfig,
    local_host: Option<Arc<Host>>,
    outbound_tx: Sender<OutboundMessage>,
    outbound_rx: Receiver<OutboundMessage>,
    abort: Arc<AtomicBool>,
    sent: AtomicU64,
    received: AtomicU64,
    dropped: AtomicU64,
}

impl Communicator {
    /// Bind the local endpoint.
    pub fn new(
        transport: Arc<dyn Transport>,
        local_address: &str,
        map: Arc<DeploymentMap>,
        config: RuntimeConfig,
    ) -> Result<Self, CommunicatorError> {
        let listener = transport.bind(local_address).map_err(|source| {
            log::error!("[Communicator] cannot bind to address {}", local_address);
            CommunicatorError::Bind {
                address: local_address.to_string(),
                source,
            }
        })?;
        log::info!("[Communicator] bound to {}", local_address);

        let (outbound_tx, outbound_rx) = channel::unbounded();
        Ok(Self {
            transport,
            listener,
            map,
            config,
            local_host: None,
            outbound_tx,
            outbound_rx,
            abort: Arc::new(AtomicBool::new(false)),
            sent: AtomicU64::new(0),
            received: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    /// Share an externally owned abort flag.
    pub fn with_abort_flag(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = abort;
        self
    }

    pub fn local_address(&self) -> &str {
        self.listener.address()
    }

    pub fn set_local_host(&mut self, host: Arc<Host>) {
        host.mark_local();
        log::debug!("[Communicator] local host is {}", host.name());
        self.local_host = Some(host);
    }

    pub fn local_host(&self) -> Result<&Arc<Host>, CommunicatorError> {
        self.local_host.as_ref().ok_or(CommunicatorError::NoLocalHost)
    }

    // ========================================================================
    // Connections
    // ========================================================================

    /// Open the outbound connection to `host`; no-op when already connected.
    pub fn connect(&self, host: &Host) -> Result<(), CommunicatorError> {
        if host.is_connected() {
            return Ok(());
        }
        let connection = self.transport.connect(host.address()).map_err(|source| {
            log::error!("[Communicator] unable to connect to host @ {}", host.address());
            CommunicatorError::Connect {
                host: host.name().to_string(),
                source,
            }
        })?;
        host.attach(connection);
        log::debug!("[Communicator] connected to {} @ {}", host.name(), host.address());
        Ok(())
    }

    pub fn disconnect(&self, host: &Host) {
        host.detach();
        log::debug!("[Communicator] disconnected from {}", host.name());
    }

    fn send_bytes(&self, host: &Host, bytes: &[u8], what: &str) -> Result<(), CommunicatorError> {
        host.send(bytes).map_err(|source| {
            log::error!("[Communicator] error sending {} to host {}", what, host.name());
            CommunicatorError::Send {
                host: host.name().to_string(),
                source,
            }
        })
    }

    fn send_envelope(&self, host: &Host, envelope: &Envelope) -> Result<(), CommunicatorError> {
        let bytes = envelope.to_bytes().map_err(CommunicatorError::Encode)?;
        self.send_bytes(host, &bytes, envelope.phase())?;
        log::debug!("[Communicator] sent {}", envelope);
        Ok(())
    }

    /// Block for the next handshake envelope.
    fn receive_envelope(&self, phase: &'static str) -> Result<Envelope, CommunicatorError> {
        let deadline = self.config.handshake_timeout().map(|t| Instant::now() + t);
        loop {
            if self.is_aborted() {
                return Err(CommunicatorError::Aborted);
            }
            let slice = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        log::error!("[Communicator] timed out waiting for {}", phase);
                        return Err(CommunicatorError::HandshakeTimeout {
                            phase,
                            timeout: self.config.handshake_timeout().unwrap_or_default(),
                        });
                    }
                    left.min(HANDSHAKE_SLICE)
                }
                None => HANDSHAKE_SLICE,
            };

            let received = self.listener.recv_timeout(slice).map_err(|source| {
                log::error!("[Communicator] error receiving {}", phase);
                CommunicatorError::Receive { phase, source }
            })?;
            if let Some(bytes) = received {
                return Envelope::from_slice(&bytes).map_err(|e| {
                    log::error!("[Communicator] unexpected message received while waiting for {}", phase);
                    CommunicatorError::UnexpectedMessage {
                        phase,
                        detail: e.to_string(),
                    }
                });
            }
        }
    }

    fn unexpected(phase: &'static str, envelope: &Envelope) -> CommunicatorError {
        log::error!("[Communicator] unexpected message received: {}", envelope);
        CommunicatorError::UnexpectedMessage {
            phase,
            detail: envelope.to_string(),
        }
    }

    // ========================================================================
    // Bootstrap handshake
    // ========================================================================

    /// Forward the loaded plan to a child host.
    pub fn send_deployment(&self, host: &Host) -> Result<(), CommunicatorError> {
        let plan = self.map.encode()?;
        let envelope = Envelope::deployment(self.local_host()?.name(), host.name(), plan);
        self.send_envelope(host, &envelope)?;
        host.mark_deployed();
        Ok(())
    }

    /// Block until a parent sends the plan, decode it into the map and
    /// return the sender's host name.
    pub fn wait_for_deployment(&self) -> Result<String, CommunicatorError> {
        match self.receive_envelope("deployment")? {
            Envelope::Deployment { sender, plan, .. } => {
                self.map.decode(&plan)?;
                log::info!("[Communicator] got deployment from {}", sender);
                Ok(sender)
            }
            other => Err(Self::unexpected("deployment", &other)),
        }
    }

    pub fn send_ready_signal(&self, host: &Host) -> Result<(), CommunicatorError> {
        let envelope = Envelope::ready(self.local_host()?.name(), host.name());
        self.send_envelope(host, &envelope)?;
        host.mark_signaled();
        Ok(())
    }

    /// Block until `host` acknowledges its deployment.
    pub fn wait_for_ready_signal(&self, host: &Host) -> Result<(), CommunicatorError> {
        if host.got_ack() {
            return Ok(());
        }
        match self.receive_envelope("ready")? {
            Envelope::Ready { sender, .. } if sender == host.name() => {
                host.mark_got_ack();
                log::debug!("[Communicator] got ready signal from {}", sender);
                Ok(())
            }
            other => Err(Self::unexpected("ready", &other)),
        }
    }

    pub fn send_go_signal(&self, host: &Host) -> Result<(), CommunicatorError> {
        let envelope = Envelope::go(self.local_host()?.name(), host.name());
        self.send_envelope(host, &envelope)?;
        host.mark_go_signaled();
        Ok(())
    }

    /// Block until the parent `host` releases this process.
    pub fn wait_for_go_signal(&self, host: &Host) -> Result<(), CommunicatorError> {
        if host.got_go() {
            return Ok(());
        }
        match self.receive_envelope("go")? {
            Envelope::Go { sender, .. } if sender == host.name() => {
                host.mark_got_go();
                log::debug!("[Communicator] got go signal from {}", sender);
                Ok(())
            }
            other => Err(Self::unexpected("go", &other)),
        }
    }

    // ========================================================================
    // Steady state
    // ========================================================================

    pub fn queue_message(&self, message: OutboundMessage) {
        // The receiver lives in `self`, so the channel cannot be disconnected.
        let _ = self.outbound_tx.send(message);
    }

    /// Producer side of the outbound queue.
    pub fn outbound(&self) -> Sender<OutboundMessage> {
        self.outbound_tx.clone()
    }

    /// One pump iteration: send at most one queued message, then try to
    /// receive one. Malformed inbound messages are logged and dropped.
    pub fn send_recv(&self) -> Result<Option<WireMessage>, CommunicatorError> {
        match self.outbound_rx.try_recv() {
            Ok(outbound) => {
                self.connect(&outbound.dest_host)?;
                let bytes = outbound
                    .message
                    .to_bytes()
                    .map_err(CommunicatorError::Encode)?;
                self.send_bytes(&outbound.dest_host, &bytes, "message")?;
                self.sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
        }

        let bytes = match self.listener.try_recv() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(source) => {
                return Err(CommunicatorError::Receive {
                    phase: "message",
                    source,
                })
            }
        };

        match WireMessage::from_slice(&bytes) {
            Ok(message) => {
                self.received.fetch_add(1, Ordering::Relaxed);
                Ok(Some(message))
            }
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("[Communicator] dropping inbound message: {}", e);
                Ok(None)
            }
        }
    }

    pub fn abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Inbound messages discarded as malformed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Close the listener and every outbound connection.
    pub fn shutdown(&self) {
        self.listener.shutdown();
        for host in self.map.hosts() {
            if host.is_connected() {
                self.disconnect(&host);
            }
        }
    }
}

impl Drop for Communicator {
    fn drop(&mut self) {
        self.listener.shutdown();
    }
}
