// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution Director main loop.
//!
//! # Distributed run
//!
//! 1. Bind the communicator; without a loaded plan, wait for a parent to
//!    send one.
//! 2. Find the local host by bind address and place every slot: mapped
//!    slots on this host get their controller, mapped slots elsewhere are
//!    marked remote.
//! 3. Handshake across every parent/child edge of the slot tree:
//!    deployment + ready per remote child, ready to the parent, wait for
//!    go, go to each child.
//! 4. Connect to every remote slot's host, spawn controllers and pump
//!    until aborted.
//!
//! Without a local address every slot runs in this process.

use crate::communicator::{Communicator, CommunicatorError, OutboundMessage, WireMessage};
use crate::config::RuntimeConfig;
use crate::deployment::{Controller, ControllerFactory, DeploymentMap, Host, Slot};
use crate::director::{DirectorError, DirectorHandle, DEFAULT_CONTROLLER};
use crate::signal::SignalRegistry;
use crate::transport::Transport;
use crossbeam::channel::Sender;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub(crate) struct DirectorInner {
    pub(crate) map: Arc<DeploymentMap>,
    pub(crate) registry: Arc<SignalRegistry>,
    transport: Arc<dyn Transport>,
    config: RuntimeConfig,
    factory: Arc<dyn ControllerFactory>,
    abort: Arc<AtomicBool>,
    pub(crate) outbound: RwLock<Option<Sender<OutboundMessage>>>,
}

/// Drives one process of a deployment.
pub struct ExecutionDirector {
    inner: Arc<DirectorInner>,
    thread: Mutex<Option<JoinHandle<Result<(), DirectorError>>>>,
}

impl ExecutionDirector {
    pub fn new(
        map: Arc<DeploymentMap>,
        registry: Arc<SignalRegistry>,
        transport: Arc<dyn Transport>,
        config: RuntimeConfig,
        factory: Arc<dyn ControllerFactory>,
    ) -> Self {
        Self {
            inner: Arc::new(DirectorInner {
                map,
                registry,
                transport,
                config,
                factory,
                abort: Arc::new(AtomicBool::new(false)),
                outbound: RwLock::new(None),
            }),
            thread: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> DirectorHandle {
        DirectorHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn map(&self) -> &Arc<DeploymentMap> {
        &self.inner.map
    }

    pub fn registry(&self) -> &Arc<SignalRegistry> {
        &self.inner.registry
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Run on the calling thread until aborted or a fatal error.
    pub fn run(&self) -> Result<(), DirectorError> {
        self.inner.run()
    }

    /// Run on a thread named `ExecutionDirector`.
    pub fn spawn(&self) -> Result<(), DirectorError> {
        let mut thread = self.thread.lock();
        if thread.is_some() {
            return Err(DirectorError::AlreadyRunning);
        }
        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name("ExecutionDirector".to_string())
            .spawn(move || {
                let result = inner.run();
                if let Err(e) = &result {
                    log::error!("[ExecutionDirector] {}", e);
                }
                result
            })
            .map_err(|e| DirectorError::Spawn(e.to_string()))?;
        *thread = Some(handle);
        Ok(())
    }

    /// Wait for the spawned run and return its outcome.
    pub fn join(&self) -> Result<(), DirectorError> {
        let handle = self.thread.lock().take();
        match handle {
            Some(handle) => handle.join().map_err(|_| DirectorError::Panicked)?,
            None => Ok(()),
        }
    }

    pub fn abort(&self) {
        self.inner.request_abort();
    }
}

impl std::fmt::Debug for ExecutionDirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionDirector")
            .field("local_address", &self.inner.config.local_address)
            .field("running", &self.thread.lock().is_some())
            .field("aborted", &self.inner.is_aborted())
            .finish()
    }
}

impl DirectorInner {
    pub(crate) fn request_abort(&self) {
        self.abort.store(true, Ordering::Release);
        self.map.enqueue_abort_all_controllers();
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    fn run(&self) -> Result<(), DirectorError> {
        if let Some(path) = &self.config.plan_path {
            if !self.map.is_loaded() {
                self.map.from_file(path)?;
            }
        }

        match self.config.local_address.clone() {
            None => self.run_local(),
            Some(address) => {
                let result = self.run_distributed(&address);
                self.outbound.write().take();
                match result {
                    Err(DirectorError::Communicator(CommunicatorError::Aborted))
                        if self.is_aborted() =>
                    {
                        log::info!("[ExecutionDirector] aborted during handshake");
                        Ok(())
                    }
                    other => other,
                }
            }
        }
    }

    /// Registered controller `name`, created through the factory if absent.
    fn controller_named(&self, name: &str) -> Result<Arc<dyn Controller>, DirectorError> {
        if let Some(controller) = self.map.get_controller(name) {
            return Ok(controller);
        }
        let controller = self.factory.create(name);
        self.map.add_controller(Arc::clone(&controller))?;
        Ok(controller)
    }

    fn initialize(&self, slot: &Slot, controller: &Arc<dyn Controller>) -> Result<(), DirectorError> {
        let capsule = slot
            .capsule()
            .ok_or_else(|| DirectorError::NoCapsule(slot.name().to_string()))?;
        if !controller.initialize_capsule(&capsule) {
            return Err(DirectorError::DeliveryFailed {
                signal: crate::signal::INITIALIZE_SIGNAL.to_string(),
                controller: controller.name().to_string(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Local run
    // ========================================================================

    fn run_local(&self) -> Result<(), DirectorError> {
        log::info!("[ExecutionDirector] local run");
        let slots = self.map.get_default_slot_list();

        for slot in &slots {
            let capsule = slot.instantiate();
            self.map.add_capsule(capsule);

            let controller = match self.map.get_controller_name_for_capsule(slot.name()) {
                Some(name) => self.controller_named(&name)?,
                None => self.controller_named(DEFAULT_CONTROLLER)?,
            };
            slot.set_controller(controller);
        }

        for slot in &slots {
            let controller = slot
                .controller()
                .ok_or_else(|| DirectorError::NoController(slot.name().to_string()))?;
            self.initialize(slot, &controller)?;
        }

        self.map.spawn_all_controllers()?;
        self.map.join_all_controllers();
        Ok(())
    }

    // ========================================================================
    // Distributed run
    // ========================================================================

    fn run_distributed(&self, address: &str) -> Result<(), DirectorError> {
        let mut communicator = Communicator::new(
            Arc::clone(&self.transport),
            address,
            Arc::clone(&self.map),
            self.config.clone(),
        )?
        .with_abort_flag(Arc::clone(&self.abort));
        *self.outbound.write() = Some(communicator.outbound());

        if !self.map.is_loaded() {
            let parent = communicator.wait_for_deployment()?;
            // The parent already holds the plan.
            if let Some(host) = self.map.get_host(&parent) {
                host.mark_deployed();
            }
        }

        let local = self.map.get_host_from_address(address).ok_or_else(|| {
            log::error!(
                "[ExecutionDirector] local host with address '{}' not found in deployment plan",
                address
            );
            DirectorError::LocalHostNotFound(address.to_string())
        })?;
        communicator.set_local_host(Arc::clone(&local));
        log::info!("[ExecutionDirector] running as host {} @ {}", local.name(), address);

        let slots = self.map.get_default_slot_list();
        self.deploy(&slots, &local)?;
        self.handshake(&communicator, &slots)?;

        for slot in slots.iter().filter(|s| s.is_remote()) {
            let host = self.remote_host(slot)?;
            communicator.connect(&host)?;
        }

        self.map.spawn_all_controllers()?;
        let result = self.pump(&communicator);
        self.map.join_all_controllers();
        communicator.shutdown();
        result
    }

    /// Instantiate every slot and place mapped slots on their host.
    /// `INITIALIZE` goes to local slots only.
    fn deploy(&self, slots: &[Arc<Slot>], local: &Host) -> Result<(), DirectorError> {
        for slot in slots {
            let capsule = slot.instantiate();
            self.map.add_capsule(capsule);

            let Some(controller_name) = self.map.get_controller_name_for_capsule(slot.name()) else {
                continue;
            };
            let host = self
                .map
                .get_host_for_controller(&controller_name)
                .ok_or_else(|| {
                    log::error!("[ExecutionDirector] missing host for controller {}", controller_name);
                    DirectorError::MissingHost(controller_name.clone())
                })?;

            if host.name() == local.name() {
                slot.set_controller(self.controller_named(&controller_name)?);
                slot.set_local(host);
            } else {
                log::debug!("[ExecutionDirector] slot {} is remote on {}", slot.name(), host.name());
                slot.set_remote(host);
            }
        }

        for slot in slots.iter().filter(|s| !s.is_remote()) {
            if let Some(controller) = slot.controller() {
                self.initialize(slot, &controller)?;
            }
        }
        Ok(())
    }

    fn remote_host(&self, slot: &Slot) -> Result<Arc<Host>, DirectorError> {
        slot.host()
            .ok_or_else(|| DirectorError::NoSlotHost(slot.name().to_string()))
    }

    fn children(&self, slot: &Slot) -> Result<Vec<Arc<Slot>>, DirectorError> {
        slot.child_slot_names()
            .map(|name| {
                self.map.get_slot(name).ok_or_else(|| DirectorError::UnknownSlot {
                    role: "child",
                    slot: name.to_string(),
                })
            })
            .collect()
    }

    fn handshake(&self, communicator: &Communicator, slots: &[Arc<Slot>]) -> Result<(), DirectorError> {
        // Deployment to remote children, one ready at a time.
        for slot in slots.iter().filter(|s| !s.is_remote()) {
            for child in self.children(slot)?.iter().filter(|c| c.is_remote()) {
                let host = self.remote_host(child)?;
                communicator.connect(&host)?;
                if !host.is_deployed() {
                    communicator.send_deployment(&host)?;
                    communicator.wait_for_ready_signal(&host)?;
                }
            }
        }

        // Ready to the parent of every local child.
        let mut parents = Vec::new();
        for slot in slots.iter().filter(|s| s.is_remote()) {
            if self.children(slot)?.iter().any(|c| !c.is_remote()) {
                let parent = self.remote_host(slot)?;
                communicator.connect(&parent)?;
                if !parent.is_signaled() {
                    communicator.send_ready_signal(&parent)?;
                }
                parents.push(parent);
            }
        }

        for parent in &parents {
            communicator.wait_for_go_signal(parent)?;
        }

        for slot in slots.iter().filter(|s| !s.is_remote()) {
            for child in self.children(slot)?.iter().filter(|c| c.is_remote()) {
                let host = self.remote_host(child)?;
                if !host.is_go_signaled() {
                    communicator.send_go_signal(&host)?;
                }
            }
        }
        Ok(())
    }

    fn pump(&self, communicator: &Communicator) -> Result<(), DirectorError> {
        let idle = self.config.poll_interval();
        log::info!("[ExecutionDirector] entering message pump");
        while !communicator.is_aborted() {
            match communicator.send_recv()? {
                Some(message) => self.dispatch(&message)?,
                None => thread::sleep(idle),
            }
        }
        log::info!("[ExecutionDirector] message pump stopped");
        Ok(())
    }

    /// Deliver one inbound message to its destination controller.
    fn dispatch(&self, message: &WireMessage) -> Result<(), DirectorError> {
        let dest_slot = self.map.get_slot(&message.dest_slot).ok_or_else(|| {
            log::error!("[ExecutionDirector] invalid destination slot {}", message.dest_slot);
            DirectorError::UnknownSlot {
                role: "destination",
                slot: message.dest_slot.clone(),
            }
        })?;
        let src_slot = self.map.get_slot(&message.src_slot).ok_or_else(|| {
            log::error!("[ExecutionDirector] invalid source slot {}", message.src_slot);
            DirectorError::UnknownSlot {
                role: "source",
                slot: message.src_slot.clone(),
            }
        })?;

        let src_capsule = src_slot
            .capsule()
            .ok_or_else(|| DirectorError::NoCapsule(message.src_slot.clone()))?;
        let src_port = src_capsule
            .port(message.src_port, message.src_internal)
            .cloned()
            .ok_or_else(|| DirectorError::UnknownPort {
                slot: message.src_slot.clone(),
                index: message.src_port,
                internal: message.src_internal,
            })?;

        let signal = match self.registry.from_json(&message.payload, &src_port) {
            Ok(signal) => signal,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                log::warn!("[ExecutionDirector] dropping {}: {}", message, e);
                return Ok(());
            }
        };

        let dest_capsule = dest_slot.capsule().ok_or_else(|| {
            log::error!("[ExecutionDirector] no capsule in destination slot {}", message.dest_slot);
            DirectorError::NoCapsule(message.dest_slot.clone())
        })?;
        let controller = dest_slot.controller().ok_or_else(|| {
            log::error!("[ExecutionDirector] no controller for capsule {}", dest_capsule.name());
            DirectorError::NoController(dest_capsule.name().to_string())
        })?;
        let dest_port = dest_capsule
            .port(message.dest_port, message.dest_internal)
            .cloned()
            .ok_or_else(|| DirectorError::UnknownPort {
                slot: message.dest_slot.clone(),
                index: message.dest_port,
                internal: message.dest_internal,
            })?;

        log::debug!("[ExecutionDirector] deliver {} to {}", signal, dest_port);
        if !controller.deliver(&dest_capsule, &dest_port, signal) {
            if self.is_aborted() {
                return Ok(());
            }
            log::error!("[ExecutionDirector] error delivering signal to controller");
            return Err(DirectorError::DeliveryFailed {
                signal: message.signal_name.clone(),
                controller: controller.name().to_string(),
            });
        }
        Ok(())
    }
}
