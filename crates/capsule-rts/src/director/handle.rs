// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::communicator::{OutboundMessage, WireMessage};
use crate::director::director::DirectorInner;
use crate::director::DirectorError;
use crate::signal::{CommsPort, Signal, SignalError};
use std::sync::Arc;

/// Cloneable entry point for capsule and controller code.
#[derive(Clone)]
pub struct DirectorHandle {
    pub(crate) inner: Arc<DirectorInner>,
}

impl DirectorHandle {
    /// Queue `signal` for a port in a remote slot.
    ///
    /// The destination host is the one owning `dest_port`'s slot. Fails
    /// with [`DirectorError::NoCommunicator`] before the director has bound
    /// its endpoint.
    pub fn send_signal(
        &self,
        dest_port: &CommsPort,
        signal: &Signal,
        src_port_index: usize,
    ) -> Result<(), DirectorError> {
        let Some(outbound) = self.inner.outbound.read().clone() else {
            log::error!(
                "[ExecutionDirector] destination slot {} is remote but no communicator instance found",
                dest_port.slot
            );
            return Err(DirectorError::NoCommunicator(dest_port.slot.clone()));
        };

        let slot = self
            .inner
            .map
            .get_slot(&dest_port.slot)
            .ok_or_else(|| DirectorError::UnknownSlot {
                role: "destination",
                slot: dest_port.slot.clone(),
            })?;
        let dest_host = slot
            .host()
            .ok_or_else(|| DirectorError::NoSlotHost(dest_port.slot.clone()))?;

        let src_port = signal
            .src_port()
            .ok_or_else(|| SignalError::NoSourcePort(signal.name().to_string()))?;
        let payload = self.inner.registry.to_json(signal)?;

        let message = WireMessage::between(dest_port, src_port, src_port_index, signal.name(), payload);
        log::debug!("[ExecutionDirector] queue {} for {}", message, dest_host.name());
        outbound
            .send(OutboundMessage { dest_host, message })
            .map_err(|_| DirectorError::NoCommunicator(dest_port.slot.clone()))
    }

    /// Stop the pump after its current iteration and ask every controller
    /// to abort.
    pub fn abort(&self) {
        self.inner.request_abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.is_aborted()
    }
}

impl std::fmt::Debug for DirectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorHandle")
            .field("aborted", &self.is_aborted())
            .field("communicator", &self.inner.outbound.read().is_some())
            .finish()
    }
}
