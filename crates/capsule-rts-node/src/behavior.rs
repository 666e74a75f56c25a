// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capsule behaviour used by configured slots.

use capsule_rts::deployment::CapsuleBehavior;
use capsule_rts::signal::{CommsPort, Signal};

/// Logs every signal it receives and counts them.
#[derive(Debug, Default)]
pub struct LoggingBehavior {
    received: u64,
}

impl LoggingBehavior {
    pub fn received(&self) -> u64 {
        self.received
    }
}

impl CapsuleBehavior for LoggingBehavior {
    fn initialize(&mut self, capsule: &str, _signal: &Signal) {
        tracing::info!(capsule, "Capsule initialized");
    }

    fn receive(&mut self, capsule: &str, port: &CommsPort, signal: &Signal) {
        self.received += 1;
        match signal.payload() {
            Some(payload) => tracing::info!(
                capsule,
                port = %port.role.name,
                signal = signal.name(),
                %payload,
                "Signal received"
            ),
            None => tracing::info!(
                capsule,
                port = %port.role.name,
                signal = signal.name(),
                "Signal received"
            ),
        }
    }
}
