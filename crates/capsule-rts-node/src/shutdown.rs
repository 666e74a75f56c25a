// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ctrl+C handling.

use capsule_rts::DirectorHandle;

/// Abort the director on Ctrl+C. Fails if a handler is already installed.
pub fn install_abort_handler(handle: DirectorHandle) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, shutting down...");
        handle.abort();
    })
}
