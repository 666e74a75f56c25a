// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Signals, ports and the Signal Registry.

mod port;
mod registry;
#[allow(clippy::module_inception)]
mod signal;

pub use port::{CommsPort, ProtocolRole};
pub use registry::{Direction, SignalError, SignalRegistry};
pub use signal::{Signal, SignalId, INITIALIZE_SIGNAL};
