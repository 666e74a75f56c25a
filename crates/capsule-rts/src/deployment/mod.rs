// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hosts, controllers, capsules, slots and the Deployment Map.

mod capsule;
mod controller;
mod host;
mod map;
mod slot;

pub use capsule::{BasicCapsuleClass, Capsule, CapsuleBehavior, CapsuleClass, NullBehavior};
pub use controller::{Controller, ControllerFactory, QueueController, QueueControllerFactory};
pub use host::Host;
pub use map::{
    DeploymentError, DeploymentMap, DeploymentPlan, PlanCapsule, PlanController, PlanHost,
};
pub use slot::{CapsulePart, Slot};
