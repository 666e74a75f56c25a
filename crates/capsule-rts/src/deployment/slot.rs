// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Slots: placement points in the static containment tree.

use crate::deployment::{Capsule, CapsuleClass, Controller, Host};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A part of a capsule structure, holding child slots by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapsulePart {
    pub name: String,
    pub slots: Vec<String>,
}

impl CapsulePart {
    pub fn new(name: impl Into<String>, slots: Vec<String>) -> Self {
        Self {
            name: name.into(),
            slots,
        }
    }
}

#[derive(Default)]
struct Placement {
    controller: Option<Arc<dyn Controller>>,
    remote: bool,
    host: Option<Arc<Host>>,
    capsule: Option<Arc<Capsule>>,
}

/// A statically declared placement point for one capsule instance.
pub struct Slot {
    name: String,
    capsule_class: Arc<dyn CapsuleClass>,
    parts: Vec<CapsulePart>,
    placement: RwLock<Placement>,
}

impl Slot {
    pub fn new(name: impl Into<String>, capsule_class: Arc<dyn CapsuleClass>) -> Self {
        Self {
            name: name.into(),
            capsule_class,
            parts: Vec::new(),
            placement: RwLock::new(Placement::default()),
        }
    }

    pub fn with_part(mut self, part: CapsulePart) -> Self {
        self.parts.push(part);
        self
    }

    /// Statically assign a controller.
    pub fn with_controller(self, controller: Arc<dyn Controller>) -> Self {
        self.placement.write().controller = Some(controller);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capsule_class(&self) -> &Arc<dyn CapsuleClass> {
        &self.capsule_class
    }

    pub fn parts(&self) -> &[CapsulePart] {
        &self.parts
    }

    /// Names of every child slot across all parts.
    pub fn child_slot_names(&self) -> impl Iterator<Item = &str> {
        self.parts
            .iter()
            .flat_map(|part| part.slots.iter().map(String::as_str))
    }

    pub fn controller(&self) -> Option<Arc<dyn Controller>> {
        self.placement.read().controller.clone()
    }

    pub fn set_controller(&self, controller: Arc<dyn Controller>) {
        self.placement.write().controller = Some(controller);
    }

    pub fn is_remote(&self) -> bool {
        self.placement.read().remote
    }

    /// Host running this slot when it is remote.
    pub fn host(&self) -> Option<Arc<Host>> {
        self.placement.read().host.clone()
    }

    /// Place the slot on another host.
    pub fn set_remote(&self, host: Arc<Host>) {
        let mut placement = self.placement.write();
        placement.remote = true;
        placement.host = Some(host);
    }

    /// Place the slot on the local host.
    pub fn set_local(&self, host: Arc<Host>) {
        let mut placement = self.placement.write();
        placement.remote = false;
        placement.host = Some(host);
    }

    pub fn capsule(&self) -> Option<Arc<Capsule>> {
        self.placement.read().capsule.clone()
    }

    /// Create the slot's capsule from its class, replacing any previous one.
    pub fn instantiate(&self) -> Arc<Capsule> {
        let capsule = Arc::new(self.capsule_class.create(&self.name));
        self.placement.write().capsule = Some(Arc::clone(&capsule));
        capsule
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let placement = self.placement.read();
        f.debug_struct("Slot")
            .field("name", &self.name)
            .field("capsule_class", &self.capsule_class.name())
            .field("parts", &self.parts)
            .field(
                "controller",
                &placement.controller.as_ref().map(|c| c.name().to_string()),
            )
            .field("remote", &placement.remote)
            .field("host", &placement.host.as_ref().map(|h| h.name().to_string()))
            .field("capsule", &placement.capsule.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::{BasicCapsuleClass, QueueController};

    fn class() -> Arc<dyn CapsuleClass> {
        Arc::new(BasicCapsuleClass::new("Top").border_port("p", "P"))
    }

    #[test]
    fn test_child_slot_names_span_parts() {
        let slot = Slot::new("top", class())
            .with_part(CapsulePart::new("left", vec!["top.a".into(), "top.b".into()]))
            .with_part(CapsulePart::new("right", vec!["top.c".into()]));
        let names: Vec<&str> = slot.child_slot_names().collect();
        assert_eq!(names, vec!["top.a", "top.b", "top.c"]);
    }

    #[test]
    fn test_placement_state() {
        let slot = Slot::new("top", class());
        assert!(slot.controller().is_none());
        assert!(!slot.is_remote());

        slot.set_controller(Arc::new(QueueController::new("c")));
        assert_eq!(slot.controller().expect("controller").name(), "c");

        slot.set_remote(Arc::new(Host::new("h", "mem://h")));
        assert!(slot.is_remote());
        assert_eq!(slot.host().expect("host").name(), "h");
    }

    #[test]
    fn test_instantiate_uses_slot_name() {
        let slot = Slot::new("top", class());
        let capsule = slot.instantiate();
        assert_eq!(capsule.name(), "top");
        assert_eq!(capsule.class_name(), "Top");
        assert!(Arc::ptr_eq(&capsule, &slot.capsule().expect("capsule")));
    }
}
