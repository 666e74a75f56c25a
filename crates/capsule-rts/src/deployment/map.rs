// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Deployment Map
//!
//! Directory of hosts, controllers, capsules and slots, plus the
//! capsule → controller → host assignments of the active deployment plan.
//!
//! # Plan document
//!
//! ```json
//! {
//!   "hosts":       [{"name": "main", "address": "tcp://10.0.0.1:5000"}],
//!   "controllers": [{"name": "ctrl", "host": "main"}],
//!   "capsules":    [{"name": "top.pinger", "controller": "ctrl"}]
//! }
//! ```
//!
//! The text handed to [`DeploymentMap::decode`] is kept verbatim and is
//! what [`DeploymentMap::encode`] returns, so a plan forwarded to child
//! hosts is byte-identical to the one received.
//!
//! Assignments are write-once: assigning a capsule or controller twice is
//! a fatal configuration error.

use crate::deployment::{Capsule, Controller, Host, Slot};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Deployment errors.
#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("Host {0} has already registered")]
    DuplicateHost(String),

    #[error("Controller {0} has already registered")]
    DuplicateController(String),

    #[error("Slot {0} has already registered")]
    DuplicateSlot(String),

    #[error("Capsule {capsule} is already assigned to controller {controller}")]
    CapsuleAlreadyAssigned { capsule: String, controller: String },

    #[error("Controller {controller} is already assigned to host {host}")]
    ControllerAlreadyAssigned { controller: String, host: String },

    #[error("Duplicate hostname {host}: {existing} vs {address}")]
    HostAddressConflict {
        host: String,
        existing: String,
        address: String,
    },

    #[error("Controller {controller} references unknown host {host}")]
    UnknownHost { controller: String, host: String },

    #[error("Invalid deployment plan: {0}")]
    InvalidPlan(#[from] serde_json::Error),

    #[error("Deployment map not loaded yet")]
    NotLoaded,

    #[error("Cannot read deployment plan {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Controller {0} is already running")]
    ControllerAlreadySpawned(String),

    #[error("Cannot start controller {controller}: {reason}")]
    Spawn { controller: String, reason: String },
}

impl DeploymentError {
    /// Configuration and topology errors stop the process.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Io { .. } | Self::ControllerAlreadySpawned(_))
    }
}

/// `hosts[]` entry of a plan document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanHost {
    pub name: String,
    pub address: String,
}

/// `controllers[]` entry of a plan document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanController {
    pub name: String,
    pub host: String,
}

/// `capsules[]` entry of a plan document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCapsule {
    pub name: String,
    pub controller: String,
}

/// A deployment plan document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    #[serde(default)]
    pub hosts: Vec<PlanHost>,
    #[serde(default)]
    pub controllers: Vec<PlanController>,
    #[serde(default)]
    pub capsules: Vec<PlanCapsule>,
}

impl DeploymentPlan {
    pub fn host(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.hosts.push(PlanHost {
            name: name.into(),
            address: address.into(),
        });
        self
    }

    pub fn controller(mut self, name: impl Into<String>, host: impl Into<String>) -> Self {
        self.controllers.push(PlanController {
            name: name.into(),
            host: host.into(),
        });
        self
    }

    pub fn capsule(mut self, name: impl Into<String>, controller: impl Into<String>) -> Self {
        self.capsules.push(PlanCapsule {
            name: name.into(),
            controller: controller.into(),
        });
        self
    }

    /// Render the plan as a JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Process-wide deployment directory, shared through `Arc`.
#[derive(Default)]
pub struct DeploymentMap {
    capsule_to_controller: RwLock<HashMap<String, String>>,
    controller_to_host: RwLock<HashMap<String, String>>,
    controllers: RwLock<HashMap<String, Arc<dyn Controller>>>,
    capsules: RwLock<HashMap<String, Arc<Capsule>>>,
    hosts: RwLock<HashMap<String, Arc<Host>>>,
    slots: RwLock<HashMap<String, Arc<Slot>>>,
    default_slots: RwLock<Vec<Arc<Slot>>>,
    payload: RwLock<Option<String>>,
}

impl DeploymentMap {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Directories
    // ------------------------------------------------------------------

    pub fn add_host(&self, host: Arc<Host>) -> Result<(), DeploymentError> {
        let mut hosts = self.hosts.write();
        if hosts.contains_key(host.name()) {
            log::error!("[DeploymentMap] host {} has already registered", host.name());
            return Err(DeploymentError::DuplicateHost(host.name().to_string()));
        }
        log::debug!("[DeploymentMap] add host {} @ {}", host.name(), host.address());
        hosts.insert(host.name().to_string(), host);
        Ok(())
    }

    pub fn add_controller(&self, controller: Arc<dyn Controller>) -> Result<(), DeploymentError> {
        let mut controllers = self.controllers.write();
        if controllers.contains_key(controller.name()) {
            log::error!(
                "[DeploymentMap] controller {} has already registered",
                controller.name()
            );
            return Err(DeploymentError::DuplicateController(
                controller.name().to_string(),
            ));
        }
        log::debug!("[DeploymentMap] add controller {}", controller.name());
        controllers.insert(controller.name().to_string(), controller);
        Ok(())
    }

    pub fn add_slot(&self, slot: Arc<Slot>) -> Result<(), DeploymentError> {
        let mut slots = self.slots.write();
        if slots.contains_key(slot.name()) {
            log::error!("[DeploymentMap] slot {} has already registered", slot.name());
            return Err(DeploymentError::DuplicateSlot(slot.name().to_string()));
        }
        log::debug!("[DeploymentMap] add slot {}", slot.name());
        slots.insert(slot.name().to_string(), slot);
        Ok(())
    }

    /// Register a capsule instance, replacing any previous one of that name.
    pub fn add_capsule(&self, capsule: Arc<Capsule>) {
        self.capsules
            .write()
            .insert(capsule.name().to_string(), capsule);
    }

    pub fn remove_capsule(&self, name: &str) -> Option<Arc<Capsule>> {
        self.capsules.write().remove(name)
    }

    pub fn remove_controller(&self, name: &str) -> Option<Arc<dyn Controller>> {
        self.controllers.write().remove(name)
    }

    pub fn remove_host(&self, name: &str) -> Option<Arc<Host>> {
        self.hosts.write().remove(name)
    }

    pub fn get_host(&self, name: &str) -> Option<Arc<Host>> {
        self.hosts.read().get(name).cloned()
    }

    pub fn get_controller(&self, name: &str) -> Option<Arc<dyn Controller>> {
        self.controllers.read().get(name).cloned()
    }

    pub fn get_capsule(&self, name: &str) -> Option<Arc<Capsule>> {
        self.capsules.read().get(name).cloned()
    }

    pub fn get_slot(&self, name: &str) -> Option<Arc<Slot>> {
        self.slots.read().get(name).cloned()
    }

    /// Controller with the lowest name.
    pub fn get_first_controller(&self) -> Option<Arc<dyn Controller>> {
        self.controllers
            .read()
            .iter()
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, c)| Arc::clone(c))
    }

    /// First host whose address equals `address`.
    pub fn get_host_from_address(&self, address: &str) -> Option<Arc<Host>> {
        self.hosts
            .read()
            .values()
            .find(|h| h.address() == address)
            .cloned()
    }

    pub fn hosts(&self) -> Vec<Arc<Host>> {
        self.hosts.read().values().cloned().collect()
    }

    pub fn controllers(&self) -> Vec<Arc<dyn Controller>> {
        self.controllers.read().values().cloned().collect()
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.read().len()
    }

    pub fn capsule_count(&self) -> usize {
        self.capsules.read().len()
    }

    // ------------------------------------------------------------------
    // Assignments
    // ------------------------------------------------------------------

    pub fn add_capsule_to_controller(
        &self,
        capsule: &str,
        controller: &str,
    ) -> Result<(), DeploymentError> {
        let mut map = self.capsule_to_controller.write();
        if let Some(existing) = map.get(capsule) {
            log::error!(
                "[DeploymentMap] capsule-to-controller map already had an entry for capsule {}",
                capsule
            );
            return Err(DeploymentError::CapsuleAlreadyAssigned {
                capsule: capsule.to_string(),
                controller: existing.clone(),
            });
        }
        map.insert(capsule.to_string(), controller.to_string());
        Ok(())
    }

    pub fn add_controller_to_host(
        &self,
        controller: &str,
        host: &str,
    ) -> Result<(), DeploymentError> {
        let mut map = self.controller_to_host.write();
        if let Some(existing) = map.get(controller) {
            log::error!(
                "[DeploymentMap] controller-to-host map already had an entry for controller {}",
                controller
            );
            return Err(DeploymentError::ControllerAlreadyAssigned {
                controller: controller.to_string(),
                host: existing.clone(),
            });
        }
        map.insert(controller.to_string(), host.to_string());
        Ok(())
    }

    pub fn get_controller_name_for_capsule(&self, capsule: &str) -> Option<String> {
        self.capsule_to_controller.read().get(capsule).cloned()
    }

    pub fn get_host_name_for_controller(&self, controller: &str) -> Option<String> {
        self.controller_to_host.read().get(controller).cloned()
    }

    /// Registered controller the capsule is mapped to.
    pub fn get_controller_for_capsule(&self, capsule: &str) -> Option<Arc<dyn Controller>> {
        let name = self.get_controller_name_for_capsule(capsule)?;
        self.get_controller(&name)
    }

    pub fn get_host_for_controller(&self, controller: &str) -> Option<Arc<Host>> {
        let name = self.get_host_name_for_controller(controller)?;
        self.get_host(&name)
    }

    pub fn get_host_for_capsule(&self, capsule: &str) -> Option<Arc<Host>> {
        let controller = self.get_controller_name_for_capsule(capsule)?;
        self.get_host_for_controller(&controller)
    }

    // ------------------------------------------------------------------
    // Static slot tree
    // ------------------------------------------------------------------

    /// Register the static slots. Slots that already carry a controller
    /// are moved to the controller the plan maps them to, if registered.
    pub fn set_default_slot_list(&self, slots: Vec<Arc<Slot>>) -> Result<(), DeploymentError> {
        for (i, slot) in slots.iter().enumerate() {
            self.add_slot(Arc::clone(slot))?;

            let mapped = self.get_controller_for_capsule(slot.name());
            log::debug!(
                "[DeploymentMap] slot[{}] {} slot-controller({}) map-controller({})",
                i,
                slot.name(),
                slot.controller()
                    .map_or_else(|| "-none in slot-".to_string(), |c| c.name().to_string()),
                mapped
                    .as_ref()
                    .map_or_else(|| "-no mapped controller-".to_string(), |c| c.name().to_string())
            );

            if let (Some(_), Some(controller)) = (slot.controller(), mapped) {
                slot.set_controller(controller);
            }
        }
        *self.default_slots.write() = slots;
        Ok(())
    }

    pub fn get_default_slot_list(&self) -> Vec<Arc<Slot>> {
        self.default_slots.read().clone()
    }

    // ------------------------------------------------------------------
    // Plan codec
    // ------------------------------------------------------------------

    /// Apply a plan document and keep its text as the canonical payload.
    pub fn decode(&self, json: &str) -> Result<(), DeploymentError> {
        let plan: DeploymentPlan = serde_json::from_str(json).map_err(|e| {
            log::error!("[DeploymentMap] invalid deployment plan: {}", e);
            DeploymentError::InvalidPlan(e)
        })?;

        for entry in &plan.hosts {
            match self.get_host(&entry.name) {
                Some(existing) if existing.address() != entry.address => {
                    log::error!("[DeploymentMap] duplicate hostname {}", entry.name);
                    return Err(DeploymentError::HostAddressConflict {
                        host: entry.name.clone(),
                        existing: existing.address().to_string(),
                        address: entry.address.clone(),
                    });
                }
                Some(_) => {}
                None => self.add_host(Arc::new(Host::new(&entry.name, &entry.address)))?,
            }
        }

        for entry in &plan.controllers {
            if self.get_host(&entry.host).is_none() {
                log::error!("[DeploymentMap] no such host: {}", entry.host);
                return Err(DeploymentError::UnknownHost {
                    controller: entry.name.clone(),
                    host: entry.host.clone(),
                });
            }
            self.add_controller_to_host(&entry.name, &entry.host)?;
        }

        // Controller existence is resolved later, when slots are deployed.
        for entry in &plan.capsules {
            self.add_capsule_to_controller(&entry.name, &entry.controller)?;
        }

        *self.payload.write() = Some(json.to_string());
        log::info!(
            "[DeploymentMap] plan loaded: {} hosts, {} controllers, {} capsules",
            plan.hosts.len(),
            plan.controllers.len(),
            plan.capsules.len()
        );
        Ok(())
    }

    /// Canonical payload of the loaded plan.
    pub fn encode(&self) -> Result<String, DeploymentError> {
        self.payload.read().clone().ok_or_else(|| {
            log::error!("[DeploymentMap] deployment map not encoded yet");
            DeploymentError::NotLoaded
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.payload.read().is_some()
    }

    /// Read and decode a plan file.
    pub fn from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), DeploymentError> {
        let path = path.as_ref();
        let body = std::fs::read_to_string(path).map_err(|source| DeploymentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.decode(&body)
    }

    // ------------------------------------------------------------------
    // Controller lifecycle
    // ------------------------------------------------------------------

    pub fn spawn_all_controllers(&self) -> Result<(), DeploymentError> {
        for controller in self.controllers() {
            controller.spawn()?;
        }
        Ok(())
    }

    pub fn join_all_controllers(&self) {
        for controller in self.controllers() {
            controller.join();
        }
    }

    pub fn enqueue_abort_all_controllers(&self) {
        for controller in self.controllers() {
            controller.enqueue_abort();
        }
    }

    pub fn enqueue_exit_all_controllers(&self) {
        for controller in self.controllers() {
            controller.enqueue_exit();
        }
    }

    // ------------------------------------------------------------------
    // Debug output
    // ------------------------------------------------------------------

    pub fn debug_output_controller_list(&self) {
        log::debug!("Controller list: {{ <controller name> }}");
        let controllers = self.controllers.read();
        if controllers.is_empty() {
            log::debug!("    No controllers.");
        }
        for name in controllers.keys() {
            log::debug!("    {{ {} }}", name);
        }
    }

    pub fn debug_output_capsule_list(&self) {
        log::debug!("Capsule list: {{ <capsule name>, <capsule class> }}");
        let capsules = self.capsules.read();
        if capsules.is_empty() {
            log::debug!("    No capsules.");
        }
        for capsule in capsules.values() {
            log::debug!("    {{ {}, {} }}", capsule.name(), capsule.class_name());
        }
    }

    pub fn debug_output_host_list(&self) {
        log::debug!("Host list: {{ <host name>, <address> }}");
        let hosts = self.hosts.read();
        if hosts.is_empty() {
            log::debug!("    No hosts.");
        }
        for host in hosts.values() {
            log::debug!("    {{ {}, {} }}", host.name(), host.address());
        }
    }

    pub fn debug_output_slot_list(&self) {
        log::debug!("Slot list: {{ <slot name>, <controller>, <remote> }}");
        let slots = self.slots.read();
        if slots.is_empty() {
            log::debug!("    No slots.");
        }
        for slot in slots.values() {
            log::debug!(
                "    {{ {}, {}, {} }}",
                slot.name(),
                slot.controller()
                    .map_or_else(|| "-".to_string(), |c| c.name().to_string()),
                slot.is_remote()
            );
        }
    }

    pub fn debug_output_capsule_to_controller_map(&self) {
        log::debug!("Capsule to controller map: {{ <slot>, <controller> }}");
        let map = self.capsule_to_controller.read();
        if map.is_empty() {
            log::debug!("    No capsule to controller assignments.");
        }
        for (capsule, controller) in map.iter() {
            log::debug!("    {{ {}, {} }}", capsule, controller);
        }
    }

    pub fn debug_output_controller_to_host_map(&self) {
        log::debug!("Controller to host map: {{ <controller>, <host> }}");
        let map = self.controller_to_host.read();
        if map.is_empty() {
            log::debug!("    No controller to host assignments.");
        }
        for (controller, host) in map.iter() {
            log::debug!("    {{ {}, {} }}", controller, host);
        }
    }

    /// Every `debug_output_*` dump.
    pub fn debug_output(&self) {
        self.debug_output_host_list();
        self.debug_output_controller_list();
        self.debug_output_capsule_list();
        self.debug_output_slot_list();
        self.debug_output_capsule_to_controller_map();
        self.debug_output_controller_to_host_map();
    }
}

impl std::fmt::Debug for DeploymentMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentMap")
            .field("hosts", &self.hosts.read().len())
            .field("controllers", &self.controllers.read().len())
            .field("capsules", &self.capsules.read().len())
            .field("slots", &self.slots.read().len())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::{BasicCapsuleClass, CapsuleClass, QueueController};

    const PLAN: &str = r#"{"hosts":[{"name":"main","address":"tcp://127.0.0.1:7000"},{"name":"edge","address":"tcp://127.0.0.1:7001"}],
"controllers":[{"name":"c-main","host":"main"},{"name":"c-edge","host":"edge"}],
"capsules":[{"name":"top","controller":"c-main"},{"name":"top.sensor","controller":"c-edge"}]}"#;

    #[test]
    fn test_decode_resolves_assignments() {
        let map = DeploymentMap::new();
        assert!(!map.is_loaded());
        map.decode(PLAN).expect("decode");
        assert!(map.is_loaded());

        assert_eq!(
            map.get_controller_name_for_capsule("top.sensor").as_deref(),
            Some("c-edge")
        );
        assert_eq!(
            map.get_host_for_capsule("top.sensor").expect("host").name(),
            "edge"
        );
        assert_eq!(
            map.get_host_from_address("tcp://127.0.0.1:7000")
                .expect("host")
                .name(),
            "main"
        );
        assert!(map.get_host_from_address("tcp://127.0.0.1:9").is_none());
        assert!(map.get_controller_for_capsule("top").is_none());
        assert!(map.get_host_for_capsule("nobody").is_none());
    }

    #[test]
    fn test_encode_returns_original_text() {
        let map = DeploymentMap::new();
        assert!(matches!(map.encode(), Err(DeploymentError::NotLoaded)));
        map.decode(PLAN).expect("decode");
        assert_eq!(map.encode().expect("encode"), PLAN);
    }

    #[test]
    fn test_same_host_twice_is_idempotent() {
        let map = DeploymentMap::new();
        let plan = r#"{"hosts":[{"name":"a","address":"x"}],"controllers":[],"capsules":[]}"#;
        map.decode(plan).expect("first");
        map.decode(plan).expect("second");
        assert_eq!(map.hosts().len(), 1);

        let conflict = r#"{"hosts":[{"name":"a","address":"y"}]}"#;
        let err = map.decode(conflict).expect_err("conflict");
        assert!(matches!(err, DeploymentError::HostAddressConflict { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unknown_host_is_fatal() {
        let map = DeploymentMap::new();
        let err = map
            .decode(r#"{"hosts":[],"controllers":[{"name":"c","host":"ghost"}],"capsules":[]}"#)
            .expect_err("unknown host");
        assert!(matches!(err, DeploymentError::UnknownHost { .. }));
        assert!(err.is_fatal());
        assert!(!map.is_loaded());
    }

    #[test]
    fn test_duplicates_are_fatal() {
        let map = DeploymentMap::new();
        map.add_host(Arc::new(Host::new("h", "a"))).expect("host");
        assert!(map.add_host(Arc::new(Host::new("h", "b"))).is_err());

        map.add_controller(Arc::new(QueueController::new("c")))
            .expect("controller");
        let err = map
            .add_controller(Arc::new(QueueController::new("c")))
            .expect_err("duplicate");
        assert!(err.is_fatal());

        map.add_capsule_to_controller("cap", "c").expect("assign");
        assert!(map.add_capsule_to_controller("cap", "d").is_err());
        assert_eq!(map.get_controller_name_for_capsule("cap").as_deref(), Some("c"));

        map.add_controller_to_host("c", "h").expect("assign");
        assert!(map.add_controller_to_host("c", "h").is_err());
    }

    #[test]
    fn test_capsules_overwrite_and_remove() {
        let map = DeploymentMap::new();
        let class = BasicCapsuleClass::new("K");
        map.add_capsule(Arc::new(class.create("k")));
        map.add_capsule(Arc::new(class.create("k")));
        assert_eq!(map.capsule_count(), 1);
        assert!(map.remove_capsule("k").is_some());
        assert!(map.get_capsule("k").is_none());
    }

    #[test]
    fn test_default_slot_list_reassigns_static_controllers() {
        let map = DeploymentMap::new();
        map.decode(
            r#"{"hosts":[{"name":"h","address":"a"}],"controllers":[{"name":"mapped","host":"h"}],
"capsules":[{"name":"static","controller":"mapped"},{"name":"dynamic","controller":"mapped"}]}"#,
        )
        .expect("decode");
        map.add_controller(Arc::new(QueueController::new("mapped")))
            .expect("controller");

        let class: Arc<dyn crate::deployment::CapsuleClass> =
            Arc::new(BasicCapsuleClass::new("K"));
        let static_slot = Arc::new(
            Slot::new("static", Arc::clone(&class))
                .with_controller(Arc::new(QueueController::new("builtin"))),
        );
        let dynamic_slot = Arc::new(Slot::new("dynamic", class));

        map.set_default_slot_list(vec![Arc::clone(&static_slot), Arc::clone(&dynamic_slot)])
            .expect("slots");

        assert_eq!(static_slot.controller().expect("controller").name(), "mapped");
        assert!(dynamic_slot.controller().is_none());
        assert_eq!(map.get_default_slot_list().len(), 2);
        assert!(map.get_slot("static").is_some());

        let err = map
            .set_default_slot_list(vec![static_slot])
            .expect_err("duplicate slot");
        assert!(matches!(err, DeploymentError::DuplicateSlot(_)));
    }

    #[test]
    fn test_first_controller_and_lifecycle() {
        let map = DeploymentMap::new();
        assert!(map.get_first_controller().is_none());
        map.add_controller(Arc::new(QueueController::new("b"))).expect("b");
        map.add_controller(Arc::new(QueueController::new("a"))).expect("a");
        assert_eq!(map.get_first_controller().expect("first").name(), "a");

        map.spawn_all_controllers().expect("spawn");
        map.enqueue_exit_all_controllers();
        map.join_all_controllers();
        map.debug_output();
    }

    #[test]
    fn test_plan_builder_renders_document() {
        let json = DeploymentPlan::default()
            .host("h", "tcp://127.0.0.1:1")
            .controller("c", "h")
            .capsule("top", "c")
            .to_json()
            .expect("json");
        let map = DeploymentMap::new();
        map.decode(&json).expect("decode");
        assert_eq!(map.get_host_for_capsule("top").expect("host").name(), "h");
    }
}
