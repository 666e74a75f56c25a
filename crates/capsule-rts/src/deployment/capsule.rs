// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capsule instances and capsule classes.

use crate::signal::{CommsPort, ProtocolRole, Signal};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Behaviour of a capsule; driven by its controller's thread.
pub trait CapsuleBehavior: Send {
    /// Called once with the `INITIALIZE` signal.
    fn initialize(&mut self, capsule: &str, signal: &Signal) {
        let _ = (capsule, signal);
    }

    /// Called for every signal delivered on one of the capsule's ports.
    fn receive(&mut self, capsule: &str, port: &CommsPort, signal: &Signal);
}

/// A behaviour that ignores everything.
#[derive(Debug, Default)]
pub struct NullBehavior;

impl CapsuleBehavior for NullBehavior {
    fn receive(&mut self, _capsule: &str, _port: &CommsPort, _signal: &Signal) {}
}

/// A capsule instance living in a slot. Its name is the slot name.
pub struct Capsule {
    name: String,
    class_name: String,
    border_ports: Vec<Arc<CommsPort>>,
    internal_ports: Vec<Arc<CommsPort>>,
    behavior: Mutex<Box<dyn CapsuleBehavior>>,
}

impl Capsule {
    pub fn new(
        name: impl Into<String>,
        class_name: impl Into<String>,
        behavior: Box<dyn CapsuleBehavior>,
    ) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            border_ports: Vec::new(),
            internal_ports: Vec::new(),
            behavior: Mutex::new(behavior),
        }
    }

    /// Append a border port; its role index is its position.
    pub fn with_border_port(mut self, role: ProtocolRole) -> Self {
        let index = self.border_ports.len();
        self.border_ports
            .push(Arc::new(CommsPort::border(self.name.clone(), role, index)));
        self
    }

    /// Append an internal port; its role index is its position.
    pub fn with_internal_port(mut self, role: ProtocolRole) -> Self {
        let index = self.internal_ports.len();
        self.internal_ports
            .push(Arc::new(CommsPort::internal(self.name.clone(), role, index)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn border_ports(&self) -> &[Arc<CommsPort>] {
        &self.border_ports
    }

    pub fn internal_ports(&self) -> &[Arc<CommsPort>] {
        &self.internal_ports
    }

    /// Port by wire index.
    pub fn port(&self, index: usize, internal: bool) -> Option<&Arc<CommsPort>> {
        if internal {
            self.internal_ports.get(index)
        } else {
            self.border_ports.get(index)
        }
    }

    /// Border port by role name.
    pub fn border_port_named(&self, role: &str) -> Option<&Arc<CommsPort>> {
        self.border_ports.iter().find(|p| p.role.name == role)
    }

    pub fn initialize(&self, signal: &Signal) {
        self.behavior.lock().initialize(&self.name, signal);
    }

    pub fn receive(&self, port: &CommsPort, signal: &Signal) {
        self.behavior.lock().receive(&self.name, port, signal);
    }
}

impl fmt::Debug for Capsule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capsule")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .field("border_ports", &self.border_ports.len())
            .field("internal_ports", &self.internal_ports.len())
            .finish()
    }
}

/// Factory for capsule instances of one class.
pub trait CapsuleClass: Send + Sync {
    fn name(&self) -> &str;

    /// Instantiate the capsule for the slot named `slot`.
    fn create(&self, slot: &str) -> Capsule;
}

type BehaviorFactory = dyn Fn(&str) -> Box<dyn CapsuleBehavior> + Send + Sync;

/// A capsule class described by its port roles and a behaviour factory.
pub struct BasicCapsuleClass {
    name: String,
    border: Vec<ProtocolRole>,
    internal: Vec<ProtocolRole>,
    behavior: Box<BehaviorFactory>,
}

impl BasicCapsuleClass {
    /// A class whose instances use [`NullBehavior`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            border: Vec::new(),
            internal: Vec::new(),
            behavior: Box::new(|_: &str| -> Box<dyn CapsuleBehavior> { Box::new(NullBehavior) }),
        }
    }

    pub fn border_port(mut self, role: impl Into<String>, protocol: impl Into<String>) -> Self {
        self.border.push(ProtocolRole::new(role, protocol));
        self
    }

    pub fn internal_port(mut self, role: impl Into<String>, protocol: impl Into<String>) -> Self {
        self.internal.push(ProtocolRole::new(role, protocol));
        self
    }

    pub fn behavior<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Box<dyn CapsuleBehavior> + Send + Sync + 'static,
    {
        self.behavior = Box::new(factory);
        self
    }
}

impl CapsuleClass for BasicCapsuleClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self, slot: &str) -> Capsule {
        let capsule = Capsule::new(slot, self.name.clone(), (self.behavior)(slot));
        let capsule = self
            .border
            .iter()
            .cloned()
            .fold(capsule, Capsule::with_border_port);
        self.internal
            .iter()
            .cloned()
            .fold(capsule, Capsule::with_internal_port)
    }
}

impl fmt::Debug for BasicCapsuleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCapsuleClass")
            .field("name", &self.name)
            .field("border", &self.border)
            .field("internal", &self.internal)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalId;

    struct Counter(Arc<Mutex<Vec<String>>>);

    impl CapsuleBehavior for Counter {
        fn initialize(&mut self, capsule: &str, signal: &Signal) {
            self.0.lock().push(format!("{}:{}", capsule, signal.name()));
        }

        fn receive(&mut self, capsule: &str, port: &CommsPort, signal: &Signal) {
            self.0
                .lock()
                .push(format!("{}:{}:{}", capsule, port.role.name, signal.name()));
        }
    }

    #[test]
    fn test_class_creates_indexed_ports() {
        let class = BasicCapsuleClass::new("Pinger")
            .border_port("out", "PingPong")
            .border_port("ctl", "Control")
            .internal_port("timer", "Timing");
        let capsule = class.create("top.pinger");

        assert_eq!(capsule.name(), "top.pinger");
        assert_eq!(capsule.class_name(), "Pinger");
        let ctl = capsule.port(1, false).expect("border 1");
        assert_eq!(ctl.role.name, "ctl");
        assert_eq!(ctl.role_index, 1);
        assert_eq!(ctl.slot, "top.pinger");
        assert!(capsule.port(0, true).expect("internal 0").is_internal());
        assert!(capsule.port(2, false).is_none());
        assert!(capsule.border_port_named("out").is_some());
    }

    #[test]
    fn test_behavior_is_invoked() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let class = BasicCapsuleClass::new("Echo")
            .border_port("p", "P")
            .behavior(move |_| Box::new(Counter(Arc::clone(&sink))));
        let capsule = class.create("echo");

        capsule.initialize(&Signal::initialize_signal());
        let port = Arc::clone(&capsule.border_ports()[0]);
        capsule.receive(&port, &Signal::new("hello", SignalId(1)));

        assert_eq!(
            *log.lock(),
            vec!["echo:INITIALIZE".to_string(), "echo:p:hello".to_string()]
        );
    }
}
