// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Two-host fixture shared by the bootstrap tests.
//!
//! Slot tree: `top` (host main) with one part holding `top.sensor`
//! (host edge). `top` sends `reading(value:int)` on its `out` port to the
//! sensor's `in` port, both of protocol `Data`.

#![allow(dead_code)]

use capsule_rts::communicator::Envelope;
use capsule_rts::deployment::{
    BasicCapsuleClass, CapsuleBehavior, CapsulePart, DeploymentMap, DeploymentPlan,
    QueueControllerFactory, Slot,
};
use capsule_rts::dynamic::{DynamicData, PrimitiveKind, TypeDescriptor, TypeDescriptorBuilder};
use capsule_rts::signal::{CommsPort, ProtocolRole, Signal, SignalId};
use capsule_rts::transport::{Connection, Listener, Transport, TransportError};
use capsule_rts::{ExecutionDirector, RuntimeConfig, SignalRegistry};
use crossbeam::channel::Sender;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const PROTOCOL: &str = "Data";
pub const READING: SignalId = SignalId(7);

pub fn plan(main: &str, edge: &str) -> String {
    DeploymentPlan::default()
        .host("main", main)
        .host("edge", edge)
        .controller("c-main", "main")
        .controller("c-edge", "edge")
        .capsule("top", "c-main")
        .capsule("top.sensor", "c-edge")
        .to_json()
        .expect("plan")
}

struct Recorder(Sender<Signal>);

impl CapsuleBehavior for Recorder {
    fn receive(&mut self, _capsule: &str, _port: &CommsPort, signal: &Signal) {
        let _ = self.0.send(signal.clone());
    }
}

/// Static slot tree; the sensor forwards what it receives to `sink`.
pub fn slots(sink: Option<Sender<Signal>>) -> Vec<Arc<Slot>> {
    let top = BasicCapsuleClass::new("Top").border_port("out", PROTOCOL);
    let mut sensor = BasicCapsuleClass::new("Sensor").border_port("in", PROTOCOL);
    if let Some(sink) = sink {
        sensor = sensor.behavior(move |_: &str| -> Box<dyn CapsuleBehavior> {
            Box::new(Recorder(sink.clone()))
        });
    }
    vec![
        Arc::new(
            Slot::new("top", Arc::new(top))
                .with_part(CapsulePart::new("sensors", vec!["top.sensor".to_string()])),
        ),
        Arc::new(Slot::new("top.sensor", Arc::new(sensor))),
    ]
}

pub fn reading_type() -> Arc<TypeDescriptor> {
    Arc::new(
        TypeDescriptorBuilder::new("Reading")
            .field("value", PrimitiveKind::Int)
            .build(),
    )
}

pub fn registry() -> Arc<SignalRegistry> {
    let registry = SignalRegistry::new();
    registry.register_out_signal(PROTOCOL, "reading", READING, reading_type());
    registry.register_in_signal(PROTOCOL, "reading", READING, reading_type());
    Arc::new(registry)
}

pub fn director(
    map: Arc<DeploymentMap>,
    transport: Arc<dyn Transport>,
    address: &str,
) -> ExecutionDirector {
    let config = RuntimeConfig::default()
        .with_local_address(address)
        .with_handshake_timeout(Duration::from_secs(10));
    ExecutionDirector::new(
        map,
        registry(),
        transport,
        config,
        Arc::new(QueueControllerFactory),
    )
}

/// `reading(value)` leaving `top` on its `out` port.
pub fn reading(value: i32) -> Signal {
    let mut payload = DynamicData::new(&reading_type());
    payload.set("value", value).expect("set");
    Signal::new("reading", READING)
        .with_src_port(Arc::new(CommsPort::border(
            "top",
            ProtocolRole::new("out", PROTOCOL),
            0,
        )))
        .with_payload(payload)
}

pub fn sensor_port() -> CommsPort {
    CommsPort::border("top.sensor", ProtocolRole::new("in", PROTOCOL), 0)
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// ============================================================================
// Recording transport
// ============================================================================

/// Wraps a transport and records every bootstrap envelope sent through it.
#[derive(Clone)]
pub struct RecordingTransport<T> {
    inner: T,
    log: Arc<Mutex<Vec<String>>>,
}

impl<T> RecordingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Envelopes sent so far, rendered as `phase sender -> receiver`.
    pub fn envelopes(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

impl<T: Transport> Transport for RecordingTransport<T> {
    fn bind(&self, address: &str) -> Result<Box<dyn Listener>, TransportError> {
        self.inner.bind(address)
    }

    fn connect(&self, address: &str) -> Result<Box<dyn Connection>, TransportError> {
        Ok(Box::new(RecordingConnection {
            inner: self.inner.connect(address)?,
            log: Arc::clone(&self.log),
        }))
    }
}

struct RecordingConnection {
    inner: Box<dyn Connection>,
    log: Arc<Mutex<Vec<String>>>,
}

impl Connection for RecordingConnection {
    fn address(&self) -> &str {
        self.inner.address()
    }

    fn send(&self, message: &[u8]) -> Result<(), TransportError> {
        if let Ok(envelope) = Envelope::from_slice(message) {
            self.log.lock().push(envelope.to_string());
        }
        self.inner.send(message)
    }

    fn shutdown(&self) {
        self.inner.shutdown();
    }
}
