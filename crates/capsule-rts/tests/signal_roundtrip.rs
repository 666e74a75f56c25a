// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::float_cmp)] // Exact values survive the round trip

//! Signal bodies through the registry and back.

use capsule_rts::dynamic::{DynamicData, DynamicValue, PrimitiveKind, TypeDescriptor, TypeDescriptorBuilder};
use capsule_rts::signal::{CommsPort, ProtocolRole, Signal, SignalId, SignalRegistry};
use std::sync::Arc;

const PROTOCOL: &str = "Telemetry";

fn port() -> Arc<CommsPort> {
    Arc::new(CommsPort::border("probe", ProtocolRole::new("tm", PROTOCOL), 0))
}

fn vector() -> Arc<TypeDescriptor> {
    Arc::new(
        TypeDescriptorBuilder::new("Vector")
            .field("x", PrimitiveKind::Float)
            .field("y", PrimitiveKind::Float)
            .build(),
    )
}

fn sample_type() -> Arc<TypeDescriptor> {
    let header = Arc::new(
        TypeDescriptorBuilder::new("Header")
            .field("seq", PrimitiveKind::ULong)
            .build(),
    );
    Arc::new(
        TypeDescriptorBuilder::new("Sample")
            .inherits(header)
            .field("tag", PrimitiveKind::Char)
            .string_field("label")
            .field("valid", PrimitiveKind::Bool)
            .array_field("raw", PrimitiveKind::Short, 3)
            .nested_field("position", vector())
            .nested_array_field("path", vector(), 2)
            .field("scale", PrimitiveKind::Double)
            .build(),
    )
}

fn registry() -> SignalRegistry {
    let registry = SignalRegistry::new();
    assert!(registry.register_out_signal(PROTOCOL, "sample", SignalId(10), sample_type()));
    assert!(registry.register_in_signal(PROTOCOL, "sample", SignalId(10), sample_type()));
    registry
}

fn vec2(x: f32, y: f32) -> DynamicValue {
    DynamicValue::Struct(vec![DynamicValue::Float(x), DynamicValue::Float(y)])
}

fn sample() -> DynamicData {
    let mut data = DynamicData::new(&sample_type());
    data.set("seq", 99u64).expect("seq");
    data.set("tag", 'Q').expect("tag");
    data.set("label", "probe \"one\"").expect("label");
    data.set("valid", true).expect("valid");
    data.set("raw", vec![-1i16, 0, 1]).expect("raw");
    data.set("position", vec2(1.5, -2.25)).expect("position");
    data.set("path", DynamicValue::Array(vec![vec2(0.0, 0.0), vec2(3.0, 4.0)]))
        .expect("path");
    data.set("scale", 0.125f64).expect("scale");
    data
}

#[test]
fn composite_payload_survives_round_trip() {
    let registry = registry();
    let signal = Signal::new("sample", SignalId(10))
        .with_src_port(port())
        .with_payload(sample());

    let body = registry.to_json(&signal).expect("encode");
    let decoded = registry.from_json(&body, &port()).expect("decode");

    assert_eq!(decoded.name(), "sample");
    assert_eq!(decoded.id(), SignalId(10));
    let payload = decoded.payload().expect("payload");
    assert_eq!(payload.value(), sample().value());
    assert_eq!(payload.get::<u64>("seq").expect("seq"), 99);
    assert_eq!(payload.get::<char>("tag").expect("tag"), 'Q');
    assert_eq!(payload.get::<String>("label").expect("label"), "probe \"one\"");
    assert_eq!(payload.get::<f64>("scale").expect("scale"), 0.125);
}

#[test]
fn body_lists_one_param_per_field_in_order() {
    let registry = registry();
    let signal = Signal::new("sample", SignalId(10))
        .with_src_port(port())
        .with_payload(sample());
    let body: serde_json::Value =
        serde_json::from_str(&registry.to_json(&signal).expect("encode")).expect("json");

    assert_eq!(body["signal"], "sample");
    let params = body["params"].as_array().expect("params");
    let names: Vec<&str> = params
        .iter()
        .map(|p| p["name"].as_str().expect("name"))
        .collect();
    assert_eq!(
        names,
        vec!["seq", "tag", "label", "valid", "raw", "position", "path", "scale"]
    );
    assert_eq!(params[1]["type"], "char");
    assert_eq!(params[1]["value"], "Q");
    assert_eq!(params[4]["value"], serde_json::json!([-1, 0, 1]));
    assert_eq!(params[5]["type"], "Vector");
    assert_eq!(params[5]["value"][1]["name"], "y");
    assert_eq!(params[6]["value"].as_array().expect("path").len(), 2);
}

#[test]
fn wrong_arity_or_missing_value_is_dropped() {
    let registry = registry();
    let signal = Signal::new("sample", SignalId(10))
        .with_src_port(port())
        .with_payload(sample());
    let mut body: serde_json::Value =
        serde_json::from_str(&registry.to_json(&signal).expect("encode")).expect("json");

    let mut short = body.clone();
    short["params"].as_array_mut().expect("params").pop();
    let err = registry
        .from_json(&short.to_string(), &port())
        .expect_err("too few params");
    assert!(!err.is_fatal());

    body["params"][0]
        .as_object_mut()
        .expect("param")
        .remove("value");
    assert!(registry.from_json(&body.to_string(), &port()).is_err());

    assert!(registry
        .from_json(r#"{"signal":"unknown","params":[]}"#, &port())
        .is_err());
}

#[test]
fn char_param_encodes_as_single_character() {
    let desc = Arc::new(
        TypeDescriptorBuilder::new("Letter")
            .field("letter", PrimitiveKind::Char)
            .build(),
    );
    let registry = SignalRegistry::new();
    registry.register_out_signal("Alpha", "letter", SignalId(1), Arc::clone(&desc));
    registry.register_in_signal("Alpha", "letter", SignalId(1), Arc::clone(&desc));
    let port = Arc::new(CommsPort::border("a", ProtocolRole::new("r", "Alpha"), 0));

    let mut data = DynamicData::new(&desc);
    data.set("letter", 'A').expect("set");
    let signal = Signal::new("letter", SignalId(1))
        .with_src_port(Arc::clone(&port))
        .with_payload(data);

    let body = registry.to_json(&signal).expect("encode");
    assert_eq!(
        body,
        r#"{"signal":"letter","params":[{"name":"letter","type":"char","value":"A"}]}"#
    );
    let decoded = registry.from_json(&body, &port).expect("decode");
    assert_eq!(
        decoded.payload().expect("payload").value(),
        &DynamicValue::Struct(vec![DynamicValue::Char(b'A')])
    );
}

#[test]
fn empty_payload_signal_has_no_params() {
    let registry = SignalRegistry::new();
    let empty = Arc::new(TypeDescriptor::empty());
    registry.register_out_signal("Beat", "tick", SignalId(0), Arc::clone(&empty));
    registry.register_in_signal("Beat", "tick", SignalId(0), empty);
    let port = Arc::new(CommsPort::border("a", ProtocolRole::new("r", "Beat"), 0));

    let body = registry
        .to_json(&Signal::new("tick", SignalId(0)).with_src_port(Arc::clone(&port)))
        .expect("encode");
    assert_eq!(body, r#"{"signal":"tick","params":[]}"#);
    assert!(registry.from_json(&body, &port).expect("decode").payload().is_none());

    let err = registry
        .from_json(
            r#"{"signal":"tick","params":[{"name":"x","type":"int","value":1}]}"#,
            &port,
        )
        .expect_err("params for an empty payload");
    assert!(!err.is_fatal());
}
