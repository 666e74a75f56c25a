// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Integration tests for the dynamic module.

use super::*;
use std::sync::Arc;

#[test]
fn test_full_workflow() {
    let sensor_type = Arc::new(
        TypeDescriptorBuilder::new("SensorReading")
            .field("sensor_id", PrimitiveKind::UInt)
            .field("temperature", PrimitiveKind::Double)
            .field("humidity", PrimitiveKind::Float)
            .field("timestamp", PrimitiveKind::ULongLong)
            .string_field("location")
            .build(),
    );

    let mut data = DynamicData::new(&sensor_type);
    data.set("sensor_id", 42u32).expect("set sensor_id");
    data.set("temperature", 23.5f64).expect("set temperature");
    data.set("humidity", 65.0f32).expect("set humidity");
    data.set("timestamp", DynamicValue::ULongLong(1_702_900_000))
        .expect("set timestamp");
    data.set("location", "Building A").expect("set location");

    // Binary
    let encoded = encode_dynamic(&data).expect("encode");
    assert_eq!(encoded.len(), 4 + 8 + 4 + 8 + 4 + "Building A".len());
    let decoded = decode_dynamic(&encoded, &sensor_type).expect("decode");
    assert_eq!(decoded, data);

    // JSON through text
    let text = serde_json::to_string(&data.to_json().expect("json")).expect("text");
    let node: serde_json::Value = serde_json::from_str(&text).expect("parse");
    let back = DynamicData::from_json(&sensor_type, &node).expect("from json");
    assert_eq!(back.get::<u64>("timestamp").expect("get"), 1_702_900_000);
    assert_eq!(back.get::<String>("location").expect("get"), "Building A");
    assert_eq!(back, data);
}

#[test]
fn test_complex_nested_types() {
    let vector3_type = Arc::new(
        TypeDescriptorBuilder::new("Vector3")
            .field("x", PrimitiveKind::Double)
            .field("y", PrimitiveKind::Double)
            .field("z", PrimitiveKind::Double)
            .build(),
    );

    let pose_type = Arc::new(
        TypeDescriptorBuilder::new("Pose")
            .nested_field("position", vector3_type.clone())
            .nested_array_field("waypoints", vector3_type.clone(), 2)
            .field("valid", PrimitiveKind::Bool)
            .build(),
    );

    let v = |x: f64| {
        DynamicValue::Struct(vec![
            DynamicValue::Double(x),
            DynamicValue::Double(x + 1.0),
            DynamicValue::Double(x + 2.0),
        ])
    };

    let mut data = DynamicData::new(&pose_type);
    data.set("position", v(1.0)).expect("set position");
    data.set("waypoints", DynamicValue::Array(vec![v(10.0), v(20.0)]))
        .expect("set waypoints");
    data.set("valid", true).expect("set valid");

    let node = data.to_json().expect("json");
    assert_eq!(node["value"][0][1]["type"], "Vector3");
    assert_eq!(node["value"][0][1]["value"].as_array().map(Vec::len), Some(2));

    let back = DynamicData::from_json(&pose_type, &node).expect("decode");
    assert_eq!(back, data);

    let bytes = data.encode().expect("encode");
    assert_eq!(bytes.len(), 3 * 8 * 3 + 1);
    assert_eq!(DynamicData::decode(&pose_type, &bytes).expect("decode"), data);
}

#[test]
fn test_inherited_fields_travel_first() {
    let base = Arc::new(
        TypeDescriptorBuilder::new("Base")
            .field("id", PrimitiveKind::Short)
            .build(),
    );
    let derived = Arc::new(
        TypeDescriptorBuilder::new("Derived")
            .inherits(base)
            .field("flag", PrimitiveKind::Bool)
            .build(),
    );

    let mut data = DynamicData::new(&derived);
    data.set("id", 0x0102i16).expect("set id");
    data.set("flag", true).expect("set flag");

    assert_eq!(data.encode().expect("encode"), vec![0x02, 0x01, 1]);

    let node = data.to_json().expect("json");
    assert_eq!(node["value"][0][0], serde_json::json!({"type": "short", "value": [258]}));
}

#[test]
fn test_malformed_nested_json_fails_whole_decode() {
    let inner = Arc::new(
        TypeDescriptorBuilder::new("Inner")
            .field("n", PrimitiveKind::Int)
            .build(),
    );
    let outer = Arc::new(
        TypeDescriptorBuilder::new("Outer")
            .field("a", PrimitiveKind::Int)
            .nested_field("inner", inner)
            .build(),
    );
    let node = serde_json::json!({
        "type": "Outer",
        "value": [[
            {"type": "int", "value": [1]},
            {"type": "Inner", "value": [[{"type": "int", "value": ["x"]}]]}
        ]]
    });
    assert!(DynamicData::from_json(&outer, &node).is_none());
}

#[test]
fn test_every_primitive_roundtrips() {
    let values = [
        DynamicValue::Bool(true),
        DynamicValue::Char(b'z'),
        DynamicValue::Short(-12),
        DynamicValue::Int(-70_000),
        DynamicValue::Long(-5_000_000_000),
        DynamicValue::LongLong(i64::MAX),
        DynamicValue::UChar(200),
        DynamicValue::UShort(60_000),
        DynamicValue::UInt(4_000_000_000),
        DynamicValue::ULong(u64::MAX),
        DynamicValue::ULongLong(7),
        DynamicValue::Float(0.25),
        DynamicValue::Double(-1.5),
        DynamicValue::LongDouble(3.75),
        DynamicValue::Ptr(0xdead_beef),
        DynamicValue::CharPtr("héllo".to_string()),
    ];

    for (kind, value) in PrimitiveKind::ALL.iter().zip(values.iter()) {
        let desc = Arc::new(TypeDescriptor::primitive(*kind));
        assert!(desc.conforms(value), "{} conforms", kind.name());

        let node = desc.to_json(value, 1).expect("to json");
        assert_eq!(node["type"], kind.name());
        assert_eq!(desc.from_json(&node["value"], 1).as_ref(), Some(value));

        let mut enc = binary::BinaryEncoder::new();
        desc.encode(value, &mut enc).expect("encode");
        let bytes = enc.into_bytes();
        if let Some(size) = kind.wire_size() {
            assert_eq!(bytes.len(), size, "{} wire size", kind.name());
        }
        let mut dec = binary::BinaryDecoder::new(&bytes);
        assert_eq!(&desc.decode(&mut dec).expect("decode"), value);
    }
}
