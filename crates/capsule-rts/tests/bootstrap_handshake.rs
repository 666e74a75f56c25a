// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Two hosts bootstrapping over the in-process transport.

mod support;

use capsule_rts::deployment::DeploymentMap;
use capsule_rts::transport::MemoryTransport;
use std::sync::Arc;
use std::time::Duration;
use support::RecordingTransport;

const MAIN: &str = "mem://main";
const EDGE: &str = "mem://edge";

#[test]
fn parent_and_child_complete_handshake_then_exchange_signals() {
    let transport = RecordingTransport::new(MemoryTransport::new());
    let (tx, rx) = crossbeam::channel::unbounded();

    let parent_map = Arc::new(DeploymentMap::new());
    parent_map.decode(&support::plan(MAIN, EDGE)).expect("plan");
    parent_map
        .set_default_slot_list(support::slots(None))
        .expect("parent slots");

    let child_map = Arc::new(DeploymentMap::new());
    child_map
        .set_default_slot_list(support::slots(Some(tx)))
        .expect("child slots");

    let child = support::director(Arc::clone(&child_map), Arc::new(transport.clone()), EDGE);
    let parent = support::director(Arc::clone(&parent_map), Arc::new(transport.clone()), MAIN);
    child.spawn().expect("child");
    parent.spawn().expect("parent");

    assert!(
        support::wait_until(Duration::from_secs(10), || transport.envelopes().len() >= 3),
        "handshake did not finish: {:?}",
        transport.envelopes()
    );
    assert_eq!(
        transport.envelopes(),
        vec![
            "deployment main -> edge".to_string(),
            "ready edge -> main".to_string(),
            "go main -> edge".to_string(),
        ]
    );

    // The child learned the plan from its parent.
    assert_eq!(
        child_map.encode().expect("child plan"),
        parent_map.encode().expect("parent plan")
    );

    let edge = parent_map.get_host("edge").expect("edge");
    assert!(edge.is_deployed() && edge.got_ack() && edge.is_go_signaled());
    let main = child_map.get_host("main").expect("main");
    assert!(main.is_signaled() && main.got_go());

    let handle = parent.handle();
    handle
        .send_signal(&support::sensor_port(), &support::reading(42), 0)
        .expect("send");
    handle
        .send_signal(&support::sensor_port(), &support::reading(43), 0)
        .expect("send");

    let first = rx.recv_timeout(Duration::from_secs(10)).expect("first reading");
    let second = rx.recv_timeout(Duration::from_secs(10)).expect("second reading");
    assert_eq!(first.name(), "reading");
    assert_eq!(
        first.payload().expect("payload").get::<i32>("value").expect("value"),
        42
    );
    assert_eq!(
        second.payload().expect("payload").get::<i32>("value").expect("value"),
        43
    );
    assert_eq!(first.src_port().expect("src").slot, "top");

    // No further handshake traffic once pumping.
    assert_eq!(transport.envelopes().len(), 3);

    parent.abort();
    child.abort();
    parent.join().expect("parent run");
    child.join().expect("child run");
}

#[test]
fn child_without_parent_times_out() {
    let transport = MemoryTransport::new();
    let map = Arc::new(DeploymentMap::new());
    map.set_default_slot_list(support::slots(None)).expect("slots");

    let config = capsule_rts::RuntimeConfig::default()
        .with_local_address("mem://orphan")
        .with_handshake_timeout(Duration::from_millis(100));
    let director = capsule_rts::ExecutionDirector::new(
        map,
        support::registry(),
        Arc::new(transport),
        config,
        Arc::new(capsule_rts::deployment::QueueControllerFactory),
    );
    let err = director.run().expect_err("no deployment arrives");
    assert!(err.is_fatal(), "{}", err);
}

#[test]
fn abort_during_handshake_is_clean() {
    let transport = MemoryTransport::new();
    let map = Arc::new(DeploymentMap::new());
    map.set_default_slot_list(support::slots(None)).expect("slots");

    let director = support::director(map, Arc::new(transport), "mem://waiting");
    director.spawn().expect("spawn");
    std::thread::sleep(Duration::from_millis(50));
    director.abort();
    director.join().expect("aborted run ends cleanly");
}
