//! Scenario: queue services added on a live server do not outlive it.
//!
//! Stopping a server (reload or removal) leaves its queue services `Down`;
//! they are purged, and a broker started later hosts the queues from the
//! tree natively. Removal then falls back to native destroy.

use msr_model::{Attributes, Operation, ResourceAddress, ServiceName};
use msr_runtime::ControlOp;
use msr_testkit::{BrokerCall, Harness};
use serde_json::json;

fn addr(s: &str) -> ResourceAddress {
    s.parse().unwrap()
}

fn q_live() -> ResourceAddress {
    addr("server=default/queue=q-live")
}

fn booted_with_live_queue() -> Harness {
    let mut h = Harness::new();
    h.boot_standard().unwrap();
    h.execute(Operation::add(q_live(), Attributes::new())).unwrap();
    h.registry.clear();
    h
}

#[test]
fn reload_hands_live_queues_to_the_new_broker() {
    let mut h = booted_with_live_queue();

    h.controller.reload().unwrap();

    assert!(!h
        .registry
        .is_installed(&ServiceName::queue("default", "q-live")));
    let broker = h.broker("default").unwrap();
    assert!(broker.inner().queue_names().contains(&"q-live".to_string()));
    assert_eq!(
        h.controller.control(&q_live(), ControlOp::IsStarted).unwrap(),
        json!(true)
    );
}

#[test]
fn queue_removed_after_reload_leaves_the_broker() {
    let mut h = booted_with_live_queue();
    h.controller.reload().unwrap();
    h.registry.clear();

    let outcome = h.execute(Operation::remove(q_live())).unwrap();

    let broker = h.broker("default").unwrap();
    assert_eq!(
        broker.calls(),
        vec![BrokerCall::DestroyQueue("q-live".to_string())]
    );
    assert!(h.registry.removals().is_empty());
    assert!(outcome.warnings.is_empty());
    assert!(!broker.inner().queue_names().contains(&"q-live".to_string()));
    assert!(!h.exists(&q_live()));
}

#[test]
fn server_removal_leaves_no_queue_service_behind() {
    let mut h = booted_with_live_queue();

    h.execute(Operation::remove(ResourceAddress::server("default")))
        .unwrap();

    // bindings, queue manager and server only
    assert_eq!(h.registry.removals().len(), 2 + 2 + 2);
    assert!(h.registry.inner().is_empty());
}

#[test]
fn readded_server_accepts_the_same_live_queue_again() {
    let mut h = booted_with_live_queue();
    h.execute(Operation::remove(ResourceAddress::server("default")))
        .unwrap();
    h.execute(Operation::add(ResourceAddress::server("default"), Attributes::new()))
        .unwrap();

    h.execute(Operation::add(q_live(), Attributes::new())).unwrap();

    let service = h
        .registry
        .inner()
        .names()
        .into_iter()
        .find(|n| *n == ServiceName::queue("default", "q-live"));
    assert!(service.is_some());
    let broker = h.broker("default").unwrap();
    assert!(broker.inner().queue_names().contains(&"q-live".to_string()));

    h.execute(Operation::remove(q_live())).unwrap();
    assert!(!broker.inner().queue_names().contains(&"q-live".to_string()));
}
