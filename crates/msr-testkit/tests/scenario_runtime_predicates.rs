//! Scenario: the runtime gate.
//!
//! A step touches the live broker only when the handler asks for it, the
//! process is not booting, the target is not an external reference and the
//! owning server is live. Transport changes on a live server are deferred to
//! the next reload.

use std::sync::Arc;

use msr_config::StartupContext;
use msr_model::{
    attributes, Attributes, Operation, ResourceAddress, SchemaGeneration, ServiceName,
};
use msr_reconcile::{Controller, OperationFailure, ProcessState, RuntimeStep, SkipReason};
use msr_runtime::{BrokerRuntime, InMemoryServiceRegistry, RuntimeActionError, ServiceRegistry};
use msr_testkit::{Faults, Harness, STANDARD_CONFIG};
use serde_json::json;

fn addr(s: &str) -> ResourceAddress {
    s.parse().unwrap()
}

#[test]
fn boot_steps_are_model_only_then_servers_start() {
    let mut h = Harness::new();
    let outcome = h.boot_yaml(STANDARD_CONFIG).unwrap();

    assert!(!outcome.steps.is_empty());
    for step in &outcome.steps {
        // legacy groups never reach the runtime, boot or not
        let legacy = step.operation.address.kind().map(|k| k.generation())
            == Some(SchemaGeneration::Legacy);
        let expected = if legacy {
            SkipReason::HandlerPolicy
        } else {
            SkipReason::Booting
        };
        assert_eq!(
            step.runtime,
            RuntimeStep::Skipped(expected),
            "{} touched the runtime during boot",
            step.operation
        );
    }
    assert_eq!(h.controller.state(), ProcessState::Running);
    assert_eq!(h.brokers.started_count(), 1);
    assert!(h.registry.is_installed(&ServiceName::server("default")));
    assert!(h.registry.is_installed(&ServiceName::queue_manager("default")));
}

#[test]
fn root_connector_is_an_external_reference() {
    let mut h = Harness::new();
    h.boot_standard().unwrap();

    let outcome = h
        .execute(Operation::add(
            addr("remote-connector=ext2"),
            attributes([("socket-binding", json!("ext2"))]),
        ))
        .unwrap();

    assert_eq!(
        outcome.steps[0].runtime,
        RuntimeStep::Skipped(SkipReason::ExternalReference)
    );
    assert!(!outcome.reload_required);
    assert_eq!(h.controller.state(), ProcessState::Running);
    assert!(h.exists(&addr("remote-connector=ext2")));
}

#[test]
fn acceptor_change_on_live_server_requires_reload() {
    let mut h = Harness::new();
    h.boot_standard().unwrap();

    let outcome = h
        .execute(Operation::add(
            addr("server=default/remote-acceptor=extra"),
            attributes([("socket-binding", json!("extra"))]),
        ))
        .unwrap();

    assert_eq!(outcome.steps[0].runtime, RuntimeStep::Applied);
    assert!(outcome.reload_required);
    assert_eq!(h.controller.state(), ProcessState::ReloadRequired);
    assert!(h
        .broker("default")
        .unwrap()
        .lookup_resource("acceptor.extra")
        .is_none());

    h.controller.reload().unwrap();

    assert_eq!(h.controller.state(), ProcessState::Running);
    assert_eq!(h.brokers.started_count(), 2);
    let broker = h.broker("default").unwrap();
    assert!(broker.is_started());
    assert!(broker.lookup_resource("acceptor.extra").is_some());
}

#[test]
fn server_write_on_stopped_server_is_model_only() {
    let mut h = Harness::new();
    h.boot_yaml("servers:\n  default: {}\n").unwrap();
    h.registry
        .inner()
        .remove(&ServiceName::queue_manager("default"))
        .unwrap();
    h.registry
        .inner()
        .remove(&ServiceName::server("default"))
        .unwrap();

    let outcome = h
        .execute(Operation::write_attribute(
            ResourceAddress::server("default"),
            "persistence-enabled",
            json!(true),
        ))
        .unwrap();

    assert_eq!(
        outcome.steps[0].runtime,
        RuntimeStep::Skipped(SkipReason::HandlerPolicy)
    );
    assert!(!outcome.reload_required);
    assert_eq!(h.controller.state(), ProcessState::Running);
}

#[test]
fn server_write_on_live_server_requires_reload() {
    let mut h = Harness::new();
    h.boot_yaml("servers:\n  default: {}\n").unwrap();

    let outcome = h
        .execute(Operation::write_attribute(
            ResourceAddress::server("default"),
            "persistence-enabled",
            json!(true),
        ))
        .unwrap();

    assert_eq!(outcome.steps[0].runtime, RuntimeStep::Applied);
    assert_eq!(h.controller.state(), ProcessState::ReloadRequired);
}

#[test]
fn server_added_at_runtime_is_materialised() {
    let mut h = Harness::new();
    h.boot_standard().unwrap();

    let outcome = h
        .execute(Operation::add(ResourceAddress::server("second"), Attributes::new()))
        .unwrap();

    assert_eq!(outcome.steps[0].runtime, RuntimeStep::Applied);
    assert_eq!(
        h.registry.installs(),
        vec![
            ServiceName::server("second"),
            ServiceName::queue_manager("second")
        ]
    );
    assert!(h.broker("second").unwrap().is_started());
}

#[test]
fn server_add_without_broker_factory_is_capability_missing() {
    let mut controller = Controller::new(
        Arc::new(InMemoryServiceRegistry::new()),
        StartupContext::default(),
    );

    let err = controller
        .execute(Operation::add(ResourceAddress::server("s2"), Attributes::new()))
        .unwrap_err();

    assert_eq!(
        err,
        OperationFailure::CapabilityMissing {
            capability: "broker-factory".to_string()
        }
    );
    assert!(!controller.tree().exists(&ResourceAddress::server("s2")));
}

#[test]
fn broker_start_failures_are_typed() {
    let mut h = Harness::with_faults(Faults {
        start: Some(RuntimeActionError::Unsupported {
            capability: "embedded-broker".to_string(),
        }),
        ..Faults::none()
    });
    let err = h
        .execute(Operation::add(ResourceAddress::server("s1"), Attributes::new()))
        .unwrap_err();
    assert_eq!(
        err,
        OperationFailure::CapabilityMissing {
            capability: "embedded-broker".to_string()
        }
    );

    let mut h = Harness::with_faults(Faults {
        start: Some(RuntimeActionError::failed("start", "port in use")),
        ..Faults::none()
    });
    let err = h
        .execute(Operation::add(ResourceAddress::server("s1"), Attributes::new()))
        .unwrap_err();
    assert!(matches!(err, OperationFailure::RuntimeAction { .. }));
    assert!(!h.exists(&ResourceAddress::server("s1")));
    assert!(h.registry.calls().is_empty());
}
