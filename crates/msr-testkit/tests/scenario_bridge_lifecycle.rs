//! Scenario: core bridges are deployed on and destroyed from the live broker.

use msr_model::{attributes, Operation, ResourceAddress};
use msr_reconcile::{OperationFailure, ProcessState};
use msr_runtime::RuntimeActionError;
use msr_testkit::{BrokerCall, Faults, Harness};
use serde_json::json;

fn addr(s: &str) -> ResourceAddress {
    s.parse().unwrap()
}

fn bridge_params() -> msr_model::Attributes {
    attributes([
        ("queue-name", json!("boot-q")),
        ("forwarding-address", json!("elsewhere")),
        ("static-connectors", json!(["netty"])),
    ])
}

#[test]
fn add_deploys_and_remove_destroys() {
    let mut h = Harness::new();
    h.boot_standard().unwrap();
    let b = addr("server=default/bridge=b2");

    h.execute(Operation::add(b.clone(), bridge_params())).unwrap();
    let broker = h.broker("default").unwrap();
    assert!(broker.inner().bridge_names().contains(&"b2".to_string()));

    h.execute(Operation::remove(b.clone())).unwrap();
    assert!(!broker.inner().bridge_names().contains(&"b2".to_string()));
    assert_eq!(
        broker.calls(),
        vec![
            BrokerCall::DeployBridge("b2".to_string()),
            BrokerCall::DestroyBridge("b2".to_string()),
        ]
    );
}

#[test]
fn failed_deploy_aborts_the_add() {
    let mut h = Harness::with_faults(Faults {
        deploy_bridge: Some(RuntimeActionError::failed("deploy-bridge", "no such queue")),
        ..Faults::none()
    });
    h.boot_standard().unwrap();

    let err = h
        .execute(Operation::add(addr("server=default/bridge=b2"), bridge_params()))
        .unwrap_err();

    assert!(matches!(err, OperationFailure::RuntimeAction { .. }));
    assert!(!h.exists(&addr("server=default/bridge=b2")));
}

#[test]
fn failed_destroy_is_a_warning() {
    let mut h = Harness::with_faults(Faults {
        destroy_bridge: Some(RuntimeActionError::failed("destroy-bridge", "busy")),
        ..Faults::none()
    });
    h.boot_standard().unwrap();

    let outcome = h
        .execute(Operation::remove(addr("server=default/bridge=to-upstream")))
        .unwrap();

    assert_eq!(outcome.warnings.len(), 1);
    assert!(!h.exists(&addr("server=default/bridge=to-upstream")));
}

#[test]
fn attribute_write_is_deferred_to_reload() {
    let mut h = Harness::new();
    h.boot_standard().unwrap();

    let outcome = h
        .execute(Operation::write_attribute(
            addr("server=default/bridge=to-upstream"),
            "forwarding-address",
            json!("other"),
        ))
        .unwrap();

    assert!(outcome.reload_required);
    assert_eq!(h.controller.state(), ProcessState::ReloadRequired);
}
