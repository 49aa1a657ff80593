//! Scenario: a failing step rolls back the whole transaction.
//!
//! Runtime actions already performed are undone newest first and the tree is
//! left exactly as it was committed.

use msr_model::{attributes, Attributes, Operation, ResourceAddress, ServiceName};
use msr_reconcile::OperationFailure;
use msr_runtime::{BrokerRuntime, ServiceRegistry};
use msr_testkit::{Harness, RegistryCall};
use serde_json::json;

fn addr(s: &str) -> ResourceAddress {
    s.parse().unwrap()
}

/// Fails with `ParentMissing` after everything before it has run.
fn doomed() -> Operation {
    Operation::add(addr("server=missing/queue=x"), Attributes::new())
}

fn booted() -> Harness {
    let mut h = Harness::new();
    h.boot_standard().unwrap();
    h
}

#[test]
fn installed_queue_service_is_removed_again() {
    let mut h = booted();
    let before = h.controller.tree().clone();

    let err = h
        .controller
        .execute_composite(vec![
            Operation::add(addr("server=default/queue=q2"), Attributes::new()),
            doomed(),
        ])
        .unwrap_err();

    assert!(matches!(err, OperationFailure::ParentMissing { .. }));
    assert_eq!(h.controller.tree(), &before);
    let q2 = ServiceName::queue("default", "q2");
    assert_eq!(
        h.registry.calls(),
        vec![RegistryCall::Install(q2.clone()), RegistryCall::Remove(q2.clone())]
    );
    assert!(!h.registry.is_installed(&q2));
    let broker = h.broker("default").unwrap();
    assert!(!broker.inner().queue_names().contains(&"q2".to_string()));
}

#[test]
fn removed_queue_service_is_reinstalled() {
    let mut h = booted();
    h.execute(Operation::add(addr("server=default/queue=q2"), Attributes::new()))
        .unwrap();

    h.controller
        .execute_composite(vec![Operation::remove(addr("server=default/queue=q2")), doomed()])
        .unwrap_err();

    assert!(h.exists(&addr("server=default/queue=q2")));
    let entry = h
        .registry
        .lookup(&ServiceName::queue("default", "q2"))
        .unwrap();
    assert!(entry.is_up());
    let broker = h.broker("default").unwrap();
    assert!(broker.inner().queue_names().contains(&"q2".to_string()));
    assert!(broker.lookup_resource("queue.q2").is_some());
}

#[test]
fn natively_destroyed_queue_is_redeployed() {
    let mut h = booted();

    h.controller
        .execute_composite(vec![Operation::remove(addr("server=default/queue=boot-q")), doomed()])
        .unwrap_err();

    let broker = h.broker("default").unwrap();
    assert!(broker.inner().queue_names().contains(&"boot-q".to_string()));
    assert!(h.exists(&addr("server=default/queue=boot-q")));
}

#[test]
fn removed_server_is_started_again() {
    let mut h = booted();

    h.controller
        .execute_composite(vec![Operation::remove(ResourceAddress::server("default")), doomed()])
        .unwrap_err();

    assert!(h.exists(&ResourceAddress::server("default")));
    assert_eq!(h.brokers.started_count(), 2);
    assert!(h.broker("default").unwrap().is_started());
    let server = h.registry.lookup(&ServiceName::server("default")).unwrap();
    assert!(server.is_up());
    assert!(h
        .registry
        .is_installed(&ServiceName::broadcast_binding("default", "bg-a")));
}

#[test]
fn added_server_is_stopped_again() {
    let mut h = booted();

    h.controller
        .execute_composite(vec![
            Operation::add(ResourceAddress::server("second"), Attributes::new()),
            doomed(),
        ])
        .unwrap_err();

    assert!(!h.exists(&ResourceAddress::server("second")));
    assert!(!h.registry.is_installed(&ServiceName::server("second")));
    assert!(!h.broker("second").unwrap().is_started());
}

#[test]
fn republished_security_match_is_restored() {
    let mut h = booted();
    let guest = addr("server=default/security-setting=#/role=guest");

    h.controller
        .execute_composite(vec![
            Operation::write_attribute(guest.clone(), "send", json!(false)),
            doomed(),
        ])
        .unwrap_err();

    let restored = h
        .broker("default")
        .unwrap()
        .inner()
        .security_match("#")
        .unwrap();
    assert!(restored.roles["guest"].send);
    assert!(restored.roles["guest"].consume);
}

#[test]
fn added_security_setting_is_withdrawn() {
    let mut h = booted();

    h.controller
        .execute_composite(vec![
            Operation::add(addr("server=default/security-setting=jms.#"), Attributes::new()),
            Operation::add(
                addr("server=default/security-setting=jms.#/role=admin"),
                attributes([("manage", json!(true))]),
            ),
            doomed(),
        ])
        .unwrap_err();

    assert!(h
        .broker("default")
        .unwrap()
        .inner()
        .security_match("jms.#")
        .is_none());
}

#[test]
fn destroyed_bridge_is_redeployed() {
    let mut h = booted();

    h.controller
        .execute_composite(vec![
            Operation::remove(addr("server=default/bridge=to-upstream")),
            doomed(),
        ])
        .unwrap_err();

    assert_eq!(
        h.broker("default").unwrap().inner().bridge_names(),
        vec!["to-upstream".to_string()]
    );
}

#[test]
fn forwarded_legacy_removal_is_rolled_back_with_its_primary() {
    let mut h = booted();

    h.controller
        .execute_composite(vec![
            Operation::remove(addr("server=default/jgroups-broadcast-group=bg-a")),
            doomed(),
        ])
        .unwrap_err();

    assert!(h.exists(&addr("server=default/broadcast-group=bg-a")));
    assert!(h.exists(&addr("server=default/jgroups-broadcast-group=bg-a")));
    assert!(h
        .registry
        .is_installed(&ServiceName::broadcast_binding("default", "bg-a")));
}
