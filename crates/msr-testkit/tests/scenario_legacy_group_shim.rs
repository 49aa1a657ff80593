//! Scenario: removing a current-schema group forwards a remove to its legacy
//! sibling inside the same transaction, before the primary removal.
//!
//! - broadcast group: always exactly one forwarded remove;
//! - discovery group: forwarded only when the legacy sibling exists;
//! - compatibility flag off: nothing forwarded.

use msr_config::{ClusterCredentials, StartupContext};
use msr_model::{Operation, ResourceAddress, ServiceName};
use msr_reconcile::{RuntimeStep, SkipReason, StepStatus};
use msr_testkit::Harness;

fn addr(s: &str) -> ResourceAddress {
    s.parse().unwrap()
}

fn booted() -> Harness {
    let mut h = Harness::new();
    h.boot_standard().unwrap();
    h
}

#[test]
fn discovery_group_without_legacy_sibling_forwards_nothing() {
    let mut h = booted();
    let outcome = h
        .execute(Operation::remove(addr(
            "server=default/socket-discovery-group=dg-b",
        )))
        .unwrap();

    assert!(outcome.forwarded().is_empty());
    assert_eq!(outcome.steps.len(), 1);
    assert_eq!(
        h.registry.removals(),
        vec![ServiceName::discovery_binding("default", "dg-b")]
    );
    assert!(!h.exists(&addr("server=default/socket-discovery-group=dg-b")));
}

#[test]
fn discovery_group_with_legacy_sibling_removes_both() {
    let mut h = booted();
    let outcome = h
        .execute(Operation::remove(addr(
            "server=default/jgroups-discovery-group=dg-a",
        )))
        .unwrap();

    let forwarded: Vec<String> = outcome.forwarded().iter().map(|a| a.to_string()).collect();
    assert_eq!(forwarded, vec!["server=default/discovery-group=dg-a"]);
    assert!(outcome.steps[0].forwarded);
    assert_eq!(
        outcome.steps[0].runtime,
        RuntimeStep::Skipped(SkipReason::HandlerPolicy)
    );
    assert!(!h.exists(&addr("server=default/discovery-group=dg-a")));
    assert!(!h.exists(&addr("server=default/jgroups-discovery-group=dg-a")));
}

#[test]
fn broadcast_group_always_forwards_exactly_one_remove_first() {
    let mut h = booted();
    // bg-b has no legacy sibling
    let outcome = h
        .execute(Operation::remove(addr(
            "server=default/socket-broadcast-group=bg-b",
        )))
        .unwrap();

    assert_eq!(outcome.forwarded().len(), 1);
    assert_eq!(outcome.steps.len(), 2);
    let legacy = &outcome.steps[0];
    assert!(legacy.forwarded);
    assert_eq!(
        legacy.operation.address.to_string(),
        "server=default/broadcast-group=bg-b"
    );
    assert_eq!(legacy.status, StepStatus::NoOp);
    let primary = &outcome.steps[1];
    assert!(!primary.forwarded);
    assert_eq!(primary.status, StepStatus::Applied);
    assert_eq!(primary.runtime, RuntimeStep::Applied);
}

#[test]
fn broadcast_group_with_legacy_sibling_removes_it_first() {
    let mut h = booted();
    let outcome = h
        .execute(Operation::remove(addr(
            "server=default/jgroups-broadcast-group=bg-a",
        )))
        .unwrap();

    assert_eq!(outcome.steps[0].status, StepStatus::Applied);
    assert!(outcome.steps[0].forwarded);
    assert!(!h.exists(&addr("server=default/broadcast-group=bg-a")));
    assert!(outcome.reload_required);
}

#[test]
fn compatibility_flag_off_forwards_nothing() {
    let mut h = Harness::with_startup(StartupContext::new(ClusterCredentials::generated(), false));
    h.boot_standard().unwrap();

    let outcome = h
        .execute(Operation::remove(addr(
            "server=default/jgroups-broadcast-group=bg-a",
        )))
        .unwrap();

    assert!(outcome.forwarded().is_empty());
    assert!(h.exists(&addr("server=default/broadcast-group=bg-a")));
}

#[test]
fn legacy_group_removal_is_model_only() {
    let mut h = booted();
    let outcome = h
        .execute(Operation::remove(addr("server=default/broadcast-group=bg-a")))
        .unwrap();

    assert!(outcome.forwarded().is_empty());
    assert!(h.registry.calls().is_empty());
    assert!(h.exists(&addr("server=default/jgroups-broadcast-group=bg-a")));
}
