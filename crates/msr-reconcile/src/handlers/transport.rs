//! Acceptors, connectors and cluster connections.
//!
//! The broker binds its network layer once at start, so every change to these
//! on a live server is recorded and deferred to the next reload. Root-level
//! connectors are external references and never reach this point.

use msr_model::{KindFamily, OpKind};

use super::mark_reload;
use crate::handler::{always, no_recovery, HandlerKey, HandlerRegistry, StepHandler};

pub(super) fn register(reg: &mut HandlerRegistry) {
    let deferred = StepHandler {
        requires_runtime: always,
        perform_runtime: mark_reload,
        recover_on_rollback: no_recovery,
    };
    for family in [
        KindFamily::Acceptor,
        KindFamily::Connector,
        KindFamily::ClusterConnection,
    ] {
        for op in [OpKind::Add, OpKind::Remove, OpKind::WriteAttribute] {
            reg.register(HandlerKey::current(family, op), deferred);
        }
    }
}
