//! Broadcast and discovery groups.
//!
//! Current-schema groups own a binding service under their server; legacy
//! groups are configuration only.

use msr_model::{
    ConfigNode, GroupDefinition, KindFamily, OpKind, Operation, ResourceKind, ServiceName,
};
use msr_runtime::{ServiceDescriptor, ServiceKind};
use serde_json::Value;
use tracing::warn;

use super::{config_value, install_replacing_stale, mark_reload, remove_quietly, server_and_name};
use crate::context::OperationContext;
use crate::error::OperationFailure;
use crate::handler::{always, no_recovery, HandlerKey, HandlerRegistry, StepHandler};
use crate::types::NodeSnapshot;

pub(super) fn register(reg: &mut HandlerRegistry) {
    for family in [KindFamily::BroadcastGroup, KindFamily::DiscoveryGroup] {
        reg.register(
            HandlerKey::current(family, OpKind::Add),
            StepHandler {
                requires_runtime: always,
                perform_runtime: add,
                recover_on_rollback: undo_add,
            },
        );
        reg.register(
            HandlerKey::current(family, OpKind::Remove),
            StepHandler {
                requires_runtime: always,
                perform_runtime: remove,
                recover_on_rollback: undo_remove,
            },
        );
        reg.register(
            HandlerKey::current(family, OpKind::WriteAttribute),
            StepHandler {
                requires_runtime: always,
                perform_runtime: mark_reload,
                recover_on_rollback: no_recovery,
            },
        );
        for op in [OpKind::Add, OpKind::Remove, OpKind::WriteAttribute] {
            reg.register(HandlerKey::legacy(family, op), StepHandler::MODEL_ONLY);
        }
    }
}

/// Binding service of a group node under `server`.
pub(super) fn binding(
    server: &str,
    node: &ConfigNode,
) -> Result<(ServiceName, ServiceDescriptor), OperationFailure> {
    let (name, kind) = match node.kind {
        ResourceKind::BroadcastGroup(_) => (
            ServiceName::broadcast_binding(server, &node.name),
            ServiceKind::BroadcastBinding,
        ),
        ResourceKind::DiscoveryGroup(_) => (
            ServiceName::discovery_binding(server, &node.name),
            ServiceKind::DiscoveryBinding,
        ),
        _ => {
            return Err(OperationFailure::InvalidAddress {
                address: format!("server={server}/{}", node.element()),
            })
        }
    };
    let config = GroupDefinition::from_node(node)
        .map(|d| config_value(&d))
        .unwrap_or(Value::Null);
    Ok((
        name,
        ServiceDescriptor::new(kind, server)
            .requires(ServiceName::server(server))
            .with_config(config),
    ))
}

fn add(
    ctx: &mut OperationContext<'_>,
    op: &Operation,
    snap: &NodeSnapshot,
) -> Result<(), OperationFailure> {
    let (server, _) = server_and_name(&op.address)?;
    let node = snap.after.as_ref().ok_or_else(|| OperationFailure::NotFound {
        address: op.address.to_string(),
    })?;
    let (name, descriptor) = binding(server, node)?;
    install_replacing_stale(ctx, name, descriptor)?;
    // the broker itself only sees group changes on reload
    ctx.mark_reload_required();
    Ok(())
}

fn undo_add(ctx: &mut OperationContext<'_>, op: &Operation, snap: &NodeSnapshot) {
    let (Ok((server, _)), Some(node)) = (server_and_name(&op.address), snap.after.as_ref()) else {
        return;
    };
    if let Ok((name, _)) = binding(server, node) {
        remove_quietly(ctx, &name);
    }
}

fn remove(
    ctx: &mut OperationContext<'_>,
    op: &Operation,
    snap: &NodeSnapshot,
) -> Result<(), OperationFailure> {
    let (server, _) = server_and_name(&op.address)?;
    let node = snap.before.as_ref().ok_or_else(|| OperationFailure::NotFound {
        address: op.address.to_string(),
    })?;
    let (name, _) = binding(server, node)?;
    ctx.registry().remove(&name)?;
    ctx.mark_reload_required();
    Ok(())
}

fn undo_remove(ctx: &mut OperationContext<'_>, op: &Operation, snap: &NodeSnapshot) {
    let (Ok((server, _)), Some(node)) = (server_and_name(&op.address), snap.before.as_ref()) else {
        return;
    };
    let result = binding(server, node)
        .and_then(|(name, descriptor)| install_replacing_stale(ctx, name, descriptor));
    if let Err(e) = result {
        warn!(address = %op.address, error = %e, "rollback could not reinstall group binding");
    }
}
