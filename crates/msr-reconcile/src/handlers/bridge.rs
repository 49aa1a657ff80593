//! Core bridges are deployed on the live broker directly.

use msr_model::{BridgeDefinition, KindFamily, OpKind, Operation};
use msr_runtime::RuntimeActionError;
use tracing::warn;

use super::{mark_reload, server_and_name};
use crate::context::OperationContext;
use crate::error::OperationFailure;
use crate::handler::{always, no_recovery, HandlerKey, HandlerRegistry, StepHandler};
use crate::types::NodeSnapshot;

const DESTROYED: &str = "bridge-destroyed";

pub(super) fn register(reg: &mut HandlerRegistry) {
    reg.register(
        HandlerKey::current(KindFamily::Bridge, OpKind::Add),
        StepHandler {
            requires_runtime: always,
            perform_runtime: add,
            recover_on_rollback: undo_add,
        },
    );
    reg.register(
        HandlerKey::current(KindFamily::Bridge, OpKind::Remove),
        StepHandler {
            requires_runtime: always,
            perform_runtime: remove,
            recover_on_rollback: undo_remove,
        },
    );
    reg.register(
        HandlerKey::current(KindFamily::Bridge, OpKind::WriteAttribute),
        StepHandler {
            requires_runtime: always,
            perform_runtime: mark_reload,
            recover_on_rollback: no_recovery,
        },
    );
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
    let broker = ctx
        .live_broker(server)
        .ok_or_else(|| OperationFailure::NotMaterialized {
            server: server.to_string(),
        })?;
    broker
        .deploy_bridge(&BridgeDefinition::from_node(node))
        .map_err(|e| OperationFailure::runtime(&op.address, e))
}

fn undo_add(ctx: &mut OperationContext<'_>, op: &Operation, _: &NodeSnapshot) {
    let Ok((server, name)) = server_and_name(&op.address) else {
        return;
    };
    if let Some(broker) = ctx.live_broker(server) {
        if let Err(e) = broker.destroy_bridge(name) {
            warn!(address = %op.address, error = %e, "rollback could not destroy bridge");
        }
    }
}

fn remove(
    ctx: &mut OperationContext<'_>,
    op: &Operation,
    _: &NodeSnapshot,
) -> Result<(), OperationFailure> {
    let (server, name) = server_and_name(&op.address)?;
    let broker = ctx
        .live_broker(server)
        .ok_or_else(|| OperationFailure::NotMaterialized {
            server: server.to_string(),
        })?;
    match broker.destroy_bridge(name) {
        Ok(()) => {
            ctx.note(DESTROYED);
            Ok(())
        }
        Err(RuntimeActionError::Unsupported { capability }) => {
            Err(OperationFailure::CapabilityMissing { capability })
        }
        Err(e) => {
            ctx.warn(format!(
                "bridge '{name}' removed from configuration but not from the broker: {e}"
            ));
            Ok(())
        }
    }
}

fn undo_remove(ctx: &mut OperationContext<'_>, op: &Operation, snap: &NodeSnapshot) {
    if snap.note != Some(DESTROYED) {
        return;
    }
    let (Ok((server, _)), Some(node)) = (server_and_name(&op.address), snap.before.as_ref()) else {
        return;
    };
    if let Some(broker) = ctx.live_broker(server) {
        if let Err(e) = broker.deploy_bridge(&BridgeDefinition::from_node(node)) {
            warn!(address = %op.address, error = %e, "rollback could not redeploy bridge");
        }
    }
}
