//! Queues.
//!
//! A queue added while its server is live is deployed on the broker and owned
//! by a queue service; removing the service destroys the queue. Queues that
//! reached the broker any other way (started with the server, created on the
//! broker directly) have no service; removing those falls back to the
//! broker's native destroy.

use std::sync::Arc;

use msr_model::{KindFamily, OpKind, Operation, QueueDefinition, ServiceName};
use msr_runtime::{RuntimeActionError, ServiceDescriptor, ServiceKind};
use tracing::{debug, warn};

use super::{config_value, install_replacing_stale, mark_reload, remove_quietly, server_and_name};
use crate::context::OperationContext;
use crate::error::OperationFailure;
use crate::handler::{always, no_recovery, HandlerKey, HandlerRegistry, StepHandler};
use crate::types::NodeSnapshot;

const VIA_SERVICE: &str = "queue-service";
const VIA_NATIVE_DESTROY: &str = "native-destroy";

pub(super) fn register(reg: &mut HandlerRegistry) {
    reg.register(
        HandlerKey::current(KindFamily::Queue, OpKind::Add),
        StepHandler {
            requires_runtime: always,
            perform_runtime: add,
            recover_on_rollback: undo_add,
        },
    );
    reg.register(
        HandlerKey::current(KindFamily::Queue, OpKind::Remove),
        StepHandler {
            requires_runtime: always,
            perform_runtime: remove,
            recover_on_rollback: undo_remove,
        },
    );
    reg.register(
        HandlerKey::current(KindFamily::Queue, OpKind::WriteAttribute),
        StepHandler {
            requires_runtime: always,
            perform_runtime: mark_reload,
            recover_on_rollback: no_recovery,
        },
    );
}

/// Creates the queue on the live broker and installs the queue service that
/// owns it. Removing the service destroys the queue again.
fn deploy_with_service(
    ctx: &OperationContext<'_>,
    op: &Operation,
    server: &str,
    name: &str,
    definition: &QueueDefinition,
) -> Result<(), OperationFailure> {
    let broker = ctx
        .live_broker(server)
        .ok_or_else(|| OperationFailure::NotMaterialized {
            server: server.to_string(),
        })?;
    broker
        .deploy_queue(definition)
        .map_err(|e| OperationFailure::runtime(&op.address, e))?;
    let descriptor = ServiceDescriptor::new(ServiceKind::Queue, server)
        .requires(ServiceName::server(server))
        .with_broker(Arc::clone(&broker))
        .with_config(config_value(definition));
    if let Err(err) = install_replacing_stale(ctx, ServiceName::queue(server, name), descriptor) {
        if let Err(e) = broker.destroy_queue(name) {
            warn!(queue = name, error = %e, "could not destroy queue after failed service install");
        }
        return Err(err);
    }
    Ok(())
}

fn add(
    ctx: &mut OperationContext<'_>,
    op: &Operation,
    snap: &NodeSnapshot,
) -> Result<(), OperationFailure> {
    let (server, name) = server_and_name(&op.address)?;
    let node = snap.after.as_ref().ok_or_else(|| OperationFailure::NotFound {
        address: op.address.to_string(),
    })?;
    deploy_with_service(ctx, op, server, name, &QueueDefinition::from_node(node))
}

fn undo_add(ctx: &mut OperationContext<'_>, op: &Operation, _: &NodeSnapshot) {
    if let Ok((server, name)) = server_and_name(&op.address) {
        remove_quietly(ctx, &ServiceName::queue(server, name));
    }
}

fn remove(
    ctx: &mut OperationContext<'_>,
    op: &Operation,
    _: &NodeSnapshot,
) -> Result<(), OperationFailure> {
    let (server, name) = server_and_name(&op.address)?;
    let service = ServiceName::queue(server, name);
    let existing = ctx.registry().lookup(&service);
    match existing {
        Some(entry) if entry.is_up() => {
            ctx.registry().remove(&service)?;
            ctx.note(VIA_SERVICE);
            return Ok(());
        }
        Some(_) => {
            // left behind by a cascade; the queue itself lives on natively
            debug!(service = %service, "dropping stale queue service");
            ctx.registry().remove(&service)?;
        }
        None => {}
    }

    let broker = ctx
        .live_broker(server)
        .ok_or_else(|| OperationFailure::NotMaterialized {
            server: server.to_string(),
        })?;
    match broker.destroy_queue(name) {
        Ok(()) => {
            ctx.note(VIA_NATIVE_DESTROY);
            Ok(())
        }
        Err(RuntimeActionError::Unsupported { capability }) => {
            Err(OperationFailure::CapabilityMissing { capability })
        }
        Err(e) => {
            ctx.warn(format!(
                "queue '{name}' removed from configuration but not from the broker: {e}"
            ));
            Ok(())
        }
    }
}

fn undo_remove(ctx: &mut OperationContext<'_>, op: &Operation, snap: &NodeSnapshot) {
    let (Ok((server, name)), Some(node)) = (server_and_name(&op.address), snap.before.as_ref())
    else {
        return;
    };
    let definition = QueueDefinition::from_node(node);
    let result = match snap.note {
        Some(VIA_SERVICE) => deploy_with_service(ctx, op, server, name, &definition),
        Some(VIA_NATIVE_DESTROY) => match ctx.live_broker(server) {
            Some(broker) => broker
                .deploy_queue(&definition)
                .map_err(|e| OperationFailure::runtime(&op.address, e)),
            None => Ok(()),
        },
        _ => Ok(()),
    };
    if let Err(e) = result {
        warn!(address = %op.address, error = %e, "rollback could not restore queue");
    }
}
