//! Servers: starting a broker and installing the services that hang off it.

use std::sync::Arc;

use msr_model::{
    ConfigNode, KindFamily, OpKind, Operation, ResourceAddress, ResourceKind, SchemaGeneration,
    ServerDefinition, ServiceName,
};
use msr_runtime::{BrokerRuntime, RegistryError, ServiceDescriptor, ServiceKind};
use tracing::{debug, info, warn};

use super::{config_value, group, mark_reload};
use crate::context::OperationContext;
use crate::error::OperationFailure;
use crate::handler::{always, no_recovery, HandlerKey, HandlerRegistry, StepHandler};
use crate::types::NodeSnapshot;

const BROKER_FACTORY: &str = "broker-factory";

pub(super) fn register(reg: &mut HandlerRegistry) {
    reg.register(
        HandlerKey::current(KindFamily::Server, OpKind::Add),
        StepHandler {
            requires_runtime: always,
            perform_runtime: add,
            recover_on_rollback: undo_add,
        },
    );
    reg.register(
        HandlerKey::current(KindFamily::Server, OpKind::Remove),
        StepHandler {
            requires_runtime: has_server_service,
            perform_runtime: remove,
            recover_on_rollback: undo_remove,
        },
    );
    // Server attributes are read once at broker start.
    reg.register(
        HandlerKey::current(KindFamily::Server, OpKind::WriteAttribute),
        StepHandler {
            requires_runtime: server_is_live,
            perform_runtime: mark_reload,
            recover_on_rollback: no_recovery,
        },
    );
}

fn has_server_service(ctx: &OperationContext<'_>, op: &Operation, _: &NodeSnapshot) -> bool {
    op.address
        .name()
        .map(|s| ctx.registry().lookup(&ServiceName::server(s)).is_some())
        .unwrap_or(false)
}

fn server_is_live(ctx: &OperationContext<'_>, op: &Operation, _: &NodeSnapshot) -> bool {
    op.address
        .name()
        .map(|s| ctx.server_live(s))
        .unwrap_or(false)
}

fn add(
    ctx: &mut OperationContext<'_>,
    op: &Operation,
    snap: &NodeSnapshot,
) -> Result<(), OperationFailure> {
    let node = snap.after.as_ref().ok_or_else(|| OperationFailure::NotFound {
        address: op.address.to_string(),
    })?;
    materialize(ctx, node)
}

fn undo_add(ctx: &mut OperationContext<'_>, _: &Operation, snap: &NodeSnapshot) {
    if let Some(node) = snap.after.as_ref() {
        if let Err(e) = dematerialize(ctx, node) {
            warn!(server = %node.name, error = %e, "rollback could not stop server");
        }
    }
}

fn remove(
    ctx: &mut OperationContext<'_>,
    op: &Operation,
    snap: &NodeSnapshot,
) -> Result<(), OperationFailure> {
    let node = snap.before.as_ref().ok_or_else(|| OperationFailure::NotFound {
        address: op.address.to_string(),
    })?;
    dematerialize(ctx, node)
}

fn undo_remove(ctx: &mut OperationContext<'_>, _: &Operation, snap: &NodeSnapshot) {
    if let Some(node) = snap.before.as_ref() {
        if let Err(e) = materialize(ctx, node) {
            warn!(server = %node.name, error = %e, "rollback could not restart server");
        }
    }
}

/// Services owned by a server, dependents first and the server service last:
/// every broadcast binding, every discovery binding, the queue manager, the
/// server.
pub fn owned_services(node: &ConfigNode) -> Vec<ServiceName> {
    let server = node.name.as_str();
    let mut names: Vec<ServiceName> = current_groups(node, GroupFamily::Broadcast)
        .map(|g| ServiceName::broadcast_binding(server, &g.name))
        .collect();
    names.extend(
        current_groups(node, GroupFamily::Discovery)
            .map(|g| ServiceName::discovery_binding(server, &g.name)),
    );
    names.push(ServiceName::queue_manager(server));
    names.push(ServiceName::server(server));
    names
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum GroupFamily {
    Broadcast,
    Discovery,
}

fn current_groups(node: &ConfigNode, family: GroupFamily) -> impl Iterator<Item = &ConfigNode> {
    node.children().filter(move |c| {
        let matches = match c.kind {
            ResourceKind::BroadcastGroup(_) => family == GroupFamily::Broadcast,
            ResourceKind::DiscoveryGroup(_) => family == GroupFamily::Discovery,
            _ => false,
        };
        matches && c.kind.generation() == SchemaGeneration::Current
    })
}

/// Removes every service of the server. Issues one registry call per owned
/// service whether or not it is installed.
pub(crate) fn dematerialize(
    ctx: &OperationContext<'_>,
    node: &ConfigNode,
) -> Result<(), OperationFailure> {
    for name in owned_services(node) {
        let removal = ctx.registry().remove(&name)?;
        debug!(service = %name, ?removal, "server service removal");
    }
    purge_stale(ctx, &node.name);
    info!(server = %node.name, "server stopped");
    Ok(())
}

/// Drops services of `server` left `Down` by the loss of its server service.
/// A broker started later hosts their queues natively.
fn purge_stale(ctx: &OperationContext<'_>, server: &str) {
    let purged = ctx.registry().purge_down(&ServiceName::server(server));
    if !purged.is_empty() {
        debug!(server, purged = purged.len(), "stale services purged");
    }
}

/// Starts the server's broker and installs its services.
pub(crate) fn materialize(
    ctx: &OperationContext<'_>,
    node: &ConfigNode,
) -> Result<(), OperationFailure> {
    let server = node.name.as_str();
    let factory = ctx
        .broker_factory()
        .ok_or_else(|| OperationFailure::capability_missing(BROKER_FACTORY))?;
    let server_service = ServiceName::server(server);
    if ctx.registry().lookup(&server_service).is_some() {
        return Err(RegistryError::AlreadyInstalled {
            name: server_service,
        }
        .into());
    }

    purge_stale(ctx, server);

    let definition = definition_for(ctx, node);
    let broker = factory
        .start(&definition)
        .map_err(|e| OperationFailure::runtime(ResourceAddress::server(server), e))?;

    let mut installed = Vec::new();
    if let Err(err) = install_services(ctx, node, &broker, &definition, &mut installed) {
        for name in installed.iter().rev() {
            super::remove_quietly(ctx, name);
        }
        // without a server service nothing else owns the broker
        if installed.is_empty() {
            broker.stop();
        }
        return Err(err);
    }
    info!(server, services = installed.len(), "server started");
    Ok(())
}

fn install_services(
    ctx: &OperationContext<'_>,
    node: &ConfigNode,
    broker: &Arc<dyn BrokerRuntime>,
    definition: &ServerDefinition,
    installed: &mut Vec<ServiceName>,
) -> Result<(), OperationFailure> {
    let server = node.name.as_str();
    let server_service = ServiceName::server(server);
    ctx.registry().install(
        server_service.clone(),
        ServiceDescriptor::new(ServiceKind::Server, server)
            .with_broker(Arc::clone(broker))
            .with_config(config_value(definition)),
    )?;
    installed.push(server_service.clone());

    let manager = ServiceName::queue_manager(server);
    ctx.registry().install(
        manager.clone(),
        ServiceDescriptor::new(ServiceKind::QueueManager, server).requires(server_service),
    )?;
    installed.push(manager);

    for g in current_groups(node, GroupFamily::Broadcast)
        .chain(current_groups(node, GroupFamily::Discovery))
    {
        let (name, descriptor) = group::binding(server, g)?;
        ctx.registry().install(name.clone(), descriptor)?;
        installed.push(name);
    }
    Ok(())
}

/// Broker definition of the node, with cluster credentials defaulted from the
/// startup context.
fn definition_for(ctx: &OperationContext<'_>, node: &ConfigNode) -> ServerDefinition {
    let mut definition = ServerDefinition::from_node(node);
    let credentials = &ctx.startup().credentials;
    if definition.cluster_user.is_none() {
        definition.cluster_user = Some(credentials.user().to_string());
    }
    if definition.cluster_password.is_none() {
        definition.cluster_password = Some(credentials.password().to_string());
    }
    definition
}
