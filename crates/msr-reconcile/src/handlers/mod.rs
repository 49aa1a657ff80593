//! Lifecycle step handlers, one module per resource family.

mod bridge;
mod group;
mod queue;
mod security;
mod server;
mod transport;

use msr_model::{ResourceAddress, ServiceName};
use msr_runtime::{RegistryError, ServiceDescriptor};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::OperationContext;
use crate::error::OperationFailure;
use crate::handler::HandlerRegistry;
use crate::types::NodeSnapshot;
use msr_model::Operation;

pub(crate) use server::{dematerialize, materialize};
pub use server::owned_services;

pub(crate) fn register_standard(reg: &mut HandlerRegistry) {
    server::register(reg);
    transport::register(reg);
    queue::register(reg);
    bridge::register(reg);
    security::register(reg);
    group::register(reg);
}

/// Runtime action for changes the broker only picks up on reload.
fn mark_reload(
    ctx: &mut OperationContext<'_>,
    op: &Operation,
    _: &NodeSnapshot,
) -> Result<(), OperationFailure> {
    debug!(operation = %op, "change deferred until reload");
    ctx.mark_reload_required();
    Ok(())
}

fn server_and_name(address: &ResourceAddress) -> Result<(&str, &str), OperationFailure> {
    match (address.server_name(), address.name()) {
        (Some(server), Some(name)) => Ok((server, name)),
        _ => Err(OperationFailure::InvalidAddress {
            address: address.to_string(),
        }),
    }
}

fn config_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Installs `name`, first clearing an entry left `Down` by an earlier
/// cascade. A live entry under the same name is an error.
fn install_replacing_stale(
    ctx: &OperationContext<'_>,
    name: ServiceName,
    descriptor: ServiceDescriptor,
) -> Result<(), OperationFailure> {
    if let Some(existing) = ctx.registry().lookup(&name) {
        if existing.is_up() {
            return Err(RegistryError::AlreadyInstalled { name }.into());
        }
        debug!(service = %name, "replacing stale service");
        ctx.registry().remove(&name)?;
    }
    ctx.registry().install(name, descriptor)?;
    Ok(())
}

/// Rollback-time removal; failures are logged only.
fn remove_quietly(ctx: &OperationContext<'_>, name: &ServiceName) {
    if let Err(e) = ctx.registry().remove(name) {
        warn!(service = %name, error = %e, "rollback could not remove service");
    }
}
