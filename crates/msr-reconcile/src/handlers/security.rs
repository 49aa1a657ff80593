//! Security settings and roles.
//!
//! A security setting is one address match in the broker's security
//! repository; its roles are the match's permissions. Any role change
//! re-publishes the whole match as it now stands in the working tree.

use msr_model::{
    KindFamily, OpKind, Operation, OperationKind, ResourceAddress, ResourceKind, SecurityMatch,
    ROLE_PERMISSION_ATTRIBUTES,
};
use msr_runtime::RuntimeActionError;
use tracing::warn;

use super::{mark_reload, server_and_name};
use crate::context::OperationContext;
use crate::error::OperationFailure;
use crate::handler::{always, no_recovery, HandlerKey, HandlerRegistry, StepHandler};
use crate::types::NodeSnapshot;

pub(super) fn register(reg: &mut HandlerRegistry) {
    let publish = StepHandler {
        requires_runtime: always,
        perform_runtime: publish_match,
        recover_on_rollback: restore_match,
    };
    reg.register(HandlerKey::current(KindFamily::SecuritySetting, OpKind::Add), publish);
    reg.register(
        HandlerKey::current(KindFamily::SecuritySetting, OpKind::Remove),
        StepHandler {
            requires_runtime: always,
            perform_runtime: withdraw_match,
            recover_on_rollback: restore_match,
        },
    );
    reg.register(
        HandlerKey::current(KindFamily::SecuritySetting, OpKind::WriteAttribute),
        StepHandler {
            requires_runtime: always,
            perform_runtime: mark_reload,
            recover_on_rollback: no_recovery,
        },
    );

    reg.register(HandlerKey::current(KindFamily::Role, OpKind::Add), publish);
    reg.register(HandlerKey::current(KindFamily::Role, OpKind::Remove), publish);
    reg.register(
        HandlerKey::current(KindFamily::Role, OpKind::WriteAttribute),
        StepHandler {
            requires_runtime: is_permission_write,
            perform_runtime: publish_match,
            recover_on_rollback: restore_match,
        },
    );
}

/// Permissions are live; other role attributes are configuration only.
fn is_permission_write(_: &OperationContext<'_>, op: &Operation, _: &NodeSnapshot) -> bool {
    match &op.kind {
        OperationKind::WriteAttribute { name, .. } => {
            ROLE_PERMISSION_ATTRIBUTES.contains(&name.as_str())
        }
        _ => false,
    }
}

/// Address of the security setting an operation touches.
fn setting_address(address: &ResourceAddress) -> Option<ResourceAddress> {
    match address.kind()? {
        ResourceKind::Role => address.parent(),
        ResourceKind::SecuritySetting => Some(address.clone()),
        _ => None,
    }
}

fn invalid(address: &ResourceAddress) -> OperationFailure {
    OperationFailure::InvalidAddress {
        address: address.to_string(),
    }
}

/// Broker failures during a remove are downgraded to outcome warnings.
fn settle(
    ctx: &mut OperationContext<'_>,
    op: &Operation,
    result: Result<(), RuntimeActionError>,
) -> Result<(), OperationFailure> {
    match result {
        Ok(()) => Ok(()),
        Err(RuntimeActionError::Unsupported { capability }) => {
            Err(OperationFailure::CapabilityMissing { capability })
        }
        Err(e) if op.op() == OpKind::Remove => {
            ctx.warn(format!(
                "'{}' removed from configuration but the security repository was not updated: {e}",
                op.address
            ));
            Ok(())
        }
        Err(e) => Err(OperationFailure::runtime(&op.address, e)),
    }
}

fn publish_match(
    ctx: &mut OperationContext<'_>,
    op: &Operation,
    _: &NodeSnapshot,
) -> Result<(), OperationFailure> {
    let (server, _) = server_and_name(&op.address)?;
    let setting = setting_address(&op.address).ok_or_else(|| invalid(&op.address))?;
    let security = ctx
        .tree()
        .read(&setting)
        .map(SecurityMatch::from_node)
        .ok_or_else(|| OperationFailure::NotFound {
            address: setting.to_string(),
        })?;
    let broker = ctx
        .live_broker(server)
        .ok_or_else(|| OperationFailure::NotMaterialized {
            server: server.to_string(),
        })?;
    let result = broker.add_security_match(&security);
    settle(ctx, op, result)
}

fn withdraw_match(
    ctx: &mut OperationContext<'_>,
    op: &Operation,
    _: &NodeSnapshot,
) -> Result<(), OperationFailure> {
    let (server, pattern) = server_and_name(&op.address)?;
    let broker = ctx
        .live_broker(server)
        .ok_or_else(|| OperationFailure::NotMaterialized {
            server: server.to_string(),
        })?;
    let result = broker.remove_security_match(pattern);
    settle(ctx, op, result)
}

/// Puts the match back the way the committed tree describes it.
fn restore_match(ctx: &mut OperationContext<'_>, op: &Operation, _: &NodeSnapshot) {
    let (Ok((server, _)), Some(setting)) =
        (server_and_name(&op.address), setting_address(&op.address))
    else {
        return;
    };
    let Some(broker) = ctx.live_broker(server) else {
        return;
    };
    let result = match ctx.committed().read(&setting) {
        Some(node) => broker.add_security_match(&SecurityMatch::from_node(node)),
        None => broker.remove_security_match(setting.name().unwrap_or_default()),
    };
    if let Err(e) = result {
        warn!(address = %op.address, error = %e, "rollback could not restore security match");
    }
}
