//! Operation controller.
//!
//! Each call runs as one transaction over a working copy of the tree. Steps
//! run in order; a legacy sibling forwarded by the shim runs before the step
//! that caused it. The first failure rolls back every runtime action already
//! performed (newest first) and discards the working copy.

use std::sync::Arc;

use msr_config::StartupContext;
use msr_model::{
    ConfigNode, ConfigTree, Operation, OperationKind, ResourceAddress, ResourceKind, ServiceName,
};
use msr_runtime::{BrokerFactory, ComponentControlProxy, ControlOp, ServiceRegistry};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::context::{JournalEntry, OperationContext};
use crate::error::OperationFailure;
use crate::guard::{guard_add, Guarded};
use crate::handler::{HandlerKey, HandlerRegistry, StepHandler};
use crate::handlers;
use crate::shim;
use crate::types::{NodeSnapshot, Outcome, ProcessState, RuntimeStep, SkipReason, StepStatus};

pub struct Controller {
    tree: ConfigTree,
    registry: Arc<dyn ServiceRegistry>,
    broker_factory: Option<Arc<dyn BrokerFactory>>,
    startup: StartupContext,
    handlers: HandlerRegistry,
    state: ProcessState,
}

impl Controller {
    /// Empty tree, standard handlers, process `Running`, no broker factory.
    pub fn new(registry: Arc<dyn ServiceRegistry>, startup: StartupContext) -> Self {
        Self {
            tree: ConfigTree::new(),
            registry,
            broker_factory: None,
            startup,
            handlers: HandlerRegistry::standard(),
            state: ProcessState::Running,
        }
    }

    pub fn with_broker_factory(mut self, factory: Arc<dyn BrokerFactory>) -> Self {
        self.broker_factory = Some(factory);
        self
    }

    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn startup(&self) -> &StartupContext {
        &self.startup
    }

    pub fn registry(&self) -> &Arc<dyn ServiceRegistry> {
        &self.registry
    }

    pub fn execute(&mut self, op: Operation) -> Result<Outcome, OperationFailure> {
        self.execute_composite(vec![op])
    }

    /// Runs `ops` in a single transaction: all of them commit or none do.
    pub fn execute_composite(&mut self, ops: Vec<Operation>) -> Result<Outcome, OperationFailure> {
        let process = match self.state {
            ProcessState::Booting => ProcessState::Booting,
            _ => ProcessState::Running,
        };
        let outcome = self.transaction(&ops, process, false)?;
        if outcome.reload_required && self.state == ProcessState::Running {
            info!("process requires reload");
            self.state = ProcessState::ReloadRequired;
        }
        Ok(outcome)
    }

    /// Replays configured operations model-only, then starts every server.
    pub fn boot(&mut self, ops: Vec<Operation>) -> Result<Outcome, OperationFailure> {
        let previous = self.state;
        self.state = ProcessState::Booting;
        let result = self.transaction(&ops, ProcessState::Booting, true);
        self.state = match result {
            Ok(_) => ProcessState::Running,
            Err(_) => previous,
        };
        if let Ok(outcome) = &result {
            info!(steps = outcome.steps.len(), "boot complete");
        }
        result
    }

    /// Restarts every server from the committed tree.
    pub fn reload(&mut self) -> Result<(), OperationFailure> {
        let registry = Arc::clone(&self.registry);
        let factory = self.broker_factory.clone();
        let ctx = OperationContext::new(
            &self.tree,
            &*registry,
            factory.as_deref(),
            &self.startup,
            ProcessState::Running,
        );
        for node in self.tree.roots_of(ResourceKind::Server) {
            if ctx
                .registry()
                .lookup(&ServiceName::server(&node.name))
                .is_some()
            {
                handlers::dematerialize(&ctx, node)?;
            }
            handlers::materialize(&ctx, node)?;
        }
        self.state = ProcessState::Running;
        info!("reload complete");
        Ok(())
    }

    /// Runs a management operation against a live sub-resource.
    pub fn control(
        &self,
        address: &ResourceAddress,
        op: ControlOp,
    ) -> Result<Value, OperationFailure> {
        if !self.tree.exists(address) {
            return Err(OperationFailure::NotFound {
                address: address.to_string(),
            });
        }
        let proxy = ComponentControlProxy::for_address(address)?;
        Ok(proxy.invoke(address, &*self.registry, op)?)
    }

    fn transaction(
        &mut self,
        ops: &[Operation],
        process: ProcessState,
        start_servers: bool,
    ) -> Result<Outcome, OperationFailure> {
        let registry = Arc::clone(&self.registry);
        let factory = self.broker_factory.clone();
        let mut ctx = OperationContext::new(
            &self.tree,
            &*registry,
            factory.as_deref(),
            &self.startup,
            process,
        );

        let mut result = ops
            .iter()
            .try_for_each(|op| run_step(&self.handlers, &mut ctx, op, false));
        if result.is_ok() && start_servers {
            result = start_all_servers(&mut ctx);
        }
        if let Err(err) = result {
            roll_back(&mut ctx);
            warn!(error = %err, "transaction rolled back");
            return Err(err);
        }

        let (tree, outcome) = ctx.into_parts();
        self.tree = tree;
        Ok(outcome)
    }
}

/// Root-level connectors reference configuration owned outside any server.
pub fn is_external_reference(address: &ResourceAddress) -> bool {
    address.server_name().is_none()
}

fn run_step(
    handlers: &HandlerRegistry,
    ctx: &mut OperationContext<'_>,
    op: &Operation,
    forwarded: bool,
) -> Result<(), OperationFailure> {
    let kind = op
        .address
        .kind()
        .ok_or_else(|| OperationFailure::InvalidAddress {
            address: op.address.to_string(),
        })?;
    debug!(operation = %op, forwarded, "step dispatched");

    let legacy_present = kind
        .legacy_counterpart()
        .and_then(|k| op.address.sibling(k))
        .map(|a| ctx.tree().exists(&a))
        .unwrap_or(false);
    for legacy in shim::forwarded_operations(
        op,
        kind.generation(),
        legacy_present,
        ctx.startup().legacy_compatibility,
    ) {
        debug!(primary = %op.address, forwarded = %legacy, "legacy step forwarded");
        run_step(handlers, ctx, &legacy, true)?;
    }

    let Some(snapshot) = apply_to_tree(ctx, op, forwarded)? else {
        ctx.record_step(
            op,
            StepStatus::NoOp,
            RuntimeStep::Skipped(SkipReason::NoOp),
            forwarded,
        );
        return Ok(());
    };

    let handler = handlers.resolve(&HandlerKey::new(kind, op.op()));
    let runtime = match skip_reason(ctx, &handler, op, &snapshot) {
        Some(reason) => {
            debug!(operation = %op, ?reason, "runtime step skipped");
            RuntimeStep::Skipped(reason)
        }
        None => {
            ctx.take_note();
            (handler.perform_runtime)(ctx, op, &snapshot)?;
            let snapshot = NodeSnapshot {
                note: ctx.take_note(),
                ..snapshot
            };
            ctx.push_journal(JournalEntry {
                handler,
                operation: op.clone(),
                snapshot,
            });
            RuntimeStep::Applied
        }
    };
    ctx.record_step(op, StepStatus::Applied, runtime, forwarded);
    Ok(())
}

/// Tree half of a step. `None` means nothing to do.
fn apply_to_tree(
    ctx: &mut OperationContext<'_>,
    op: &Operation,
    forwarded: bool,
) -> Result<Option<NodeSnapshot>, OperationFailure> {
    let address = &op.address;
    match &op.kind {
        OperationKind::Add => {
            let guarded = guard_add(ctx, address, |ctx| -> Result<NodeSnapshot, OperationFailure> {
                ctx.tree_mut().insert(address, op.params.clone())?;
                Ok(NodeSnapshot {
                    before: None,
                    after: ctx.tree().read(address).cloned(),
                    note: None,
                })
            })?;
            match guarded {
                Guarded::Delegated(snapshot) => Ok(Some(snapshot)),
                Guarded::AlreadyPresent => {
                    debug!(%address, "add is a no-op, resource already present");
                    Ok(None)
                }
            }
        }
        OperationKind::Remove => {
            if forwarded && !ctx.tree().exists(address) {
                return Ok(None);
            }
            let before = ctx.tree_mut().remove(address)?;
            Ok(Some(NodeSnapshot {
                before: Some(before),
                after: None,
                note: None,
            }))
        }
        OperationKind::WriteAttribute { name, value } => {
            let before = ctx
                .tree()
                .read(address)
                .cloned()
                .ok_or_else(|| OperationFailure::NotFound {
                    address: address.to_string(),
                })?;
            ctx.tree_mut()
                .write_attribute(address, name, value.clone())?;
            Ok(Some(NodeSnapshot {
                before: Some(before),
                after: ctx.tree().read(address).cloned(),
                note: None,
            }))
        }
    }
}

/// Runtime action happens only if the handler wants it, the process is not
/// booting, the target is not an external reference and the owning server is
/// live. Server steps manage their own service and skip the last check.
fn skip_reason(
    ctx: &OperationContext<'_>,
    handler: &StepHandler,
    op: &Operation,
    snapshot: &NodeSnapshot,
) -> Option<SkipReason> {
    if !(handler.requires_runtime)(ctx, op, snapshot) {
        return Some(SkipReason::HandlerPolicy);
    }
    if ctx.process_state() == ProcessState::Booting {
        return Some(SkipReason::Booting);
    }
    if is_external_reference(&op.address) {
        return Some(SkipReason::ExternalReference);
    }
    if op.address.kind() == Some(ResourceKind::Server) {
        return None;
    }
    match op.address.server_name() {
        Some(server) if ctx.server_live(server) => None,
        _ => Some(SkipReason::ServerNotLive),
    }
}

fn start_all_servers(ctx: &mut OperationContext<'_>) -> Result<(), OperationFailure> {
    let servers: Vec<ConfigNode> = ctx
        .tree()
        .roots_of(ResourceKind::Server)
        .cloned()
        .collect();
    let mut started: Vec<&ConfigNode> = Vec::new();
    for node in &servers {
        if ctx
            .registry()
            .lookup(&ServiceName::server(&node.name))
            .is_some()
        {
            continue;
        }
        if let Err(err) = handlers::materialize(ctx, node) {
            for done in started.iter().rev() {
                if let Err(e) = handlers::dematerialize(ctx, done) {
                    warn!(server = %done.name, error = %e, "could not stop server after failed boot");
                }
            }
            return Err(err);
        }
        started.push(node);
    }
    Ok(())
}

fn roll_back(ctx: &mut OperationContext<'_>) {
    let journal = ctx.take_journal();
    for entry in journal.iter().rev() {
        debug!(operation = %entry.operation, "recovering runtime step");
        (entry.handler.recover_on_rollback)(ctx, &entry.operation, &entry.snapshot);
    }
}
