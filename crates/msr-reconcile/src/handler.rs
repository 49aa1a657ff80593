//! Handler dispatch: `(kind family, schema generation, op)` → step handler.

use std::collections::BTreeMap;

use msr_model::{KindFamily, OpKind, Operation, ResourceKind, SchemaGeneration};

use crate::context::OperationContext;
use crate::error::OperationFailure;
use crate::types::NodeSnapshot;

/// Handler's own opinion on whether the step needs a runtime action. The
/// controller additionally requires a running process, a non-external target
/// and a live owning server.
pub type RuntimePolicy = fn(&OperationContext<'_>, &Operation, &NodeSnapshot) -> bool;

pub type RuntimeAction =
    fn(&mut OperationContext<'_>, &Operation, &NodeSnapshot) -> Result<(), OperationFailure>;

/// Undoes a performed runtime action. Best effort; problems are logged.
pub type Recovery = fn(&mut OperationContext<'_>, &Operation, &NodeSnapshot);

#[derive(Clone, Copy)]
pub struct StepHandler {
    pub requires_runtime: RuntimePolicy,
    pub perform_runtime: RuntimeAction,
    pub recover_on_rollback: Recovery,
}

impl std::fmt::Debug for StepHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepHandler").finish_non_exhaustive()
    }
}

impl StepHandler {
    /// Tree mutation only.
    pub const MODEL_ONLY: StepHandler = StepHandler {
        requires_runtime: never,
        perform_runtime: nothing,
        recover_on_rollback: no_recovery,
    };
}

pub fn always(_: &OperationContext<'_>, _: &Operation, _: &NodeSnapshot) -> bool {
    true
}

pub fn never(_: &OperationContext<'_>, _: &Operation, _: &NodeSnapshot) -> bool {
    false
}

pub fn nothing(
    _: &mut OperationContext<'_>,
    _: &Operation,
    _: &NodeSnapshot,
) -> Result<(), OperationFailure> {
    Ok(())
}

pub fn no_recovery(_: &mut OperationContext<'_>, _: &Operation, _: &NodeSnapshot) {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerKey {
    pub family: KindFamily,
    pub generation: SchemaGeneration,
    pub op: OpKind,
}

impl HandlerKey {
    pub fn new(kind: ResourceKind, op: OpKind) -> Self {
        Self {
            family: kind.family(),
            generation: kind.generation(),
            op,
        }
    }

    pub fn current(family: KindFamily, op: OpKind) -> Self {
        Self {
            family,
            generation: SchemaGeneration::Current,
            op,
        }
    }

    pub fn legacy(family: KindFamily, op: OpKind) -> Self {
        Self {
            family,
            generation: SchemaGeneration::Legacy,
            op,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<HandlerKey, StepHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers for every resource kind of the subsystem.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        crate::handlers::register_standard(&mut reg);
        reg
    }

    /// Registers `handler`, returning the one it replaces.
    pub fn register(&mut self, key: HandlerKey, handler: StepHandler) -> Option<StepHandler> {
        self.handlers.insert(key, handler)
    }

    /// Missing keys fall back to [`StepHandler::MODEL_ONLY`].
    pub fn resolve(&self, key: &HandlerKey) -> StepHandler {
        self.handlers
            .get(key)
            .copied()
            .unwrap_or(StepHandler::MODEL_ONLY)
    }

    pub fn contains(&self, key: &HandlerKey) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
