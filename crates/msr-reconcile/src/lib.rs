//! msr-reconcile
//!
//! Applies administrative operations to the configuration tree and keeps the
//! runtime services in step with it.
//!
//! - Every add goes through the idempotent-add guard.
//! - Runtime actions run only for a running process, a non-external target
//!   and a live owning server; otherwise the step is model-only.
//! - Removals tear down dependent services before the primary one.
//! - Removing a current-schema group also removes its legacy sibling, in the
//!   same transaction and first.
//! - A failed transaction undoes its runtime actions and discards its tree
//!   changes.

mod context;
mod controller;
mod error;
mod guard;
mod handler;
mod handlers;
mod shim;
mod types;

pub use context::OperationContext;
pub use controller::{is_external_reference, Controller};
pub use error::OperationFailure;
pub use guard::{guard_add, Guarded};
pub use handler::{
    always, never, no_recovery, nothing, HandlerKey, HandlerRegistry, Recovery, RuntimeAction,
    RuntimePolicy, StepHandler,
};
pub use handlers::owned_services;
pub use shim::forwarded_operations;
pub use types::{
    NodeSnapshot, Outcome, ProcessState, RuntimeStep, SkipReason, StepReport, StepStatus,
};
