//! Idempotent-add guard.
//!
//! An add whose target already exists under its parent completes as a no-op;
//! the delegate never runs, so neither the tree nor the runtime is touched.

use msr_model::ResourceAddress;

use crate::context::OperationContext;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Guarded<T> {
    Delegated(T),
    AlreadyPresent,
}

pub fn guard_add<'a, T, E, F>(
    ctx: &mut OperationContext<'a>,
    address: &ResourceAddress,
    delegate: F,
) -> Result<Guarded<T>, E>
where
    F: FnOnce(&mut OperationContext<'a>) -> Result<T, E>,
{
    if ctx.tree().has_child(address) {
        return Ok(Guarded::AlreadyPresent);
    }
    delegate(ctx).map(Guarded::Delegated)
}
