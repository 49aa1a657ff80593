//! Legacy compatibility shim.
//!
//! Removing a current-schema broadcast or discovery group also removes its
//! legacy-schema sibling (same parent, same name) in the same transaction,
//! ahead of the primary removal:
//! - broadcast groups always forward when compatibility is enabled;
//! - discovery groups forward only when the legacy sibling exists.

use msr_model::{OpKind, Operation, ResourceKind, SchemaGeneration};

pub fn forwarded_operations(
    operation: &Operation,
    generation: SchemaGeneration,
    legacy_present: bool,
    legacy_compatibility: bool,
) -> Vec<Operation> {
    if !legacy_compatibility
        || generation != SchemaGeneration::Current
        || operation.op() != OpKind::Remove
    {
        return Vec::new();
    }
    let Some(kind) = operation.address.kind() else {
        return Vec::new();
    };
    let Some(legacy_kind) = kind.legacy_counterpart() else {
        return Vec::new();
    };
    let Some(sibling) = operation.address.sibling(legacy_kind) else {
        return Vec::new();
    };
    match kind {
        ResourceKind::BroadcastGroup(_) => vec![Operation::remove(sibling)],
        ResourceKind::DiscoveryGroup(_) if legacy_present => vec![Operation::remove(sibling)],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msr_model::{Attributes, GroupSchema, ResourceAddress};

    fn group(kind: ResourceKind) -> ResourceAddress {
        ResourceAddress::server("default").append(kind, "g1")
    }

    #[test]
    fn broadcast_group_removal_always_forwards() {
        let op = Operation::remove(group(ResourceKind::BroadcastGroup(GroupSchema::JGroups)));
        let fwd = forwarded_operations(&op, SchemaGeneration::Current, false, true);
        assert_eq!(fwd.len(), 1);
        assert_eq!(fwd[0].address.to_string(), "server=default/broadcast-group=g1");
        assert_eq!(fwd[0].op(), OpKind::Remove);
    }

    #[test]
    fn discovery_group_forwards_only_when_sibling_exists() {
        let op = Operation::remove(group(ResourceKind::DiscoveryGroup(GroupSchema::Socket)));
        assert!(forwarded_operations(&op, SchemaGeneration::Current, false, true).is_empty());
        assert_eq!(
            forwarded_operations(&op, SchemaGeneration::Current, true, true).len(),
            1
        );
    }

    #[test]
    fn nothing_forwarded_when_flag_off_or_not_a_remove() {
        let addr = group(ResourceKind::BroadcastGroup(GroupSchema::Socket));
        let remove = Operation::remove(addr.clone());
        assert!(forwarded_operations(&remove, SchemaGeneration::Current, true, false).is_empty());

        let add = Operation::add(addr, Attributes::new());
        assert!(forwarded_operations(&add, SchemaGeneration::Current, true, true).is_empty());
    }

    #[test]
    fn legacy_removals_are_never_forwarded() {
        let op = Operation::remove(group(ResourceKind::BroadcastGroup(GroupSchema::Legacy)));
        assert!(forwarded_operations(&op, SchemaGeneration::Legacy, true, true).is_empty());
    }
}
