//! msr-model
//!
//! Configuration model of a messaging subsystem: resource kinds, addresses,
//! the persisted tree, service names and the operations that mutate the tree.
//!
//! Pure data. No IO, no runtime services.

mod address;
mod definitions;
mod kind;
mod node;
mod operation;
mod service_name;
mod tree;

pub use address::{AddressError, PathElement, ResourceAddress};
pub use definitions::{
    broker_param_key, BridgeDefinition, GroupDefinition, GroupSchemaView, QueueDefinition,
    RolePermissions, SecurityMatch, ServerDefinition, TransportDefinition, TransportDirection,
    ROLE_PERMISSION_ATTRIBUTES,
};
pub use kind::{
    GroupSchema, KindFamily, ResourceKind, SchemaGeneration, TransportFlavor, UnknownKind,
};
pub use node::{Attributes, ConfigNode};
pub use operation::{OpKind, Operation, OperationKind};
pub use service_name::ServiceName;
pub use tree::{ConfigTree, TreeError};

/// Builds an attribute map from `(name, value)` pairs.
pub fn attributes<I, K>(items: I) -> Attributes
where
    I: IntoIterator<Item = (K, serde_json::Value)>,
    K: Into<String>,
{
    items.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
