//! Administrative operations addressed at tree nodes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::ResourceAddress;
use crate::node::Attributes;

/// Dispatch tag of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpKind {
    Add,
    Remove,
    WriteAttribute,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum OperationKind {
    Add,
    Remove,
    WriteAttribute { name: String, value: Value },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub address: ResourceAddress,
    #[serde(flatten)]
    pub kind: OperationKind,
    /// Initial attributes for `add`; ignored otherwise.
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub params: Attributes,
}

impl Operation {
    pub fn add(address: ResourceAddress, params: Attributes) -> Self {
        Self {
            address,
            kind: OperationKind::Add,
            params,
        }
    }

    pub fn remove(address: ResourceAddress) -> Self {
        Self {
            address,
            kind: OperationKind::Remove,
            params: Attributes::new(),
        }
    }

    pub fn write_attribute(address: ResourceAddress, name: impl Into<String>, value: Value) -> Self {
        Self {
            address,
            kind: OperationKind::WriteAttribute {
                name: name.into(),
                value,
            },
            params: Attributes::new(),
        }
    }

    pub fn op(&self) -> OpKind {
        match self.kind {
            OperationKind::Add => OpKind::Add,
            OperationKind::Remove => OpKind::Remove,
            OperationKind::WriteAttribute { .. } => OpKind::WriteAttribute,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OperationKind::Add => write!(f, "{}:add", self.address),
            OperationKind::Remove => write!(f, "{}:remove", self.address),
            OperationKind::WriteAttribute { name, .. } => {
                write!(f, "{}:write-attribute(name={name})", self.address)
            }
        }
    }
}
