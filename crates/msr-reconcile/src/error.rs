use std::fmt;

use msr_model::TreeError;
use msr_runtime::{ControlError, RegistryError, RuntimeActionError};

/// Typed failure of an operation step. Any failure aborts the enclosing
/// transaction and rolls it back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationFailure {
    InvalidAddress { address: String },
    NotFound { address: String },
    ParentMissing { address: String },
    AlreadyExists { address: String },
    InvalidNesting { address: String },
    /// The owning server has no live runtime.
    NotMaterialized { server: String },
    NoSuchResource { resource_name: String },
    /// A broker call failed while adding or writing.
    RuntimeAction {
        address: String,
        source: RuntimeActionError,
    },
    /// A required platform capability is unavailable. Always fatal.
    CapabilityMissing { capability: String },
    Registry(RegistryError),
}

impl OperationFailure {
    /// Maps a broker failure: unsupported capabilities are fatal as
    /// `CapabilityMissing`, everything else is a `RuntimeAction` failure.
    pub fn runtime(address: impl fmt::Display, err: RuntimeActionError) -> Self {
        match err {
            RuntimeActionError::Unsupported { capability } => Self::CapabilityMissing { capability },
            other => Self::RuntimeAction {
                address: address.to_string(),
                source: other,
            },
        }
    }

    pub fn capability_missing(capability: impl Into<String>) -> Self {
        Self::CapabilityMissing {
            capability: capability.into(),
        }
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress { address } => write!(f, "invalid address '{address}'"),
            Self::NotFound { address } => write!(f, "resource '{address}' not found"),
            Self::ParentMissing { address } => write!(f, "parent of '{address}' does not exist"),
            Self::AlreadyExists { address } => write!(f, "resource '{address}' already exists"),
            Self::InvalidNesting { address } => {
                write!(f, "resource '{address}' cannot be placed under its parent")
            }
            Self::NotMaterialized { server } => write!(f, "server '{server}' is not running"),
            Self::NoSuchResource { resource_name } => {
                write!(f, "no runtime resource registered as '{resource_name}'")
            }
            Self::RuntimeAction { address, source } => {
                write!(f, "runtime action on '{address}' failed: {source}")
            }
            Self::CapabilityMissing { capability } => {
                write!(f, "required capability '{capability}' is not available")
            }
            Self::Registry(e) => write!(f, "service registry: {e}"),
        }
    }
}

impl std::error::Error for OperationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RuntimeAction { source, .. } => Some(source),
            Self::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TreeError> for OperationFailure {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::RootAddress => Self::InvalidAddress {
                address: "/".to_string(),
            },
            TreeError::NotFound { address } => Self::NotFound { address },
            TreeError::ParentMissing { address } => Self::ParentMissing { address },
            TreeError::AlreadyExists { address } => Self::AlreadyExists { address },
            TreeError::InvalidNesting { address } => Self::InvalidNesting { address },
        }
    }
}

impl From<RegistryError> for OperationFailure {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

impl From<ControlError> for OperationFailure {
    fn from(e: ControlError) -> Self {
        match e {
            ControlError::InvalidAddress { address } => Self::InvalidAddress { address },
            ControlError::NotMaterialized { server } => Self::NotMaterialized { server },
            ControlError::NoSuchResource { resource_name } => Self::NoSuchResource { resource_name },
            ControlError::Action(err) => Self::runtime("component", err),
        }
    }
}
