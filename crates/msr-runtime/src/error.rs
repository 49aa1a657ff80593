use std::fmt;

use msr_model::ServiceName;

/// Failures reported by a service registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    AlreadyInstalled { name: ServiceName },
    /// A required service is not installed.
    MissingDependency {
        name: ServiceName,
        requires: ServiceName,
    },
    /// Removal refused while other services still require this one.
    DependentsExist {
        name: ServiceName,
        dependents: Vec<ServiceName>,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInstalled { name } => write!(f, "service '{name}' is already installed"),
            Self::MissingDependency { name, requires } => {
                write!(f, "service '{name}' requires '{requires}' which is not installed")
            }
            Self::DependentsExist { name, dependents } => {
                let list: Vec<String> = dependents.iter().map(|d| d.to_string()).collect();
                write!(
                    f,
                    "service '{name}' still has dependents: {}",
                    list.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Failure of an imperative call against a live broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeActionError {
    /// The broker rejected or failed the action.
    Failed { action: String, reason: String },
    /// The broker does not provide the capability needed for the action.
    Unsupported { capability: String },
}

impl RuntimeActionError {
    pub fn failed(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            action: action.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RuntimeActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { action, reason } => write!(f, "{action} failed: {reason}"),
            Self::Unsupported { capability } => {
                write!(f, "broker does not support capability '{capability}'")
            }
        }
    }
}

impl std::error::Error for RuntimeActionError {}

/// Failures resolving or driving a component control handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlError {
    /// The address does not name a component of the proxy's role.
    InvalidAddress { address: String },
    /// The owning server has no live broker.
    NotMaterialized { server: String },
    /// The live broker has no resource under the resolved name.
    NoSuchResource { resource_name: String },
    Action(RuntimeActionError),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress { address } => {
                write!(f, "address '{address}' does not name a controllable component")
            }
            Self::NotMaterialized { server } => {
                write!(f, "server '{server}' is not running")
            }
            Self::NoSuchResource { resource_name } => {
                write!(f, "no runtime resource registered as '{resource_name}'")
            }
            Self::Action(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ControlError {}
