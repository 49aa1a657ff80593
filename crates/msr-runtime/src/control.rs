//! Component control proxy.
//!
//! Resolves the live control object of a broker sub-resource from its model
//! address: role prefix + the address's last segment value, looked up in the
//! owning server's live resource registry. Handles are resolved per call and
//! never cached.

use std::sync::Arc;

use msr_model::{ResourceAddress, ResourceKind};
use serde_json::{json, Value};

use crate::broker::{BrokerRuntime, ComponentControl};
use crate::error::ControlError;
use crate::registry::{live_broker, ServiceRegistry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlRole {
    Acceptor,
    Bridge,
    BroadcastGroup,
    ClusterConnection,
    Queue,
}

impl ControlRole {
    /// Broker resource-name prefix for the role.
    pub fn prefix(self) -> &'static str {
        match self {
            ControlRole::Acceptor => "acceptor.",
            ControlRole::Bridge => "bridge.",
            ControlRole::BroadcastGroup => "broadcastgroup.",
            ControlRole::ClusterConnection => "clusterconnection.",
            ControlRole::Queue => "queue.",
        }
    }

    pub fn for_kind(kind: ResourceKind) -> Option<Self> {
        match kind {
            ResourceKind::Acceptor(_) => Some(ControlRole::Acceptor),
            ResourceKind::Bridge => Some(ControlRole::Bridge),
            ResourceKind::BroadcastGroup(s)
                if s.generation() == msr_model::SchemaGeneration::Current =>
            {
                Some(ControlRole::BroadcastGroup)
            }
            ResourceKind::ClusterConnection => Some(ControlRole::ClusterConnection),
            ResourceKind::Queue => Some(ControlRole::Queue),
            _ => None,
        }
    }
}

/// Management operations layered on a resolved handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlOp {
    Start,
    Stop,
    IsStarted,
    ReadRuntime,
}

#[derive(Clone, Copy, Debug)]
pub struct ComponentControlProxy {
    role: ControlRole,
}

impl ComponentControlProxy {
    pub fn new(role: ControlRole) -> Self {
        Self { role }
    }

    /// Proxy matching the kind of `address`'s last segment.
    pub fn for_address(address: &ResourceAddress) -> Result<Self, ControlError> {
        address
            .kind()
            .and_then(ControlRole::for_kind)
            .map(Self::new)
            .ok_or_else(|| ControlError::InvalidAddress {
                address: address.to_string(),
            })
    }

    pub fn role(&self) -> ControlRole {
        self.role
    }

    pub fn resource_name(&self, address: &ResourceAddress) -> Result<String, ControlError> {
        let name = address.name().ok_or_else(|| ControlError::InvalidAddress {
            address: address.to_string(),
        })?;
        Ok(format!("{}{}", self.role.prefix(), name))
    }

    /// Resolves against an explicit broker handle.
    pub fn resolve(
        &self,
        address: &ResourceAddress,
        broker: &dyn BrokerRuntime,
    ) -> Result<Arc<dyn ComponentControl>, ControlError> {
        let resource_name = self.resource_name(address)?;
        broker
            .lookup_resource(&resource_name)
            .ok_or(ControlError::NoSuchResource { resource_name })
    }

    /// Resolves through the registry: the owning server must be live.
    pub fn resolve_live(
        &self,
        address: &ResourceAddress,
        registry: &dyn ServiceRegistry,
    ) -> Result<Arc<dyn ComponentControl>, ControlError> {
        let server = address
            .server_name()
            .ok_or_else(|| ControlError::InvalidAddress {
                address: address.to_string(),
            })?;
        let broker = live_broker(registry, server).ok_or_else(|| ControlError::NotMaterialized {
            server: server.to_string(),
        })?;
        self.resolve(address, broker.as_ref())
    }

    pub fn invoke(
        &self,
        address: &ResourceAddress,
        registry: &dyn ServiceRegistry,
        op: ControlOp,
    ) -> Result<Value, ControlError> {
        let control = self.resolve_live(address, registry)?;
        match op {
            ControlOp::Start => control.start().map(|_| Value::Null).map_err(ControlError::Action),
            ControlOp::Stop => control.stop().map(|_| Value::Null).map_err(ControlError::Action),
            ControlOp::IsStarted => Ok(json!(control.is_started())),
            ControlOp::ReadRuntime => Ok(control.runtime_attributes()),
        }
    }
}
