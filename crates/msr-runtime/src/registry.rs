//! Runtime service registry: symbolic service name → live service.
//!
//! The registry is shared by every operation; each `install`/`remove` call is
//! atomic on its own. Callers order their calls (dependents before the
//! service they depend on) instead of locking across calls.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use msr_model::ServiceName;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::broker::BrokerRuntime;
use crate::error::RegistryError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    Server,
    QueueManager,
    Queue,
    BroadcastBinding,
    DiscoveryBinding,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceState {
    Starting,
    Up,
    /// Installed but not running (a required service went away).
    Down,
}

/// What to install under a service name.
#[derive(Clone)]
pub struct ServiceDescriptor {
    pub kind: ServiceKind,
    pub server: String,
    /// Services that must be installed first and removed last.
    pub requires: Vec<ServiceName>,
    /// Broker handle owned by a server service.
    pub broker: Option<Arc<dyn BrokerRuntime>>,
    pub config: Value,
}

impl ServiceDescriptor {
    pub fn new(kind: ServiceKind, server: impl Into<String>) -> Self {
        Self {
            kind,
            server: server.into(),
            requires: Vec::new(),
            broker: None,
            config: Value::Null,
        }
    }

    pub fn requires(mut self, name: ServiceName) -> Self {
        self.requires.push(name);
        self
    }

    pub fn with_broker(mut self, broker: Arc<dyn BrokerRuntime>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("kind", &self.kind)
            .field("server", &self.server)
            .field("requires", &self.requires)
            .field("broker", &self.broker.as_ref().map(|b| b.server_name().to_string()))
            .field("config", &self.config)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct ServiceEntry {
    pub name: ServiceName,
    pub descriptor: ServiceDescriptor,
    pub state: ServiceState,
}

impl ServiceEntry {
    pub fn is_up(&self) -> bool {
        self.state == ServiceState::Up
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// Nothing was registered under the name.
    Absent,
}

pub trait ServiceRegistry: Send + Sync {
    fn lookup(&self, name: &ServiceName) -> Option<ServiceEntry>;
    fn install(&self, name: ServiceName, descriptor: ServiceDescriptor) -> Result<(), RegistryError>;
    fn remove(&self, name: &ServiceName) -> Result<Removal, RegistryError>;
    /// Drops every `Down` entry at or below `owner` without running any stop
    /// action, returning the dropped names.
    fn purge_down(&self, owner: &ServiceName) -> Vec<ServiceName>;
}

/// The live broker of `server`, if its server service is installed and up.
pub fn live_broker(registry: &dyn ServiceRegistry, server: &str) -> Option<Arc<dyn BrokerRuntime>> {
    registry
        .lookup(&ServiceName::server(server))
        .filter(ServiceEntry::is_up)
        .and_then(|e| e.descriptor.broker)
}

/// What happens to dependents when a service they require is removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    /// Dependents stay installed and go `Down`.
    #[default]
    Cascade,
    /// Removal fails while dependents are installed.
    RejectWithDependents,
}

/// Registry kept in process memory.
#[derive(Default)]
pub struct InMemoryServiceRegistry {
    policy: RemovalPolicy,
    services: Mutex<BTreeMap<ServiceName, ServiceEntry>>,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: RemovalPolicy) -> Self {
        Self {
            policy,
            services: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ServiceName, ServiceEntry>> {
        self.services.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn names(&self) -> Vec<ServiceName> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forces a service into `state`; returns `false` if it is not installed.
    pub fn set_state(&self, name: &ServiceName, state: ServiceState) -> bool {
        match self.lock().get_mut(name) {
            Some(entry) => {
                entry.state = state;
                true
            }
            None => false,
        }
    }
}

impl ServiceRegistry for InMemoryServiceRegistry {
    fn lookup(&self, name: &ServiceName) -> Option<ServiceEntry> {
        self.lock().get(name).cloned()
    }

    fn install(&self, name: ServiceName, descriptor: ServiceDescriptor) -> Result<(), RegistryError> {
        let mut services = self.lock();
        if services.contains_key(&name) {
            return Err(RegistryError::AlreadyInstalled { name });
        }
        if let Some(missing) = descriptor
            .requires
            .iter()
            .find(|r| !services.contains_key(*r))
        {
            return Err(RegistryError::MissingDependency {
                name,
                requires: missing.clone(),
            });
        }
        info!(service = %name, kind = ?descriptor.kind, "service installed");
        services.insert(
            name.clone(),
            ServiceEntry {
                name,
                descriptor,
                state: ServiceState::Up,
            },
        );
        Ok(())
    }

    fn remove(&self, name: &ServiceName) -> Result<Removal, RegistryError> {
        let mut services = self.lock();
        if !services.contains_key(name) {
            return Ok(Removal::Absent);
        }
        let dependents: Vec<ServiceName> = services
            .values()
            .filter(|e| e.descriptor.requires.contains(name))
            .map(|e| e.name.clone())
            .collect();
        if !dependents.is_empty() && self.policy == RemovalPolicy::RejectWithDependents {
            return Err(RegistryError::DependentsExist {
                name: name.clone(),
                dependents,
            });
        }
        for d in &dependents {
            if let Some(entry) = services.get_mut(d) {
                entry.state = ServiceState::Down;
            }
        }
        if let Some(entry) = services.remove(name) {
            stop(&entry);
        }
        info!(service = %name, "service removed");
        Ok(Removal::Removed)
    }

    fn purge_down(&self, owner: &ServiceName) -> Vec<ServiceName> {
        let mut services = self.lock();
        let stale: Vec<ServiceName> = services
            .values()
            .filter(|e| e.state == ServiceState::Down && e.name.is_under(owner))
            .map(|e| e.name.clone())
            .collect();
        for name in &stale {
            services.remove(name);
            info!(service = %name, "stale service purged");
        }
        stale
    }
}

/// Stop action of a removed service. A server service stops its broker; a
/// running queue service destroys its queue on the broker.
fn stop(entry: &ServiceEntry) {
    let Some(broker) = &entry.descriptor.broker else {
        return;
    };
    match entry.descriptor.kind {
        ServiceKind::Server => broker.stop(),
        ServiceKind::Queue if entry.is_up() => {
            let Some(queue) = entry.name.leaf() else {
                return;
            };
            if let Err(e) = broker.destroy_queue(queue) {
                warn!(service = %entry.name, error = %e, "queue service stopped but broker kept the queue");
            }
        }
        _ => {}
    }
}
