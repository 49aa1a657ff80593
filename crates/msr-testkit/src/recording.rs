use std::sync::{Mutex, MutexGuard};

use msr_model::ServiceName;
use msr_runtime::{
    InMemoryServiceRegistry, RegistryError, Removal, RemovalPolicy, ServiceDescriptor,
    ServiceEntry, ServiceRegistry,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryCall {
    Install(ServiceName),
    Remove(ServiceName),
}

/// In-memory registry that records calls before delegating.
#[derive(Default)]
pub struct RecordingRegistry {
    inner: InMemoryServiceRegistry,
    calls: Mutex<Vec<RegistryCall>>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: RemovalPolicy) -> Self {
        Self {
            inner: InMemoryServiceRegistry::with_policy(policy),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Underlying registry; calls made through it are not recorded.
    pub fn inner(&self) -> &InMemoryServiceRegistry {
        &self.inner
    }

    fn log(&self) -> MutexGuard<'_, Vec<RegistryCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.log().clone()
    }

    pub fn installs(&self) -> Vec<ServiceName> {
        self.log()
            .iter()
            .filter_map(|c| match c {
                RegistryCall::Install(n) => Some(n.clone()),
                RegistryCall::Remove(_) => None,
            })
            .collect()
    }

    pub fn removals(&self) -> Vec<ServiceName> {
        self.log()
            .iter()
            .filter_map(|c| match c {
                RegistryCall::Remove(n) => Some(n.clone()),
                RegistryCall::Install(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.log().clear();
    }

    pub fn is_installed(&self, name: &ServiceName) -> bool {
        self.inner.lookup(name).is_some()
    }
}

impl ServiceRegistry for RecordingRegistry {
    fn lookup(&self, name: &ServiceName) -> Option<ServiceEntry> {
        self.inner.lookup(name)
    }

    fn install(&self, name: ServiceName, descriptor: ServiceDescriptor) -> Result<(), RegistryError> {
        self.log().push(RegistryCall::Install(name.clone()));
        self.inner.install(name, descriptor)
    }

    fn remove(&self, name: &ServiceName) -> Result<Removal, RegistryError> {
        self.log().push(RegistryCall::Remove(name.clone()));
        self.inner.remove(name)
    }

    // bookkeeping only, not recorded
    fn purge_down(&self, owner: &ServiceName) -> Vec<ServiceName> {
        self.inner.purge_down(owner)
    }
}
