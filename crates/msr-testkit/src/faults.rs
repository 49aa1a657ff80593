use std::sync::{Arc, Mutex, MutexGuard};

use msr_model::{BridgeDefinition, QueueDefinition, SecurityMatch, ServerDefinition};
use msr_runtime::{
    BrokerFactory, BrokerRuntime, ComponentControl, InMemoryBroker, RuntimeActionError,
};

/// Failures to inject. `None` means the call behaves normally.
#[derive(Clone, Debug, Default)]
pub struct Faults {
    pub start: Option<RuntimeActionError>,
    pub destroy_queue: Option<RuntimeActionError>,
    pub deploy_bridge: Option<RuntimeActionError>,
    pub destroy_bridge: Option<RuntimeActionError>,
    pub security: Option<RuntimeActionError>,
}

impl Faults {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn destroy_queue_fails() -> Self {
        Self {
            destroy_queue: Some(RuntimeActionError::failed("destroy-queue", "broker refused")),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrokerCall {
    DeployQueue(String),
    DestroyQueue(String),
    DeployBridge(String),
    DestroyBridge(String),
    AddSecurityMatch(String),
    RemoveSecurityMatch(String),
    Stop,
}

#[derive(Debug)]
pub struct FaultyBroker {
    inner: InMemoryBroker,
    faults: Faults,
    calls: Mutex<Vec<BrokerCall>>,
}

impl FaultyBroker {
    pub fn start(server: &ServerDefinition, faults: Faults) -> Self {
        Self {
            inner: InMemoryBroker::start(server),
            faults,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &InMemoryBroker {
        &self.inner
    }

    fn log(&self) -> MutexGuard<'_, Vec<BrokerCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> Vec<BrokerCall> {
        self.log().clone()
    }

    fn record(&self, call: BrokerCall) {
        self.log().push(call);
    }
}

fn inject(fault: &Option<RuntimeActionError>) -> Result<(), RuntimeActionError> {
    match fault {
        Some(e) => Err(e.clone()),
        None => Ok(()),
    }
}

impl BrokerRuntime for FaultyBroker {
    fn server_name(&self) -> &str {
        self.inner.server_name()
    }

    fn is_started(&self) -> bool {
        self.inner.is_started()
    }

    fn deploy_queue(&self, queue: &QueueDefinition) -> Result<(), RuntimeActionError> {
        self.record(BrokerCall::DeployQueue(queue.name.clone()));
        self.inner.deploy_queue(queue)
    }

    fn destroy_queue(&self, name: &str) -> Result<(), RuntimeActionError> {
        self.record(BrokerCall::DestroyQueue(name.to_string()));
        inject(&self.faults.destroy_queue)?;
        self.inner.destroy_queue(name)
    }

    fn deploy_bridge(&self, bridge: &BridgeDefinition) -> Result<(), RuntimeActionError> {
        self.record(BrokerCall::DeployBridge(bridge.name.clone()));
        inject(&self.faults.deploy_bridge)?;
        self.inner.deploy_bridge(bridge)
    }

    fn destroy_bridge(&self, name: &str) -> Result<(), RuntimeActionError> {
        self.record(BrokerCall::DestroyBridge(name.to_string()));
        inject(&self.faults.destroy_bridge)?;
        self.inner.destroy_bridge(name)
    }

    fn add_security_match(&self, security: &SecurityMatch) -> Result<(), RuntimeActionError> {
        self.record(BrokerCall::AddSecurityMatch(security.pattern.clone()));
        inject(&self.faults.security)?;
        self.inner.add_security_match(security)
    }

    fn remove_security_match(&self, pattern: &str) -> Result<(), RuntimeActionError> {
        self.record(BrokerCall::RemoveSecurityMatch(pattern.to_string()));
        inject(&self.faults.security)?;
        self.inner.remove_security_match(pattern)
    }

    fn lookup_resource(&self, resource_name: &str) -> Option<Arc<dyn ComponentControl>> {
        self.inner.lookup_resource(resource_name)
    }

    fn stop(&self) {
        self.record(BrokerCall::Stop);
        self.inner.stop();
    }
}

/// Starts [`FaultyBroker`]s and keeps every one it started.
#[derive(Debug, Default)]
pub struct FaultyBrokerFactory {
    faults: Faults,
    started: Mutex<Vec<(ServerDefinition, Arc<FaultyBroker>)>>,
}

impl FaultyBrokerFactory {
    pub fn new(faults: Faults) -> Self {
        Self {
            faults,
            started: Mutex::new(Vec::new()),
        }
    }

    fn log(&self) -> MutexGuard<'_, Vec<(ServerDefinition, Arc<FaultyBroker>)>> {
        self.started.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Most recently started broker of `server`.
    pub fn broker(&self, server: &str) -> Option<Arc<FaultyBroker>> {
        self.log()
            .iter()
            .rev()
            .find(|(d, _)| d.name == server)
            .map(|(_, b)| Arc::clone(b))
    }

    /// Definitions passed to `start`, in order.
    pub fn definitions(&self) -> Vec<ServerDefinition> {
        self.log().iter().map(|(d, _)| d.clone()).collect()
    }

    pub fn started_count(&self) -> usize {
        self.log().len()
    }
}

impl BrokerFactory for FaultyBrokerFactory {
    fn start(&self, server: &ServerDefinition) -> Result<Arc<dyn BrokerRuntime>, RuntimeActionError> {
        inject(&self.faults.start)?;
        let broker = Arc::new(FaultyBroker::start(server, self.faults.clone()));
        self.log().push((server.clone(), Arc::clone(&broker)));
        Ok(broker)
    }
}
