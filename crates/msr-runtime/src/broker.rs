//! Live broker interface consumed by the reconciler, plus an in-memory broker
//! used by the developer CLI and tests.
//!
//! The reconciler never implements messaging itself; it only issues the
//! imperative calls below when no managed service covers the action.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use msr_model::{BridgeDefinition, QueueDefinition, SecurityMatch, ServerDefinition};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::RuntimeActionError;

/// Management interface of one live broker sub-resource.
pub trait ComponentControl: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
    fn is_started(&self) -> bool;
    fn start(&self) -> Result<(), RuntimeActionError>;
    fn stop(&self) -> Result<(), RuntimeActionError>;
    /// Runtime-only view of the component (never persisted).
    fn runtime_attributes(&self) -> Value;
}

/// Handle on one running broker.
pub trait BrokerRuntime: Send + Sync + fmt::Debug {
    fn server_name(&self) -> &str;
    fn is_started(&self) -> bool;

    fn deploy_queue(&self, queue: &QueueDefinition) -> Result<(), RuntimeActionError>;
    /// Native destroy, used when no managed queue service exists.
    fn destroy_queue(&self, name: &str) -> Result<(), RuntimeActionError>;

    fn deploy_bridge(&self, bridge: &BridgeDefinition) -> Result<(), RuntimeActionError>;
    fn destroy_bridge(&self, name: &str) -> Result<(), RuntimeActionError>;

    /// Adds or replaces the roles of an address match in the security repository.
    fn add_security_match(&self, security: &SecurityMatch) -> Result<(), RuntimeActionError>;
    fn remove_security_match(&self, pattern: &str) -> Result<(), RuntimeActionError>;

    /// Looks up a live resource by its broker resource name (`acceptor.netty`).
    fn lookup_resource(&self, resource_name: &str) -> Option<Arc<dyn ComponentControl>>;

    fn stop(&self);
}

/// Platform capability that starts brokers.
pub trait BrokerFactory: Send + Sync {
    fn start(&self, server: &ServerDefinition) -> Result<Arc<dyn BrokerRuntime>, RuntimeActionError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct InMemoryComponent {
    name: String,
    started: AtomicBool,
}

impl InMemoryComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: AtomicBool::new(true),
        }
    }
}

impl ComponentControl for InMemoryComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn start(&self) -> Result<(), RuntimeActionError> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), RuntimeActionError> {
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn runtime_attributes(&self) -> Value {
        json!({ "name": self.name, "started": self.is_started() })
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    started: bool,
    queues: BTreeMap<String, QueueDefinition>,
    bridges: BTreeMap<String, BridgeDefinition>,
    security: BTreeMap<String, SecurityMatch>,
    components: BTreeMap<String, Arc<InMemoryComponent>>,
}

/// Broker that keeps its state in memory.
#[derive(Debug)]
pub struct InMemoryBroker {
    server: String,
    state: Mutex<BrokerState>,
}

impl InMemoryBroker {
    /// Starts a broker with the resources of `server` already materialised.
    pub fn start(server: &ServerDefinition) -> Self {
        let broker = Self {
            server: server.name.clone(),
            state: Mutex::new(BrokerState {
                started: true,
                ..BrokerState::default()
            }),
        };
        {
            let mut st = broker.lock();
            for a in &server.acceptors {
                register(&mut st, format!("acceptor.{}", a.name));
            }
            for g in &server.broadcast_groups {
                register(&mut st, format!("broadcastgroup.{}", g.name));
            }
            for q in &server.queues {
                st.queues.insert(q.name.clone(), q.clone());
                register(&mut st, format!("queue.{}", q.name));
            }
            for b in &server.bridges {
                st.bridges.insert(b.name.clone(), b.clone());
                register(&mut st, format!("bridge.{}", b.name));
            }
            for s in &server.security {
                st.security.insert(s.pattern.clone(), s.clone());
            }
        }
        broker
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn queue_names(&self) -> Vec<String> {
        self.lock().queues.keys().cloned().collect()
    }

    pub fn bridge_names(&self) -> Vec<String> {
        self.lock().bridges.keys().cloned().collect()
    }

    pub fn security_match(&self, pattern: &str) -> Option<SecurityMatch> {
        self.lock().security.get(pattern).cloned()
    }

    /// Registers an extra resource (e.g. a cluster connection).
    pub fn register_component(&self, resource_name: impl Into<String>) {
        register(&mut self.lock(), resource_name.into());
    }
}

fn register(st: &mut BrokerState, resource_name: String) {
    let component = Arc::new(InMemoryComponent::new(resource_name.clone()));
    st.components.insert(resource_name, component);
}

impl BrokerRuntime for InMemoryBroker {
    fn server_name(&self) -> &str {
        &self.server
    }

    fn is_started(&self) -> bool {
        self.lock().started
    }

    fn deploy_queue(&self, queue: &QueueDefinition) -> Result<(), RuntimeActionError> {
        let mut st = self.lock();
        if st.queues.contains_key(&queue.name) {
            return Err(RuntimeActionError::failed(
                "deploy-queue",
                format!("queue '{}' already exists", queue.name),
            ));
        }
        st.queues.insert(queue.name.clone(), queue.clone());
        register(&mut st, format!("queue.{}", queue.name));
        Ok(())
    }

    fn destroy_queue(&self, name: &str) -> Result<(), RuntimeActionError> {
        let mut st = self.lock();
        if st.queues.remove(name).is_none() {
            return Err(RuntimeActionError::failed(
                "destroy-queue",
                format!("queue '{name}' does not exist"),
            ));
        }
        st.components.remove(&format!("queue.{name}"));
        Ok(())
    }

    fn deploy_bridge(&self, bridge: &BridgeDefinition) -> Result<(), RuntimeActionError> {
        let mut st = self.lock();
        st.bridges.insert(bridge.name.clone(), bridge.clone());
        register(&mut st, format!("bridge.{}", bridge.name));
        Ok(())
    }

    fn destroy_bridge(&self, name: &str) -> Result<(), RuntimeActionError> {
        let mut st = self.lock();
        if st.bridges.remove(name).is_none() {
            return Err(RuntimeActionError::failed(
                "destroy-bridge",
                format!("bridge '{name}' does not exist"),
            ));
        }
        st.components.remove(&format!("bridge.{name}"));
        Ok(())
    }

    fn add_security_match(&self, security: &SecurityMatch) -> Result<(), RuntimeActionError> {
        self.lock()
            .security
            .insert(security.pattern.clone(), security.clone());
        Ok(())
    }

    fn remove_security_match(&self, pattern: &str) -> Result<(), RuntimeActionError> {
        self.lock().security.remove(pattern);
        Ok(())
    }

    fn lookup_resource(&self, resource_name: &str) -> Option<Arc<dyn ComponentControl>> {
        self.lock()
            .components
            .get(resource_name)
            .map(|c| Arc::clone(c) as Arc<dyn ComponentControl>)
    }

    fn stop(&self) {
        debug!(server = %self.server, "in-memory broker stopped");
        self.lock().started = false;
    }
}

/// Factory producing [`InMemoryBroker`]s.
#[derive(Debug, Default)]
pub struct InMemoryBrokerFactory;

impl BrokerFactory for InMemoryBrokerFactory {
    fn start(&self, server: &ServerDefinition) -> Result<Arc<dyn BrokerRuntime>, RuntimeActionError> {
        Ok(Arc::new(InMemoryBroker::start(server)))
    }
}
