use std::sync::Arc;

use anyhow::{Context, Result};
use msr_config::{boot_operations, load_layered_yaml_from_strings, StartupContext};
use msr_model::{Operation, ResourceAddress};
use msr_reconcile::{Controller, OperationFailure, Outcome};

use crate::faults::{Faults, FaultyBroker, FaultyBrokerFactory};
use crate::recording::RecordingRegistry;

/// One server with a bit of everything: transports, a queue, a bridge,
/// security, and groups in both schemas.
pub const STANDARD_CONFIG: &str = r#"
subsystem:
  legacy_compatibility: true
servers:
  default:
    attributes:
      persistence-enabled: false
    resources:
      "remote-acceptor=netty":
        socket-binding: messaging
      "remote-connector=netty":
        socket-binding: messaging
      "queue=boot-q":
        durable: true
      "bridge=to-upstream":
        queue-name: boot-q
        static-connectors: [netty]
      "security-setting=#": {}
      "security-setting=#/role=guest":
        send: true
        consume: true
      "jgroups-broadcast-group=bg-a":
        connectors: [netty]
      "socket-broadcast-group=bg-b":
        connectors: [netty]
      "broadcast-group=bg-a": {}
      "jgroups-discovery-group=dg-a": {}
      "discovery-group=dg-a": {}
      "socket-discovery-group=dg-b": {}
external_connectors:
  "remote-connector=upstream":
    socket-binding: upstream
"#;

/// Controller wired to a recording registry and a fault-injecting broker
/// factory.
pub struct Harness {
    pub controller: Controller,
    pub registry: Arc<RecordingRegistry>,
    pub brokers: Arc<FaultyBrokerFactory>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(RecordingRegistry::new(), Faults::none(), StartupContext::default())
    }

    pub fn with_faults(faults: Faults) -> Self {
        Self::build(RecordingRegistry::new(), faults, StartupContext::default())
    }

    pub fn with_startup(startup: StartupContext) -> Self {
        Self::build(RecordingRegistry::new(), Faults::none(), startup)
    }

    pub fn build(registry: RecordingRegistry, faults: Faults, startup: StartupContext) -> Self {
        let registry = Arc::new(registry);
        let brokers = Arc::new(FaultyBrokerFactory::new(faults));
        let controller = Controller::new(registry.clone(), startup).with_broker_factory(brokers.clone());
        Self {
            controller,
            registry,
            brokers,
        }
    }

    /// Boots from a YAML document and clears the call logs afterwards.
    pub fn boot_yaml(&mut self, yaml: &str) -> Result<Outcome> {
        let loaded = load_layered_yaml_from_strings(&[yaml])?;
        let settings = loaded.settings()?;
        let ops = boot_operations(&settings)?;
        let outcome = self.controller.boot(ops).context("boot failed")?;
        self.registry.clear();
        Ok(outcome)
    }

    pub fn boot_standard(&mut self) -> Result<Outcome> {
        self.boot_yaml(STANDARD_CONFIG)
    }

    pub fn execute(&mut self, op: Operation) -> Result<Outcome, OperationFailure> {
        self.controller.execute(op)
    }

    pub fn broker(&self, server: &str) -> Option<Arc<FaultyBroker>> {
        self.brokers.broker(server)
    }

    pub fn exists(&self, address: &ResourceAddress) -> bool {
        self.controller.tree().exists(address)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
