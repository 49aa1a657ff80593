//! Command handlers for msr.
//!
//! Shared loading and boot helpers live here; command-specific logic lives in
//! the submodules.

pub mod apply;
pub mod export;

use std::sync::Arc;

use anyhow::{Context, Result};
use msr_config::{boot_operations, LoadedConfig, StartupContext, SubsystemConfig};
use msr_reconcile::Controller;
use msr_runtime::{InMemoryBrokerFactory, InMemoryServiceRegistry};
use tracing::info;

pub fn load(paths: &[String]) -> Result<(LoadedConfig, SubsystemConfig)> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = msr_config::load_layered_yaml(&path_refs)?;
    let settings = loaded.settings()?;
    Ok((loaded, settings))
}

/// Boots the configuration against the in-memory registry and broker.
pub fn boot_in_memory(settings: &SubsystemConfig) -> Result<Controller> {
    let startup = StartupContext::from_config(settings)?;
    let mut controller = Controller::new(Arc::new(InMemoryServiceRegistry::new()), startup)
        .with_broker_factory(Arc::new(InMemoryBrokerFactory));
    let ops = boot_operations(settings)?;
    let outcome = controller.boot(ops).context("boot failed")?;
    info!(steps = outcome.steps.len(), "in-memory deployment booted");
    Ok(controller)
}

pub fn config_hash(paths: &[String]) -> Result<()> {
    let (loaded, _) = load(paths)?;
    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}
