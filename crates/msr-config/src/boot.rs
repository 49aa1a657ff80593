use crate::settings::SubsystemConfig;
use anyhow::{Context, Result};
use msr_model::{Operation, ResourceAddress};

/// Flatten a typed config into the `add` operations that rebuild it.
///
/// Order: each server, then its resources parents-first, then external
/// connectors. Within one depth, resources are sorted by address text so the
/// sequence is identical for identical configs.
pub fn boot_operations(cfg: &SubsystemConfig) -> Result<Vec<Operation>> {
    let mut ops = Vec::new();

    for (server, settings) in &cfg.servers {
        let server_addr = ResourceAddress::server(server.as_str());
        ops.push(Operation::add(server_addr, settings.attributes.clone()));

        let mut resources: Vec<(ResourceAddress, &msr_model::Attributes)> = Vec::new();
        for (relative, attrs) in &settings.resources {
            let full = format!("server={server}/{relative}");
            let addr: ResourceAddress = full
                .parse()
                .with_context(|| format!("BOOT_INVALID_ADDRESS: {full}"))?;
            resources.push((addr, attrs));
        }
        resources.sort_by(|(a, _), (b, _)| {
            a.len()
                .cmp(&b.len())
                .then_with(|| a.to_string().cmp(&b.to_string()))
        });
        ops.extend(
            resources
                .into_iter()
                .map(|(addr, attrs)| Operation::add(addr, attrs.clone())),
        );
    }

    for (relative, attrs) in &cfg.external_connectors {
        let addr: ResourceAddress = relative
            .parse()
            .with_context(|| format!("BOOT_INVALID_ADDRESS: {relative}"))?;
        ops.push(Operation::add(addr, attrs.clone()));
    }

    Ok(ops)
}
