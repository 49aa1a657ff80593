//! msr-config
//!
//! Layered YAML configuration for the messaging subsystem reconciler.
//!
//! - Documents merge in order: earlier docs are base, later docs override.
//! - The merged document is canonicalised and hashed so two deployments can be
//!   compared by hash alone.
//! - Secrets never appear as literals: config stores env var NAMES.
//! - [`StartupContext`] is built once at process start and injected; nothing
//!   reads credentials from ambient state afterwards.

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;

mod boot;
mod context;
mod settings;

pub use boot::boot_operations;
pub use context::{ClusterCredentials, StartupContext, DEFAULT_CLUSTER_USER};
pub use settings::{ClusterSettings, ServerSettings, SubsystemConfig, SubsystemSettings};

/// Attribute names that hold credentials. Config names the env var under
/// `<name>-env` instead.
const SECRET_ATTRIBUTES: &[&str] = &[
    "cluster-password",
    "key-store-password",
    "trust-store-password",
    "password",
];

/// Value shapes that are key material or tokens no matter where they appear.
const SECRET_PREFIXES: &[&str] = &[
    "-----BEGIN", // PEM key store material
    "AKIA",       // AWS access key id (SQS/SNS bridges)
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view of the merged document.
    pub fn settings(&self) -> Result<SubsystemConfig> {
        serde_json::from_value(self.config_json.clone()).context("config does not match schema")
    }
}

/// Reads each path as one layer, in order.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let layers = paths
        .iter()
        .map(|p| {
            fs::read_to_string(p).with_context(|| format!("cannot read subsystem config layer {p}"))
        })
        .collect::<Result<Vec<String>>>()?;
    let refs: Vec<&str> = layers.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

/// Overlays YAML layers: later layers win key by key. An explicit `null` in a
/// later layer deletes what earlier layers set, so an overlay can drop a
/// resource from the base. Empty layers are skipped.
pub fn load_layered_yaml_from_strings(layers: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Map::new());
    for (index, raw) in layers.iter().enumerate() {
        let layer: Value = serde_yaml::from_str(raw)
            .with_context(|| format!("subsystem config layer {index} is not valid yaml"))?;
        if !layer.is_null() {
            overlay(&mut merged, layer);
        }
    }

    if let Some((pointer, reason)) = find_secret_literal(&merged, String::new()) {
        bail!("CONFIG_SECRET_DETECTED at {pointer}: {reason}");
    }

    let canonical_json =
        serde_json::to_string(&merged).context("cannot canonicalise subsystem config")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                if value.is_null() && base.contains_key(&key) {
                    base.remove(&key);
                    continue;
                }
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// First string leaf that carries a credential, as a JSON pointer plus a
/// reason that never echoes the value.
fn find_secret_literal(v: &Value, pointer: String) -> Option<(String, String)> {
    match v {
        Value::Object(map) => map.iter().find_map(|(key, child)| {
            let child_pointer = format!("{pointer}/{}", key.replace('~', "~0").replace('/', "~1"));
            if child.is_string() && SECRET_ATTRIBUTES.contains(&key.as_str()) {
                return Some((
                    child_pointer,
                    format!("credential attribute; name its env var under '{key}-env'"),
                ));
            }
            find_secret_literal(child, child_pointer)
        }),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, child)| find_secret_literal(child, format!("{pointer}/{i}"))),
        Value::String(s) if looks_like_secret(s) => {
            Some((pointer, "value=REDACTED".to_string()))
        }
        _ => None,
    }
}

/// Token prefixes, or a transport URL carrying `user:password@`.
fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if SECRET_PREFIXES.iter().any(|p| t.starts_with(p)) {
        return t.len() >= 8;
    }
    t.split_once("://")
        .and_then(|(_, rest)| rest.split_once('@'))
        .map(|(userinfo, _)| userinfo.contains(':') && !userinfo.contains('/'))
        .unwrap_or(false)
}
