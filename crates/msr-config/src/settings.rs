//! Typed view of the merged configuration document.
//!
//! ```yaml
//! subsystem:
//!   legacy_compatibility: true
//! cluster:
//!   user: admin
//!   password_env: MSR_CLUSTER_PASSWORD
//! servers:
//!   default:
//!     attributes: { persistence-enabled: false }
//!     resources:
//!       "remote-acceptor=netty": { socket-binding: messaging }
//!       "queue=q1": { durable: true }
//!       "security-setting=#/role=guest": { send: true, consume: true }
//! external_connectors:
//!   "remote-connector=upstream": { socket-binding: upstream }
//! ```

use msr_model::Attributes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubsystemConfig {
    #[serde(default)]
    pub subsystem: SubsystemSettings,
    #[serde(default)]
    pub cluster: ClusterSettings,
    #[serde(default)]
    pub servers: BTreeMap<String, ServerSettings>,
    /// Root-level connectors, keyed by relative address (`remote-connector=x`).
    #[serde(default)]
    pub external_connectors: BTreeMap<String, Attributes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubsystemSettings {
    /// Forward removal of current-schema groups to their legacy counterparts.
    #[serde(default = "default_true")]
    pub legacy_compatibility: bool,
}

impl Default for SubsystemSettings {
    fn default() -> Self {
        Self {
            legacy_compatibility: true,
        }
    }
}

/// Cluster credential sources. Only env var NAMES live here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterSettings {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password_env: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSettings {
    #[serde(default)]
    pub attributes: Attributes,
    /// Child resources keyed by address relative to the server, e.g.
    /// `queue=q1` or `security-setting=#/role=guest`.
    #[serde(default)]
    pub resources: BTreeMap<String, Attributes>,
}

fn default_true() -> bool {
    true
}
