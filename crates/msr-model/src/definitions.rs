//! Typed views over configuration nodes, consumed when materialising a
//! server's runtime state.
//!
//! Node attributes use hyphenated names; the broker expects its own
//! camel-case parameter keys. The mapping tables below translate between the
//! two for transport parameters. Unmapped keys pass through unchanged.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::kind::{GroupSchema, ResourceKind, TransportFlavor};
use crate::node::ConfigNode;

const SHARED_TRANSPORT_KEYS: &[(&str, &str)] = &[
    ("server-id", "serverId"),
    ("buffer-pooling", "bufferPooling"),
    ("batch-delay", "batchDelay"),
    ("ssl-enabled", "sslEnabled"),
    ("host", "host"),
    ("port", "port"),
    ("use-nio", "useNio"),
    ("tcp-no-delay", "tcpNoDelay"),
    ("tcp-send-buffer-size", "tcpSendBufferSize"),
    ("tcp-receive-buffer-size", "tcpReceiveBufferSize"),
    ("key-store-path", "keyStorePath"),
    ("key-store-password", "keyStorePassword"),
    ("key-store-provider", "keyStoreProvider"),
    ("trust-store-path", "trustStorePath"),
    ("trust-store-password", "trustStorePassword"),
    ("trust-store-provider", "trustStoreProvider"),
    ("enabled-protocols", "enabledProtocols"),
    ("enabled-cipher-suites", "enabledCipherSuites"),
    ("http-upgrade-enabled", "httpUpgradeEnabled"),
];

const ACCEPTOR_KEYS: &[(&str, &str)] = &[
    ("cluster-connection", "clusterConnection"),
    ("connection-ttl", "connectionTtl"),
    ("connections-allowed", "connectionsAllowed"),
    ("direct-deliver", "directDeliver"),
    ("http-response-time", "httpResponseTime"),
    ("http-server-scan-period", "httpServerScanPeriod"),
];

const CONNECTOR_KEYS: &[(&str, &str)] = &[
    ("http-enabled", "httpEnabled"),
    ("http-client-idle-time", "httpClientIdleTime"),
    ("http-client-idle-scan-period", "httpClientIdleScanPeriod"),
    ("http-requires-session-id", "httpRequiresSessionId"),
    ("http-upgrade-endpoint", "httpUpgradeEndpoint"),
    ("local-address", "localAddress"),
    ("local-port", "localPort"),
    ("connect-timeout-millis", "connectTimeoutMillis"),
];

/// Attributes that describe the transport itself rather than broker params.
const STRUCTURAL_ATTRIBUTES: &[&str] = &["socket-binding", "factory-class", "endpoint", "params"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportDirection {
    Acceptor,
    Connector,
}

/// Broker parameter key for a model attribute name.
pub fn broker_param_key(direction: TransportDirection, attribute: &str) -> String {
    let role_keys = match direction {
        TransportDirection::Acceptor => ACCEPTOR_KEYS,
        TransportDirection::Connector => CONNECTOR_KEYS,
    };
    SHARED_TRANSPORT_KEYS
        .iter()
        .chain(role_keys.iter())
        .find(|(model, _)| *model == attribute)
        .map(|(_, broker)| broker.to_string())
        .unwrap_or_else(|| attribute.to_string())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransportDefinition {
    pub name: String,
    pub direction: TransportDirection,
    pub flavor: TransportFlavor,
    pub socket_binding: Option<String>,
    pub params: BTreeMap<String, Value>,
}

impl TransportDefinition {
    pub fn from_node(node: &ConfigNode) -> Option<Self> {
        let (direction, flavor) = match node.kind {
            ResourceKind::Acceptor(f) => (TransportDirection::Acceptor, f),
            ResourceKind::Connector(f) => (TransportDirection::Connector, f),
            _ => return None,
        };
        let mut params: BTreeMap<String, Value> = node
            .attributes
            .iter()
            .filter(|(k, v)| !v.is_null() && !STRUCTURAL_ATTRIBUTES.contains(&k.as_str()))
            .map(|(k, v)| (broker_param_key(direction, k), v.clone()))
            .collect();
        // free-form params are passed through under their own names
        if let Some(Value::Object(extra)) = node.attribute("params") {
            for (k, v) in extra {
                params.insert(k.clone(), v.clone());
            }
        }
        if flavor == TransportFlavor::Http {
            params.insert("httpUpgradeEnabled".to_string(), Value::Bool(true));
        }
        Some(Self {
            name: node.name.clone(),
            direction,
            flavor,
            socket_binding: node.str_attribute("socket-binding").map(str::to_string),
            params,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueueDefinition {
    pub name: String,
    /// Routing address; defaults to the queue name.
    pub address: String,
    pub durable: bool,
    pub filter: Option<String>,
}

impl QueueDefinition {
    pub fn from_node(node: &ConfigNode) -> Self {
        Self {
            name: node.name.clone(),
            address: node
                .str_attribute("queue-address")
                .unwrap_or(&node.name)
                .to_string(),
            durable: node.bool_attribute("durable").unwrap_or(true),
            filter: node.str_attribute("filter").map(str::to_string),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BridgeDefinition {
    pub name: String,
    pub queue_name: String,
    pub forwarding_address: Option<String>,
    pub static_connectors: Vec<String>,
    pub discovery_group: Option<String>,
}

impl BridgeDefinition {
    pub fn from_node(node: &ConfigNode) -> Self {
        let static_connectors = node
            .attribute("static-connectors")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            name: node.name.clone(),
            queue_name: node.str_attribute("queue-name").unwrap_or("").to_string(),
            forwarding_address: node.str_attribute("forwarding-address").map(str::to_string),
            static_connectors,
            discovery_group: node.str_attribute("discovery-group").map(str::to_string),
        }
    }
}

/// Permissions granted to one role on a security match.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RolePermissions {
    pub send: bool,
    pub consume: bool,
    pub create_durable_queue: bool,
    pub delete_durable_queue: bool,
    pub create_non_durable_queue: bool,
    pub delete_non_durable_queue: bool,
    pub manage: bool,
}

/// Role attributes that can be patched on a live broker.
pub const ROLE_PERMISSION_ATTRIBUTES: &[&str] = &[
    "send",
    "consume",
    "create-durable-queue",
    "delete-durable-queue",
    "create-non-durable-queue",
    "delete-non-durable-queue",
    "manage",
];

impl RolePermissions {
    pub fn from_node(node: &ConfigNode) -> Self {
        let flag = |name: &str| node.bool_attribute(name).unwrap_or(false);
        Self {
            send: flag("send"),
            consume: flag("consume"),
            create_durable_queue: flag("create-durable-queue"),
            delete_durable_queue: flag("delete-durable-queue"),
            create_non_durable_queue: flag("create-non-durable-queue"),
            delete_non_durable_queue: flag("delete-non-durable-queue"),
            manage: flag("manage"),
        }
    }
}

/// A security-setting node: an address match plus its roles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SecurityMatch {
    pub pattern: String,
    pub roles: BTreeMap<String, RolePermissions>,
}

impl SecurityMatch {
    pub fn from_node(node: &ConfigNode) -> Self {
        let roles = node
            .children_of(ResourceKind::Role)
            .map(|r| (r.name.clone(), RolePermissions::from_node(r)))
            .collect();
        Self {
            pattern: node.name.clone(),
            roles,
        }
    }
}

/// Current-schema broadcast or discovery group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GroupDefinition {
    pub name: String,
    pub schema: GroupSchemaView,
    pub connectors: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSchemaView {
    JGroups,
    Socket,
}

impl GroupDefinition {
    pub fn from_node(node: &ConfigNode) -> Option<Self> {
        let schema = match node.kind {
            ResourceKind::BroadcastGroup(GroupSchema::JGroups)
            | ResourceKind::DiscoveryGroup(GroupSchema::JGroups) => GroupSchemaView::JGroups,
            ResourceKind::BroadcastGroup(GroupSchema::Socket)
            | ResourceKind::DiscoveryGroup(GroupSchema::Socket) => GroupSchemaView::Socket,
            _ => return None,
        };
        let connectors = node
            .attribute("connectors")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            name: node.name.clone(),
            schema,
            connectors,
        })
    }
}

/// Everything a broker needs to start one server.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServerDefinition {
    pub name: String,
    pub cluster_user: Option<String>,
    #[serde(skip_serializing)]
    pub cluster_password: Option<String>,
    pub acceptors: Vec<TransportDefinition>,
    pub connectors: Vec<TransportDefinition>,
    pub queues: Vec<QueueDefinition>,
    pub bridges: Vec<BridgeDefinition>,
    pub security: Vec<SecurityMatch>,
    pub broadcast_groups: Vec<GroupDefinition>,
    pub discovery_groups: Vec<GroupDefinition>,
}

impl ServerDefinition {
    pub fn from_node(node: &ConfigNode) -> Self {
        let mut acceptors = Vec::new();
        let mut connectors = Vec::new();
        let mut queues = Vec::new();
        let mut bridges = Vec::new();
        let mut security = Vec::new();
        let mut broadcast_groups = Vec::new();
        let mut discovery_groups = Vec::new();
        for child in node.children() {
            match child.kind {
                ResourceKind::Acceptor(_) => acceptors.extend(TransportDefinition::from_node(child)),
                ResourceKind::Connector(_) => {
                    connectors.extend(TransportDefinition::from_node(child))
                }
                ResourceKind::Queue => queues.push(QueueDefinition::from_node(child)),
                ResourceKind::Bridge => bridges.push(BridgeDefinition::from_node(child)),
                ResourceKind::SecuritySetting => security.push(SecurityMatch::from_node(child)),
                ResourceKind::BroadcastGroup(_) => {
                    broadcast_groups.extend(GroupDefinition::from_node(child))
                }
                ResourceKind::DiscoveryGroup(_) => {
                    discovery_groups.extend(GroupDefinition::from_node(child))
                }
                _ => {}
            }
        }
        Self {
            name: node.name.clone(),
            cluster_user: node.str_attribute("cluster-user").map(str::to_string),
            cluster_password: node.str_attribute("cluster-password").map(str::to_string),
            acceptors,
            connectors,
            queues,
            bridges,
            security,
            broadcast_groups,
            discovery_groups,
        }
    }
}
