//! Resource kinds and their text tags.
//!
//! Legacy and current discovery/broadcast-group resources share one kind per
//! mechanism; the [`GroupSchema`] carried by the kind decides which schema
//! generation a node belongs to.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Transport flavour shared by acceptors and connectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportFlavor {
    /// Factory-class based transport (`acceptor` / `connector`).
    Generic,
    /// Netty socket transport bound to a socket binding.
    Remote,
    /// Intra-process transport addressed by server id.
    InVm,
    /// HTTP-upgrade transport.
    Http,
}

impl TransportFlavor {
    fn tag_prefix(self) -> &'static str {
        match self {
            TransportFlavor::Generic => "",
            TransportFlavor::Remote => "remote-",
            TransportFlavor::InVm => "in-vm-",
            TransportFlavor::Http => "http-",
        }
    }

    pub const ALL: [TransportFlavor; 4] = [
        TransportFlavor::Generic,
        TransportFlavor::Remote,
        TransportFlavor::InVm,
        TransportFlavor::Http,
    ];
}

/// Historical shape of a broadcast/discovery group resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupSchema {
    /// Single resource covering both JGroups and socket groups.
    Legacy,
    JGroups,
    Socket,
}

impl GroupSchema {
    pub fn generation(self) -> SchemaGeneration {
        match self {
            GroupSchema::Legacy => SchemaGeneration::Legacy,
            GroupSchema::JGroups | GroupSchema::Socket => SchemaGeneration::Current,
        }
    }

    fn tag_prefix(self) -> &'static str {
        match self {
            GroupSchema::Legacy => "",
            GroupSchema::JGroups => "jgroups-",
            GroupSchema::Socket => "socket-",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaGeneration {
    Legacy,
    Current,
}

/// Kind of a configuration node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Server,
    Acceptor(TransportFlavor),
    Connector(TransportFlavor),
    Queue,
    Bridge,
    ClusterConnection,
    SecuritySetting,
    Role,
    BroadcastGroup(GroupSchema),
    DiscoveryGroup(GroupSchema),
}

/// Kind with the flavour/schema erased. Used as the handler dispatch tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KindFamily {
    Server,
    Acceptor,
    Connector,
    Queue,
    Bridge,
    ClusterConnection,
    SecuritySetting,
    Role,
    BroadcastGroup,
    DiscoveryGroup,
}

impl ResourceKind {
    pub fn family(self) -> KindFamily {
        match self {
            ResourceKind::Server => KindFamily::Server,
            ResourceKind::Acceptor(_) => KindFamily::Acceptor,
            ResourceKind::Connector(_) => KindFamily::Connector,
            ResourceKind::Queue => KindFamily::Queue,
            ResourceKind::Bridge => KindFamily::Bridge,
            ResourceKind::ClusterConnection => KindFamily::ClusterConnection,
            ResourceKind::SecuritySetting => KindFamily::SecuritySetting,
            ResourceKind::Role => KindFamily::Role,
            ResourceKind::BroadcastGroup(_) => KindFamily::BroadcastGroup,
            ResourceKind::DiscoveryGroup(_) => KindFamily::DiscoveryGroup,
        }
    }

    /// Schema generation of the kind. Only group kinds have a legacy shape.
    pub fn generation(self) -> SchemaGeneration {
        match self {
            ResourceKind::BroadcastGroup(s) | ResourceKind::DiscoveryGroup(s) => s.generation(),
            _ => SchemaGeneration::Current,
        }
    }

    /// Legacy counterpart of a current-schema group kind.
    pub fn legacy_counterpart(self) -> Option<ResourceKind> {
        match self {
            ResourceKind::BroadcastGroup(s) if s.generation() == SchemaGeneration::Current => {
                Some(ResourceKind::BroadcastGroup(GroupSchema::Legacy))
            }
            ResourceKind::DiscoveryGroup(s) if s.generation() == SchemaGeneration::Current => {
                Some(ResourceKind::DiscoveryGroup(GroupSchema::Legacy))
            }
            _ => None,
        }
    }

    pub fn tag(self) -> String {
        match self {
            ResourceKind::Server => "server".to_string(),
            ResourceKind::Acceptor(f) => format!("{}acceptor", f.tag_prefix()),
            ResourceKind::Connector(f) => format!("{}connector", f.tag_prefix()),
            ResourceKind::Queue => "queue".to_string(),
            ResourceKind::Bridge => "bridge".to_string(),
            ResourceKind::ClusterConnection => "cluster-connection".to_string(),
            ResourceKind::SecuritySetting => "security-setting".to_string(),
            ResourceKind::Role => "role".to_string(),
            ResourceKind::BroadcastGroup(s) => format!("{}broadcast-group", s.tag_prefix()),
            ResourceKind::DiscoveryGroup(s) => format!("{}discovery-group", s.tag_prefix()),
        }
    }

    /// Whether a node of this kind may live under `parent` (`None` = root).
    ///
    /// Connectors are the only kind allowed at the root besides servers: a
    /// root-level connector is an external reference whose runtime state is
    /// owned outside this subsystem.
    pub fn allowed_under(self, parent: Option<ResourceKind>) -> bool {
        match (self, parent) {
            (ResourceKind::Server, None) => true,
            (ResourceKind::Connector(_), None) => true,
            (ResourceKind::Role, Some(ResourceKind::SecuritySetting)) => true,
            (ResourceKind::Server, Some(_)) | (ResourceKind::Role, _) => false,
            (_, Some(ResourceKind::Server)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

/// Unknown kind tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown resource kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "server" => ResourceKind::Server,
            "queue" => ResourceKind::Queue,
            "bridge" => ResourceKind::Bridge,
            "cluster-connection" => ResourceKind::ClusterConnection,
            "security-setting" => ResourceKind::SecuritySetting,
            "role" => ResourceKind::Role,
            "broadcast-group" => ResourceKind::BroadcastGroup(GroupSchema::Legacy),
            "jgroups-broadcast-group" => ResourceKind::BroadcastGroup(GroupSchema::JGroups),
            "socket-broadcast-group" => ResourceKind::BroadcastGroup(GroupSchema::Socket),
            "discovery-group" => ResourceKind::DiscoveryGroup(GroupSchema::Legacy),
            "jgroups-discovery-group" => ResourceKind::DiscoveryGroup(GroupSchema::JGroups),
            "socket-discovery-group" => ResourceKind::DiscoveryGroup(GroupSchema::Socket),
            other => {
                return TransportFlavor::ALL
                    .iter()
                    .find_map(|f| {
                        let rest = other.strip_prefix(f.tag_prefix())?;
                        match rest {
                            "acceptor" => Some(ResourceKind::Acceptor(*f)),
                            "connector" => Some(ResourceKind::Connector(*f)),
                            _ => None,
                        }
                    })
                    .ok_or_else(|| UnknownKind(other.to_string()));
            }
        };
        Ok(kind)
    }
}
