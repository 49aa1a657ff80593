//! Resource addresses: `server=default/queue=q1`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::kind::{ResourceKind, UnknownKind};

/// One `(kind, name)` segment of an address.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathElement {
    pub kind: ResourceKind,
    pub name: String,
}

impl PathElement {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind, self.name)
    }
}

/// Ordered sequence of path elements identifying one node in the tree.
///
/// The empty address is the tree root; it never names a node itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceAddress {
    elements: Vec<PathElement>,
}

impl ResourceAddress {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn server(name: impl Into<String>) -> Self {
        Self::root().append(ResourceKind::Server, name)
    }

    /// Returns a new address with one more segment.
    pub fn append(&self, kind: ResourceKind, name: impl Into<String>) -> Self {
        let mut elements = self.elements.clone();
        elements.push(PathElement::new(kind, name));
        Self { elements }
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// Name of the node this address identifies (last segment value).
    pub fn name(&self) -> Option<&str> {
        self.last().map(|e| e.name.as_str())
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        self.last().map(|e| e.kind)
    }

    pub fn parent(&self) -> Option<ResourceAddress> {
        if self.elements.is_empty() {
            return None;
        }
        Some(Self {
            elements: self.elements[..self.elements.len() - 1].to_vec(),
        })
    }

    /// Same parent, different kind, same name.
    pub fn sibling(&self, kind: ResourceKind) -> Option<ResourceAddress> {
        let name = self.name()?.to_string();
        Some(self.parent()?.append(kind, name))
    }

    /// Name of the server owning this address, if any.
    pub fn server_name(&self) -> Option<&str> {
        self.elements
            .iter()
            .find(|e| e.kind == ResourceKind::Server)
            .map(|e| e.name.as_str())
    }

    /// Address of the owning server.
    pub fn server_address(&self) -> Option<ResourceAddress> {
        self.server_name().map(ResourceAddress::server)
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return f.write_str("/");
        }
        for (i, e) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

/// Errors parsing a textual address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressError {
    /// Segment without `=`.
    MalformedSegment { segment: String },
    /// Segment with an empty name.
    EmptyName { segment: String },
    UnknownKind(UnknownKind),
    /// Kind not allowed under its parent.
    InvalidNesting { address: String },
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedSegment { segment } => {
                write!(f, "malformed address segment '{segment}' (expected kind=name)")
            }
            Self::EmptyName { segment } => write!(f, "address segment '{segment}' has empty name"),
            Self::UnknownKind(k) => write!(f, "{k}"),
            Self::InvalidNesting { address } => {
                write!(f, "address '{address}' nests a resource under an invalid parent")
            }
        }
    }
}

impl std::error::Error for AddressError {}

impl FromStr for ResourceAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut addr = ResourceAddress::root();
        for segment in s.trim().split('/').filter(|seg| !seg.is_empty()) {
            let (kind, name) = segment
                .split_once('=')
                .ok_or_else(|| AddressError::MalformedSegment {
                    segment: segment.to_string(),
                })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(AddressError::EmptyName {
                    segment: segment.to_string(),
                });
            }
            let kind: ResourceKind = kind.trim().parse().map_err(AddressError::UnknownKind)?;
            if !kind.allowed_under(addr.kind()) {
                return Err(AddressError::InvalidNesting {
                    address: s.to_string(),
                });
            }
            addr = addr.append(kind, name);
        }
        Ok(addr)
    }
}

impl Serialize for ResourceAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
