//! The persisted configuration tree.
//!
//! Handlers only ever see the tree through a transaction's working copy; the
//! copy replaces the committed tree when the transaction succeeds.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::address::{PathElement, ResourceAddress};
use crate::kind::ResourceKind;
use crate::node::{Attributes, ConfigNode};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeError {
    /// The root address names no node.
    RootAddress,
    NotFound { address: String },
    ParentMissing { address: String },
    AlreadyExists { address: String },
    InvalidNesting { address: String },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootAddress => write!(f, "operation not allowed on the tree root"),
            Self::NotFound { address } => write!(f, "resource '{address}' not found"),
            Self::ParentMissing { address } => {
                write!(f, "parent of '{address}' does not exist")
            }
            Self::AlreadyExists { address } => write!(f, "resource '{address}' already exists"),
            Self::InvalidNesting { address } => {
                write!(f, "resource '{address}' cannot be placed under its parent")
            }
        }
    }
}

impl std::error::Error for TreeError {}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigTree {
    roots: BTreeMap<PathElement, ConfigNode>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, address: &ResourceAddress) -> Option<&ConfigNode> {
        let (first, rest) = address.elements().split_first()?;
        let mut node = self.roots.get(first)?;
        for e in rest {
            node = node.child(e)?;
        }
        Some(node)
    }

    fn read_mut(&mut self, address: &ResourceAddress) -> Option<&mut ConfigNode> {
        let (first, rest) = address.elements().split_first()?;
        let mut node = self.roots.get_mut(first)?;
        for e in rest {
            node = node.child_mut(e)?;
        }
        Some(node)
    }

    pub fn exists(&self, address: &ResourceAddress) -> bool {
        self.read(address).is_some()
    }

    /// `true` when the parent exists and already has a child named by the
    /// address's last segment. The root always "exists" as a parent.
    pub fn has_child(&self, address: &ResourceAddress) -> bool {
        let (Some(parent), Some(last)) = (address.parent(), address.last()) else {
            return false;
        };
        if parent.is_root() {
            return self.roots.contains_key(last);
        }
        self.read(&parent).map(|p| p.has_child(last)).unwrap_or(false)
    }

    pub fn parent_exists(&self, address: &ResourceAddress) -> bool {
        match address.parent() {
            Some(p) if p.is_root() => true,
            Some(p) => self.exists(&p),
            None => false,
        }
    }

    /// Top-level nodes of one kind.
    pub fn roots_of(&self, kind: ResourceKind) -> impl Iterator<Item = &ConfigNode> {
        self.roots.values().filter(move |n| n.kind == kind)
    }

    pub fn insert(
        &mut self,
        address: &ResourceAddress,
        attributes: Attributes,
    ) -> Result<(), TreeError> {
        let last = address.last().ok_or(TreeError::RootAddress)?;
        let parent = address.parent().ok_or(TreeError::RootAddress)?;
        if !last.kind.allowed_under(parent.kind()) {
            return Err(TreeError::InvalidNesting {
                address: address.to_string(),
            });
        }
        if self.has_child(address) {
            return Err(TreeError::AlreadyExists {
                address: address.to_string(),
            });
        }
        let node = ConfigNode::new(last.kind, last.name.clone(), attributes);
        if parent.is_root() {
            self.roots.insert(node.element(), node);
            return Ok(());
        }
        let parent_node = self
            .read_mut(&parent)
            .ok_or_else(|| TreeError::ParentMissing {
                address: address.to_string(),
            })?;
        parent_node.insert_child(node);
        Ok(())
    }

    /// Removes the node and its whole subtree, returning it.
    pub fn remove(&mut self, address: &ResourceAddress) -> Result<ConfigNode, TreeError> {
        let last = address.last().ok_or(TreeError::RootAddress)?;
        let parent = address.parent().ok_or(TreeError::RootAddress)?;
        let removed = if parent.is_root() {
            self.roots.remove(last)
        } else {
            self.read_mut(&parent).and_then(|p| p.remove_child(last))
        };
        removed.ok_or_else(|| TreeError::NotFound {
            address: address.to_string(),
        })
    }

    /// Writes one attribute, returning the previous value (`Null` if unset).
    pub fn write_attribute(
        &mut self,
        address: &ResourceAddress,
        name: &str,
        value: Value,
    ) -> Result<Value, TreeError> {
        let node = self.read_mut(address).ok_or_else(|| TreeError::NotFound {
            address: address.to_string(),
        })?;
        Ok(node
            .attributes
            .insert(name.to_string(), value)
            .unwrap_or(Value::Null))
    }

    pub fn to_json(&self) -> Value {
        let out: Map<String, Value> = self
            .roots
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect();
        Value::Object(out)
    }
}
