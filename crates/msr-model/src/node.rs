use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::address::PathElement;
use crate::kind::ResourceKind;

/// Attribute name → value.
pub type Attributes = BTreeMap<String, Value>;

/// A named resource in the configuration tree.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigNode {
    pub kind: ResourceKind,
    pub name: String,
    pub attributes: Attributes,
    children: BTreeMap<PathElement, ConfigNode>,
}

impl ConfigNode {
    pub fn new(kind: ResourceKind, name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            kind,
            name: name.into(),
            attributes,
            children: BTreeMap::new(),
        }
    }

    pub fn element(&self) -> PathElement {
        PathElement::new(self.kind, self.name.clone())
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| !v.is_null())
    }

    pub fn str_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    pub fn bool_attribute(&self, name: &str) -> Option<bool> {
        self.attribute(name).and_then(Value::as_bool)
    }

    pub fn has_child(&self, element: &PathElement) -> bool {
        self.children.contains_key(element)
    }

    pub fn child(&self, element: &PathElement) -> Option<&ConfigNode> {
        self.children.get(element)
    }

    pub(crate) fn child_mut(&mut self, element: &PathElement) -> Option<&mut ConfigNode> {
        self.children.get_mut(element)
    }

    pub(crate) fn insert_child(&mut self, node: ConfigNode) {
        self.children.insert(node.element(), node);
    }

    pub(crate) fn remove_child(&mut self, element: &PathElement) -> Option<ConfigNode> {
        self.children.remove(element)
    }

    pub fn children(&self) -> impl Iterator<Item = &ConfigNode> {
        self.children.values()
    }

    /// Children of exactly this kind, in name order.
    pub fn children_of(&self, kind: ResourceKind) -> impl Iterator<Item = &ConfigNode> {
        self.children.values().filter(move |c| c.kind == kind)
    }

    pub fn children_names(&self, kind: ResourceKind) -> Vec<String> {
        self.children_of(kind).map(|c| c.name.clone()).collect()
    }

    /// JSON rendering of the node and its subtree.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        let attrs: Map<String, Value> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.insert("attributes".to_string(), Value::Object(attrs));
        if !self.children.is_empty() {
            let children: Map<String, Value> = self
                .children
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect();
            out.insert("children".to_string(), Value::Object(children));
        }
        Value::Object(out)
    }
}
