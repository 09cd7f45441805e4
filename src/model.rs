//! Version-agnostic configuration model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{Result, SchemaError};

/// A node of the decoded configuration tree
///
/// Decoders of every schema version produce the same shape for a given
/// document kind, so the host never needs to know which version was read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelNode {
    /// Node name (element or resource type)
    pub name: String,
    /// Configuration keys and their values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Nested nodes, in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: ModelNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Set the attribute only when a value is present
    pub fn set_optional(&mut self, key: impl Into<String>, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.set_attribute(key, value);
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Attribute that must be present for the model to be written
    pub fn required_attribute(&self, key: &str) -> Result<&str> {
        self.attribute(key).ok_or_else(|| {
            SchemaError::InvalidModel(format!("'{}' is missing required key '{}'", self.name, key))
        })
    }

    /// Parse an attribute value, if set
    pub fn parse_attribute<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.attribute(key)
            .map(|value| {
                value.parse::<T>().map_err(|_| {
                    SchemaError::InvalidModel(format!(
                        "'{}' key '{}' has invalid value '{}'",
                        self.name, key, value
                    ))
                })
            })
            .transpose()
    }

    pub fn push_child(&mut self, child: ModelNode) {
        self.children.push(child);
    }

    /// First child with the given name
    pub fn child(&self, name: &str) -> Option<&ModelNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// The only child with the given name; a second one is `InvalidModel`
    pub fn single_child(&self, name: &str) -> Result<Option<&ModelNode>> {
        let mut matches = self.children_named(name);
        let first = matches.next();
        if matches.next().is_some() {
            return Err(SchemaError::InvalidModel(format!(
                "'{}' has more than one '{}' child",
                self.name, name
            )));
        }
        Ok(first)
    }

    /// All children with the given name
    pub fn children_named<'a: 'n, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a ModelNode> + 'n {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Reject keys or child names a writer does not know how to emit
    pub fn ensure_known(&self, keys: &[&str], children: &[&str]) -> Result<()> {
        if let Some(key) = self.attributes.keys().find(|k| !keys.contains(&k.as_str())) {
            return Err(SchemaError::InvalidModel(format!(
                "'{}' has unsupported key '{}'",
                self.name, key
            )));
        }
        if let Some(child) = self.children.iter().find(|c| !children.contains(&c.name.as_str())) {
            return Err(SchemaError::InvalidModel(format!(
                "'{}' has unsupported child '{}'",
                self.name, child.name
            )));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let node = ModelNode::new("subsystem")
            .with_attribute("default-tracer", "jaeger")
            .with_child(ModelNode::new("jaeger-tracer").with_attribute("name", "jaeger"))
            .with_child(ModelNode::new("jaeger-tracer").with_attribute("name", "b3"));

        assert_eq!(node.attribute("default-tracer"), Some("jaeger"));
        assert_eq!(node.children_named("jaeger-tracer").count(), 2);
        assert_eq!(node.child("jaeger-tracer").and_then(|c| c.attribute("name")), Some("jaeger"));
        assert!(node.child("missing").is_none());
    }

    #[test]
    fn test_single_child() {
        let node = ModelNode::new("shared-session-config")
            .with_child(ModelNode::new("session-config"))
            .with_child(ModelNode::new("replication-config"))
            .with_child(ModelNode::new("replication-config"));

        assert!(node.single_child("session-config").unwrap().is_some());
        assert!(node.single_child("cookie-config").unwrap().is_none());
        assert!(matches!(
            node.single_child("replication-config"),
            Err(SchemaError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_parse_attribute() {
        let node = ModelNode::new("max-active-sessions").with_attribute("value", "abc");
        assert!(matches!(node.parse_attribute::<u32>("value"), Err(SchemaError::InvalidModel(_))));
        assert_eq!(node.parse_attribute::<u32>("other").unwrap(), None);
        assert!(node.required_attribute("other").is_err());
    }

    #[test]
    fn test_ensure_known() {
        let node = ModelNode::new("session-config").with_attribute("session-timeout", "30");
        assert!(node.ensure_known(&["session-timeout"], &[]).is_ok());
        assert!(node.ensure_known(&[], &[]).is_err());
    }

    #[test]
    fn test_json_skips_empty_fields() {
        let json = serde_json::to_string(&ModelNode::new("subsystem")).unwrap();
        assert_eq!(json, r#"{"name":"subsystem"}"#);
        let back: ModelNode = serde_json::from_str(&json).unwrap();
        assert!(back.is_empty());
    }
}
