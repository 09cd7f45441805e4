//! Schema Registry
//!
//! The ordered, append-only set of schema versions known for one
//! configuration document kind. Registries are built once at startup and
//! only read afterwards.

use crate::error::{Result, SchemaError};
use crate::version::{NamespaceUri, SchemaVersion};

/// All versions of one configuration document kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRegistry {
    /// Root element name shared by every version
    local_name: String,
    /// Versions in ascending order
    versions: Vec<SchemaVersion>,
}

impl SchemaRegistry {
    /// Create an empty registry for a document kind
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            versions: Vec::new(),
        }
    }

    /// Build a registry from a static list of `(major, minor)` pairs
    pub fn with_versions(local_name: impl Into<String>, versions: &[(u32, u32)]) -> Result<Self> {
        let mut registry = Self::new(local_name);
        for &(major, minor) in versions {
            let version = SchemaVersion::new(registry.local_name.clone(), major, minor);
            registry.register(version)?;
        }
        Ok(registry)
    }

    /// Root element name of this document kind
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// All versions, sorted ascending
    pub fn versions(&self) -> &[SchemaVersion] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn contains(&self, version: &SchemaVersion) -> bool {
        self.versions.binary_search(version).is_ok()
    }

    /// Register a version
    ///
    /// This is an append-only operation: a `(major, minor)` pair that is
    /// already present is rejected and the registry is left untouched.
    pub fn register(&mut self, version: SchemaVersion) -> Result<()> {
        if version.local_name != self.local_name {
            return Err(SchemaError::UnknownNamespace(version.namespace_uri()));
        }

        match self.versions.binary_search(&version) {
            Ok(_) => Err(SchemaError::DuplicateVersion {
                local_name: version.local_name,
                major: version.major,
                minor: version.minor,
            }),
            Err(index) => {
                tracing::debug!(namespace = %version.namespace_uri(), "registered schema version");
                self.versions.insert(index, version);
                Ok(())
            }
        }
    }

    /// Resolve a namespace URI to the registered version it names
    pub fn resolve(&self, namespace_uri: &str) -> Result<&SchemaVersion> {
        let ns = NamespaceUri::parse(namespace_uri)?;
        if ns.local_name != self.local_name {
            return Err(SchemaError::UnknownNamespace(namespace_uri.to_string()));
        }

        self.versions
            .iter()
            .find(|v| v.number() == (ns.major, ns.minor))
            .ok_or_else(|| SchemaError::UnknownVersion {
                namespace: namespace_uri.to_string(),
                local_name: ns.local_name,
                major: ns.major,
                minor: ns.minor,
            })
    }

    /// The latest version, used for writing
    pub fn current(&self) -> Result<&SchemaVersion> {
        self.versions
            .last()
            .ok_or_else(|| SchemaError::EmptyRegistry(self.local_name.clone()))
    }
}
