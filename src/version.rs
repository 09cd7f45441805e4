//! Schema versioning utilities

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{Result, SchemaError};

/// Prefix shared by every configuration namespace URI
pub const NAMESPACE_PREFIX: &str = "urn:jboss:";

static NAMESPACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^urn:jboss:([a-z][a-z0-9]*(?:-[a-z0-9]+)*):(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)$")
        .expect("namespace pattern is valid")
});

/// One revision of a configuration document's structure
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Root element name of the document kind (e.g. "subsystem")
    pub local_name: String,
}

impl SchemaVersion {
    /// Create a new schema version
    pub fn new(local_name: impl Into<String>, major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            local_name: local_name.into(),
        }
    }

    /// Parse a namespace URI into the version it names
    pub fn from_namespace(uri: &str) -> Result<Self> {
        let ns = NamespaceUri::parse(uri)?;
        Ok(Self::new(ns.local_name, ns.major, ns.minor))
    }

    /// The namespace URI, e.g. `urn:jboss:shared-session-config:2.0`
    pub fn namespace_uri(&self) -> String {
        format!("{}{}:{}.{}", NAMESPACE_PREFIX, self.local_name, self.major, self.minor)
    }

    /// Major/minor pair
    pub fn number(&self) -> (u32, u32) {
        (self.major, self.minor)
    }

    /// Check if this is a major version bump from another version
    pub fn is_major_bump_from(&self, other: &SchemaVersion) -> bool {
        self.major > other.major
    }

    /// Check if this is a minor version bump from another version
    pub fn is_minor_bump_from(&self, other: &SchemaVersion) -> bool {
        self.major == other.major && self.minor > other.minor
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.local_name, self.major, self.minor)
    }
}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// (major, minor) decides; local_name only keeps Ord consistent with Eq.
impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number()
            .cmp(&other.number())
            .then_with(|| self.local_name.cmp(&other.local_name))
    }
}

/// The parts of a namespace URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceUri {
    pub local_name: String,
    pub major: u32,
    pub minor: u32,
}

impl NamespaceUri {
    /// Strictly parse `urn:jboss:<local-name>:<major>.<minor>`.
    ///
    /// Leading zeros, whitespace, missing components and anything after the
    /// minor version are rejected with [`SchemaError::UnknownNamespace`].
    pub fn parse(uri: &str) -> Result<Self> {
        let caps = NAMESPACE_PATTERN
            .captures(uri)
            .ok_or_else(|| SchemaError::UnknownNamespace(uri.to_string()))?;

        // Digits matched by the pattern can still overflow u32.
        let number = |i: usize| {
            caps[i]
                .parse::<u32>()
                .map_err(|_| SchemaError::UnknownNamespace(uri.to_string()))
        };

        Ok(Self {
            local_name: caps[1].to_string(),
            major: number(2)?,
            minor: number(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_uri() {
        let v = SchemaVersion::new("shared-session-config", 2, 0);
        assert_eq!(v.namespace_uri(), "urn:jboss:shared-session-config:2.0");
        assert_eq!(v.to_string(), "shared-session-config 2.0");
    }

    #[test]
    fn test_namespace_round_trip() {
        let v = SchemaVersion::new("subsystem", 3, 12);
        let parsed = SchemaVersion::from_namespace(&v.namespace_uri()).unwrap();
        assert_eq!(parsed, v);
    }

    #[test]
    fn test_ordering_is_major_then_minor() {
        let v1_0 = SchemaVersion::new("subsystem", 1, 0);
        let v1_9 = SchemaVersion::new("subsystem", 1, 9);
        let v2_0 = SchemaVersion::new("subsystem", 2, 0);
        let v10_0 = SchemaVersion::new("subsystem", 10, 0);

        assert!(v1_0 < v1_9);
        assert!(v1_9 < v2_0);
        assert!(v2_0 < v10_0);

        let mut versions = vec![v10_0.clone(), v1_9.clone(), v2_0.clone(), v1_0.clone()];
        versions.sort();
        assert_eq!(versions, vec![v1_0, v1_9, v2_0, v10_0]);
    }

    #[test]
    fn test_equality_includes_local_name() {
        assert_ne!(
            SchemaVersion::new("subsystem", 1, 0),
            SchemaVersion::new("shared-session-config", 1, 0)
        );
    }

    #[test]
    fn test_version_bumps() {
        let v1_1 = SchemaVersion::new("subsystem", 1, 1);
        assert!(SchemaVersion::new("subsystem", 2, 0).is_major_bump_from(&v1_1));
        assert!(SchemaVersion::new("subsystem", 1, 2).is_minor_bump_from(&v1_1));
        assert!(!SchemaVersion::new("subsystem", 2, 2).is_minor_bump_from(&v1_1));
    }

    #[test]
    fn test_parse_rejects_malformed_uris() {
        for uri in [
            "",
            "urn:jboss:subsystem",
            "urn:jboss:subsystem:1",
            "urn:jboss:subsystem:1.0.0",
            "urn:jboss:subsystem:01.0",
            "urn:jboss:subsystem:1.0 ",
            "urn:wildfly:subsystem:1.0",
            "urn:jboss:Subsystem:1.0",
            "urn:jboss::1.0",
            "urn:jboss:subsystem:99999999999.0",
        ] {
            match NamespaceUri::parse(uri) {
                Err(SchemaError::UnknownNamespace(found)) => assert_eq!(found, uri),
                other => panic!("expected UnknownNamespace for {uri:?}, got {other:?}"),
            }
        }
    }
}
