//! Closed sets of schema versions
//!
//! Each configuration document kind declares its versions as a plain enum
//! implementing [`VersionedSchema`]. The enum is the static declaration; the
//! [`SchemaRegistry`] built from it is the runtime lookup table.

use crate::error::Result;
use crate::registry::SchemaRegistry;
use crate::version::SchemaVersion;

/// A fixed, ordered set of schema versions for one document kind
pub trait VersionedSchema: Copy + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// Root element name of the document kind
    const LOCAL_NAME: &'static str;

    /// Every version, oldest first
    const ALL: &'static [Self];

    fn major(self) -> u32;

    fn minor(self) -> u32;

    /// The version value for this variant
    fn version(self) -> SchemaVersion {
        SchemaVersion::new(Self::LOCAL_NAME, self.major(), self.minor())
    }

    /// The namespace URI for this variant
    fn namespace_uri(self) -> String {
        self.version().namespace_uri()
    }

    /// The latest declared version
    fn current() -> Option<Self> {
        Self::ALL.iter().copied().max_by_key(|s| (s.major(), s.minor()))
    }

    /// Find the variant for a registered version
    fn for_version(version: &SchemaVersion) -> Option<Self> {
        if version.local_name != Self::LOCAL_NAME {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|s| (s.major(), s.minor()) == version.number())
    }

    /// Build the registry for this document kind
    fn registry() -> Result<SchemaRegistry> {
        let versions: Vec<(u32, u32)> = Self::ALL.iter().map(|s| (s.major(), s.minor())).collect();
        SchemaRegistry::with_versions(Self::LOCAL_NAME, &versions)
    }
}
