//! Checksum utilities for comparing decoded models

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::Result;
use crate::model::ModelNode;

/// SHA256 checksum of a configuration model
///
/// Models serialize with sorted attribute keys, so two models carrying the
/// same settings hash identically whichever schema version they came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum over the compact JSON form of a model
    pub fn of_model(model: &ModelNode) -> Result<Self> {
        let canonical = serde_json::to_vec(model)?;
        Ok(Self::from_bytes(&canonical))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, for display
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }

    pub fn verify_model(&self, model: &ModelNode) -> Result<bool> {
        Ok(*self == Self::of_model(model)?)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
