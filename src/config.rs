//! CANON configuration
//!
//! Loaded from a JSON file (every field optional) and then overridden by
//! command-line flags.

use crate::error::{CanonError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Widest unit accepted, in bits
pub const MAX_UNIT_WIDTH: usize = 4096;

/// Byte granularity
pub const DEFAULT_UNIT_WIDTH: usize = 8;

pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonConfig {
    /// Bits per unit
    pub unit_width: usize,
    /// Re-apply the basis construction to the derivation stream
    pub recursive: bool,
    /// Maximum number of closure levels kept
    pub max_depth: usize,
    /// Decode the freshly built container and compare with the input
    pub verify: bool,
}

impl Default for CanonConfig {
    fn default() -> Self {
        Self {
            unit_width: DEFAULT_UNIT_WIDTH,
            recursive: true,
            max_depth: DEFAULT_MAX_DEPTH,
            verify: true,
        }
    }
}

impl CanonConfig {
    pub fn validate(&self) -> Result<()> {
        validate_unit_width(self.unit_width)?;
        if self.max_depth == 0 {
            return Err(CanonError::ConfigError(
                "max_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            CanonError::ConfigError(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CanonError::ConfigError(format!("Serialize: {}", e)))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

pub fn validate_unit_width(width: usize) -> Result<()> {
    if width == 0 || width > MAX_UNIT_WIDTH {
        return Err(CanonError::ConfigError(format!(
            "unit width must be between 1 and {} bits, got {}",
            MAX_UNIT_WIDTH, width
        )));
    }
    Ok(())
}
