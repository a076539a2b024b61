//! Universe configuration.

use serde::{Deserialize, Serialize};
use spaceframe_core::constants::{DEFAULT_ROOT_PRECISION, MAX_PRECISION};
use spaceframe_core::{Error, Precision, Result};

use crate::components::ComponentKindSet;

/// Configuration for a [`Universe`](crate::Universe).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Precision of the universal root: 2^root_precision units per meter.
    pub root_precision: Precision,
    /// Store velocities alongside positions.
    pub track_velocity: bool,
    /// Satellites to reserve room for in each new space.
    pub space_capacity: usize,
    /// Largest accepted depth of the space tree (root is depth 0).
    pub max_depth: u32,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            root_precision: DEFAULT_ROOT_PRECISION,
            track_velocity: true,
            space_capacity: 64,
            max_depth: 32,
        }
    }
}

impl UniverseConfig {
    /// Create a new config with the given root precision.
    pub fn new(root_precision: Precision) -> Self {
        Self {
            root_precision,
            ..Default::default()
        }
    }

    /// Enable or disable velocity storage.
    #[must_use]
    pub fn with_velocity(mut self, track_velocity: bool) -> Self {
        self.track_velocity = track_velocity;
        self
    }

    /// Set the per-space storage reservation.
    #[must_use]
    pub fn with_space_capacity(mut self, capacity: usize) -> Self {
        self.space_capacity = capacity;
        self
    }

    /// Set the deepest allowed space.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Component kinds every space is created with.
    pub fn component_kinds(&self) -> ComponentKindSet {
        if self.track_velocity {
            ComponentKindSet::all()
        } else {
            ComponentKindSet::POSITION
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.root_precision.unsigned_abs() > MAX_PRECISION.unsigned_abs() {
            return Err(Error::InvalidConfig(format!(
                "root_precision {} outside ±{MAX_PRECISION}",
                self.root_precision
            )));
        }
        if self.max_depth == 0 {
            return Err(Error::InvalidConfig("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = UniverseConfig::default();
        assert_eq!(config.root_precision, 10);
        assert!(config.validate().is_ok());
        assert!(config.component_kinds().has_velocity());
    }

    #[test]
    fn builder() {
        let config = UniverseConfig::new(8)
            .with_velocity(false)
            .with_space_capacity(4)
            .with_max_depth(3);
        assert_eq!(config.root_precision, 8);
        assert_eq!(config.space_capacity, 4);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.component_kinds(), ComponentKindSet::POSITION);
    }

    #[test]
    fn validate_rejects() {
        assert!(UniverseConfig::new(100).validate().is_err());
        assert!(UniverseConfig::default().with_max_depth(0).validate().is_err());
    }
}
