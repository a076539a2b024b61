//! Placement of one coordinate space inside its parent.

use glam::DQuat;
use serde::{Deserialize, Serialize};
use spaceframe_core::constants::{DEFAULT_ROOT_PRECISION, MAX_PRECISION};
use spaceframe_core::{CoSpaceId, Error, Precision, Result, Vector3g};

/// Describes where a coordinate space sits relative to its parent.
///
/// Treated as an immutable snapshot: when the owner of a space moves it, a new
/// placement is written and transformers are rebuilt from it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoSpaceTransform {
    /// Origin of this space, in the parent's units and precision
    pub position: Vector3g,
    /// Orientation of this space's axes relative to the parent's axes
    pub rotation: DQuat,
    /// 2^precision units of this space equal one meter
    pub precision: Precision,
    /// Parent space. Only used by whoever walks the tree, never by the math.
    pub parent: Option<CoSpaceId>,
}

impl Default for CoSpaceTransform {
    fn default() -> Self {
        Self {
            position: Vector3g::ZERO,
            rotation: DQuat::IDENTITY,
            precision: DEFAULT_ROOT_PRECISION,
            parent: None,
        }
    }
}

impl CoSpaceTransform {
    /// Create a placement at the parent's origin with the given precision
    #[inline]
    pub fn new(precision: Precision) -> Self {
        Self {
            precision,
            ..Default::default()
        }
    }

    /// Create a root placement: no parent, no offset, no rotation
    #[inline]
    pub fn root(precision: Precision) -> Self {
        Self::new(precision)
    }

    /// Set the origin, in parent units
    #[inline]
    #[must_use]
    pub fn with_position(mut self, position: Vector3g) -> Self {
        self.position = position;
        self
    }

    /// Set the orientation relative to the parent
    #[inline]
    #[must_use]
    pub fn with_rotation(mut self, rotation: DQuat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the parent space
    #[inline]
    #[must_use]
    pub fn with_parent(mut self, parent: CoSpaceId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Check that the precision is usable and the rotation is a unit quaternion.
    pub fn validate(&self) -> Result<()> {
        if self.precision.unsigned_abs() > MAX_PRECISION.unsigned_abs() {
            return Err(Error::InvalidConfig(format!(
                "precision {} outside ±{MAX_PRECISION}",
                self.precision
            )));
        }
        if !self.rotation.is_normalized() {
            return Err(Error::InvalidConfig(format!(
                "rotation {:?} is not a unit quaternion",
                self.rotation
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_root_like() {
        let t = CoSpaceTransform::default();
        assert_eq!(t.position, Vector3g::ZERO);
        assert_eq!(t.rotation, DQuat::IDENTITY);
        assert_eq!(t.precision, DEFAULT_ROOT_PRECISION);
        assert_eq!(t.parent, None);
    }

    #[test]
    fn builder() {
        let t = CoSpaceTransform::new(12)
            .with_position(Vector3g::new(1, 2, 3))
            .with_parent(CoSpaceId(4));
        assert_eq!(t.precision, 12);
        assert_eq!(t.position, Vector3g::new(1, 2, 3));
        assert_eq!(t.parent, Some(CoSpaceId(4)));
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(CoSpaceTransform::new(63).validate().is_err());
        assert!(CoSpaceTransform::new(-63).validate().is_err());
        assert!(CoSpaceTransform::new(12)
            .with_rotation(DQuat::from_xyzw(0.0, 0.0, 0.0, 2.0))
            .validate()
            .is_err());
        assert!(CoSpaceTransform::new(-4).validate().is_ok());
    }
}
