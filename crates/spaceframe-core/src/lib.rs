//! Core types, math, and ids for spaceframe.
//!
//! This crate provides the foundational pieces shared by every other crate:
//! - Fixed-point space integers and vectors
//! - Power-of-two scaling primitives
//! - Satellite and coordinate space handles
//! - The common error type

pub mod error;
pub mod ids;
pub mod math;
pub mod types;

pub use error::{Error, Result};
pub use ids::{CoSpaceId, SatelliteId};
pub use math::{int_2pow, is_power_of_2, mul_2pow};
pub use types::{Precision, SpaceInt, Vector3g};

/// Engine-wide constants
pub mod constants {
    use crate::types::Precision;

    /// Default precision of the universal root: 2^10 units = 1 meter.
    pub const DEFAULT_ROOT_PRECISION: Precision = 10;
    /// Largest precision magnitude accepted by configuration and placement.
    ///
    /// Keeps at least one bit of headroom in a 64-bit space integer.
    pub const MAX_PRECISION: Precision = 62;
    /// Largest precision difference between a space and its parent.
    ///
    /// A single hop scales by at most 2^62, which still fits a space integer.
    pub const MAX_PRECISION_STEP: i32 = 62;
    /// Rotations closer than this to the identity are treated as identity
    /// when deciding whether a composite transform is a no-op.
    pub const ROTATION_EPSILON: f64 = 1e-12;
}
