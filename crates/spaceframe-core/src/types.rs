//! Fixed-point scalar types.

use glam::{DVec3, I64Vec3};

/// One coordinate component, in units of 2^-precision meters.
pub type SpaceInt = i64;

/// A position vector in some coordinate space.
pub type Vector3g = I64Vec3;

/// Power-of-two exponent: 2^precision units equal one meter.
pub type Precision = i16;

/// Number of space units per meter at the given precision.
#[inline]
pub fn units_per_meter(precision: Precision) -> f64 {
    2f64.powi(i32::from(precision))
}

/// Convert a position to meters as a float.
///
/// Only for display and coarse math; precision is lost far from the origin.
#[inline]
pub fn to_meters(position: Vector3g, precision: Precision) -> DVec3 {
    position.as_dvec3() / units_per_meter(precision)
}

/// Convert meters to the nearest representable position at a precision.
#[inline]
pub fn from_meters(meters: DVec3, precision: Precision) -> Vector3g {
    (meters * units_per_meter(precision)).round().as_i64vec3()
}
