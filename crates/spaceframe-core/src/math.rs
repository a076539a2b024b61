//! Power-of-two scaling and rotation helpers.
//!
//! Every change of precision between coordinate spaces is a multiplication or
//! division by a power of two. Keeping these as integer operations is what lets
//! positions survive a trip across planetary distances without drifting.

use std::ops::{BitAnd, Div, Mul, Shl, Sub};

use glam::{DQuat, DVec3};

use crate::types::Vector3g;

/// Integer types usable as the scale factor in [`int_2pow`] and [`mul_2pow`].
pub trait FixedInt:
    Copy + PartialOrd + Shl<u32, Output = Self> + BitAnd<Output = Self> + Sub<Output = Self>
{
    const ZERO: Self;
    const ONE: Self;
    const BITS: u32;
}

macro_rules! impl_fixed_int {
    ($($t:ty),*) => {
        $(
            impl FixedInt for $t {
                const ZERO: Self = 0;
                const ONE: Self = 1;
                const BITS: u32 = <$t>::BITS;
            }
        )*
    };
}

impl_fixed_int!(i32, i64, i128, u32, u64, u128);

/// Integer 2^exponent.
///
/// # Panics
/// If `exponent` is negative or does not fit in `I`. Use [`mul_2pow`] to
/// divide by a power of two.
#[inline]
pub fn int_2pow<I: FixedInt>(exponent: i32) -> I {
    assert!(
        exponent >= 0,
        "int_2pow called with negative exponent {exponent}; use mul_2pow to divide"
    );
    let shift = exponent as u32;
    assert!(shift < I::BITS, "int_2pow exponent {exponent} overflows the integer type");
    I::ONE << shift
}

/// Returns true if value is a positive power of two.
#[inline]
pub fn is_power_of_2<I: FixedInt>(value: I) -> bool {
    value > I::ZERO && (value & (value - I::ONE)) == I::ZERO
}

/// Multiply a value by a power of two, allowing negative exponents.
///
/// A negative exponent divides, truncating toward zero like integer division.
/// Any divisor is accepted: dividing by more than the width of `I` gives zero.
/// `T` is the value type (a scalar or an integer vector) and `I` the integer
/// type the power of two is computed in.
///
/// # Panics
/// If a positive `exponent` does not fit in `I`, as [`int_2pow`] does.
#[inline]
pub fn mul_2pow<T, I>(value: T, exponent: i32) -> T
where
    T: Mul<I, Output = T> + Div<I, Output = T>,
    I: FixedInt,
{
    if exponent >= 0 {
        return value * int_2pow::<I>(exponent);
    }

    // 2^(BITS-2) is the largest power of two positive in every FixedInt.
    // Truncating division composes, so large divisors are split into steps.
    let max_step = I::BITS - 2;
    let mut remaining = exponent.unsigned_abs().min(I::BITS);
    let mut value = value;
    while remaining > 0 {
        let step = remaining.min(max_step);
        value = value / (I::ONE << step);
        remaining -= step;
    }
    value
}

/// Rotate an integer vector, rounding the result to the nearest unit.
#[inline]
pub fn rotate_vector3g(v: Vector3g, rotation: DQuat) -> Vector3g {
    (rotation * v.as_dvec3()).round().as_i64vec3()
}

/// Returns true if the quaternion applies any rotation at all.
///
/// This is an exact test: a unit quaternion with a zero vector part is the
/// identity (or its negation, which rotates identically).
#[inline]
pub fn is_rotated(rotation: DQuat) -> bool {
    rotation.xyz() != DVec3::ZERO
}

/// Returns true if the rotation angle is negligible.
///
/// Compares the vector part (sin of the half angle) rather than `w`, since
/// `w` is insensitive to small angles.
#[inline]
pub fn is_near_identity(rotation: DQuat, epsilon: f64) -> bool {
    rotation.xyz().length() <= epsilon
}
