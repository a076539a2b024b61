//! Composable position transforms between coordinate spaces.
//!
//! # The common form
//!
//! A parent and a child space differ by an offset and a precision. With
//! `d = child.precision - parent.precision` and the child origin `p` (in
//! parent units):
//!
//! ```text
//! parent -> child:  f(x) = 2^d * (x - p)   = x * 2^d  + (-p) * 2^d
//! child -> parent:  g(x) = 2^-d * x + p    = x * 2^-d + p * 2^0
//! ```
//!
//! Both fit `f(x) = x * 2^n + c * 2^m`. The constant keeps its own exponent
//! instead of being folded into `c * 2^m` up front, which would overflow or
//! round. Adding rotations gives an outer rotation `R` and an inner rotation
//! `r`:
//!
//! ```text
//! f(x) = R( r(x) * 2^n + c * 2^m )
//! ```
//!
//! Parent-to-child only uses `R` (the inverse child rotation), child-to-parent
//! only uses `r` (the child rotation).
//!
//! # Composition
//!
//! For `f1(f2(x))`:
//!
//! ```text
//! f3(x) = x * 2^(n1+n2)  +  c2 * 2^(m2+n1)  +  c1 * 2^m1
//! ```
//!
//! The two constants are merged at the lower of the two exponents by
//! multiplying the other coefficient up, so no low bits are ever shifted out.

use std::cmp::Ordering;

use glam::DQuat;
use spaceframe_core::constants::ROTATION_EPSILON;
use spaceframe_core::math::{is_near_identity, is_rotated, rotate_vector3g};
use spaceframe_core::{int_2pow, mul_2pow, Precision, SpaceInt, Vector3g};

use crate::transform::CoSpaceTransform;

/// Affine map `f(x) = R( r(x) * 2^exp_x + constant * 2^exp_c )`.
///
/// Plain data: copy it freely and share it between threads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordTransformer {
    /// Outer rotation `R`, applied last
    pub rot_out: DQuat,
    /// Inner rotation `r`, applied first
    pub rot_in: DQuat,
    /// Additive constant coefficient `c`
    pub constant: Vector3g,
    /// Exponent of the linear term
    pub exp_x: i32,
    /// Exponent of the constant term
    pub exp_c: i32,
}

impl Default for CoordTransformer {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl CoordTransformer {
    /// Maps every position to itself.
    pub const IDENTITY: Self = Self {
        rot_out: DQuat::IDENTITY,
        rot_in: DQuat::IDENTITY,
        constant: Vector3g::ZERO,
        exp_x: 0,
        exp_c: 0,
    };

    /// Transformer from parent units into `child`'s units.
    pub fn parent_to_child(child: &CoSpaceTransform, parent_precision: Precision) -> Self {
        let precision_diff = i32::from(child.precision) - i32::from(parent_precision);

        Self {
            rot_out: child.rotation.inverse(),
            rot_in: DQuat::IDENTITY,
            constant: -child.position,
            exp_x: precision_diff,
            exp_c: precision_diff,
        }
    }

    /// Transformer from `child`'s units into parent units.
    pub fn child_to_parent(child: &CoSpaceTransform, parent_precision: Precision) -> Self {
        let precision_diff = i32::from(child.precision) - i32::from(parent_precision);

        Self {
            rot_out: DQuat::IDENTITY,
            rot_in: child.rotation,
            constant: child.position,
            exp_x: -precision_diff,
            exp_c: 0,
        }
    }

    /// Apply the transform to a position.
    ///
    /// Each term is rescaled on its own and the results are summed as
    /// integers. Scaling down truncates toward zero.
    #[inline]
    pub fn transform_position(&self, position: Vector3g) -> Vector3g {
        let mut pos = position;

        if is_rotated(self.rot_in) {
            pos = rotate_vector3g(pos, self.rot_in);
        }

        let mut out = mul_2pow::<Vector3g, SpaceInt>(pos, self.exp_x)
            + mul_2pow::<Vector3g, SpaceInt>(self.constant, self.exp_c);

        if is_rotated(self.rot_out) {
            out = rotate_vector3g(out, self.rot_out);
        }

        out
    }

    /// Total rotation applied to directions.
    #[inline]
    pub fn rotation(&self) -> DQuat {
        self.rot_out * self.rot_in
    }

    /// True if the transform leaves every position unchanged.
    ///
    /// The integer parts must be exactly neutral; only the rotation is
    /// compared with a tolerance.
    pub fn is_identity(&self) -> bool {
        self.exp_x == 0
            && self.constant == Vector3g::ZERO
            && is_near_identity(self.rotation(), ROTATION_EPSILON)
    }

    /// Transformer undoing this one.
    ///
    /// Exact for the integer terms. Applying a coarsening transform and then
    /// its inverse still loses the low bits dropped by the first step.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            rot_out: self.rot_in.inverse(),
            rot_in: self.rot_out.inverse(),
            constant: -self.constant,
            exp_x: -self.exp_x,
            exp_c: self.exp_c - self.exp_x,
        }
    }

    /// Transformer that applies `self` first, then `next`.
    #[inline]
    #[must_use]
    pub fn then(&self, next: &Self) -> Self {
        coord_composite(next, self)
    }
}

/// Composite two transformers into `outer(inner(x))`.
///
/// Chaining spaces of different precisions by transforming step by step
/// rounds at every coarse space on the way. The composite rounds at most once,
/// at the final rescale, and only needs computing once for many positions.
pub fn coord_composite(outer: &CoordTransformer, inner: &CoordTransformer) -> CoordTransformer {
    let d = inner.exp_c + outer.exp_x - outer.exp_c;

    let (mut c1, mut c2, exp_c) = match d.cmp(&0) {
        Ordering::Equal => (outer.constant, inner.constant, outer.exp_c),
        Ordering::Greater => (
            outer.constant,
            inner.constant * int_2pow::<SpaceInt>(d),
            outer.exp_c,
        ),
        Ordering::Less => (
            outer.constant * int_2pow::<SpaceInt>(-d),
            inner.constant,
            inner.exp_c + outer.exp_x,
        ),
    };

    // Rotation sitting between the two constants
    let mid = outer.rot_in * inner.rot_out;

    let (rot_out, rot_in) = if is_near_identity(mid, ROTATION_EPSILON) {
        (outer.rot_out, inner.rot_in)
    } else if c1.abs().max_element() >= c2.abs().max_element() {
        // Bring the inner constant into the outer frame
        c2 = rotate_vector3g(c2, mid);
        (outer.rot_out, mid * inner.rot_in)
    } else {
        // Bring the outer constant into the inner frame
        c1 = rotate_vector3g(c1, mid.inverse());
        (outer.rot_out * mid, inner.rot_in)
    };

    CoordTransformer {
        rot_out,
        rot_in,
        constant: c1 + c2,
        exp_x: outer.exp_x + inner.exp_x,
        exp_c,
    }
}

/// Transformer from `parent`'s units into `child`'s units.
#[inline]
pub fn coord_parent_to_child(
    parent: &CoSpaceTransform,
    child: &CoSpaceTransform,
) -> CoordTransformer {
    CoordTransformer::parent_to_child(child, parent.precision)
}

/// Transformer from `child`'s units into `parent`'s units.
#[inline]
pub fn coord_child_to_parent(
    parent: &CoSpaceTransform,
    child: &CoSpaceTransform,
) -> CoordTransformer {
    CoordTransformer::child_to_parent(child, parent.precision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    /// coefficient * 10^exp * 2^prec
    fn sci64(coefficient: i64, exp: u32, prec: i32) -> i64 {
        coefficient * 10i64.pow(exp) * int_2pow::<i64>(prec)
    }

    fn change_precision(v: Vector3g, from: i32, to: i32) -> Vector3g {
        mul_2pow::<Vector3g, SpaceInt>(v, to - from)
    }

    fn expect_inverse(a: &CoordTransformer, b: &CoordTransformer) {
        assert!(coord_composite(a, b).is_identity(), "{a:?} ∘ {b:?}");
        assert!(coord_composite(b, a).is_identity(), "{b:?} ∘ {a:?}");
    }

    struct SolarSystem {
        sun: CoSpaceTransform,
        planet: CoSpaceTransform,
        moon: CoSpaceTransform,
    }

    // Similar scale to the real Sun-Earth-Moon
    fn solar_system() -> SolarSystem {
        SolarSystem {
            sun: CoSpaceTransform::root(10),
            planet: CoSpaceTransform::new(12).with_position(Vector3g::new(
                sci64(150, 9, 10),
                sci64(150, 9, 10),
                sci64(42, 0, 10),
            )),
            moon: CoSpaceTransform::new(15).with_position(Vector3g::new(
                sci64(280, 6, 12),
                sci64(280, 6, 12),
                sci64(69, 3, 12),
            )),
        }
    }

    #[test]
    fn solar_system_transforms() {
        let SolarSystem { sun, planet, moon } = solar_system();

        // Point 100km above the planet, in all three spaces
        let above_planet_planet = Vector3g::new(0, 0, sci64(100, 3, 12));
        let above_planet_sun = planet.position + change_precision(above_planet_planet, 12, 10);
        let above_planet_moon = change_precision(-moon.position, 12, 15)
            + change_precision(above_planet_planet, 12, 15);

        // Point 100km above the moon, in all three spaces
        let above_moon_moon = Vector3g::new(0, 0, sci64(100, 3, 15));
        let above_moon_planet = moon.position + change_precision(above_moon_moon, 15, 12);
        let above_moon_sun = planet.position + change_precision(above_moon_planet, 12, 10);

        let sun_to_planet = coord_parent_to_child(&sun, &planet);
        let planet_to_sun = coord_child_to_parent(&sun, &planet);
        let planet_to_moon = coord_parent_to_child(&planet, &moon);
        let moon_to_planet = coord_child_to_parent(&planet, &moon);
        let sun_to_moon = coord_composite(&planet_to_moon, &sun_to_planet);
        let moon_to_sun = coord_composite(&planet_to_sun, &moon_to_planet);

        expect_inverse(&sun_to_planet, &planet_to_sun);
        expect_inverse(&planet_to_moon, &moon_to_planet);
        expect_inverse(&sun_to_moon, &moon_to_sun);

        // Origins
        assert_eq!(sun_to_planet.transform_position(planet.position), Vector3g::ZERO);
        assert_eq!(planet_to_sun.transform_position(Vector3g::ZERO), planet.position);
        assert_eq!(planet_to_moon.transform_position(moon.position), Vector3g::ZERO);
        assert_eq!(moon_to_planet.transform_position(Vector3g::ZERO), moon.position);

        // Point above the planet agrees between spaces
        assert_eq!(sun_to_planet.transform_position(above_planet_sun), above_planet_planet);
        assert_eq!(planet_to_sun.transform_position(above_planet_planet), above_planet_sun);
        assert_eq!(moon_to_planet.transform_position(above_planet_moon), above_planet_planet);
        assert_eq!(planet_to_moon.transform_position(above_planet_planet), above_planet_moon);

        // Point above the moon agrees between spaces
        assert_eq!(planet_to_moon.transform_position(above_moon_planet), above_moon_moon);
        assert_eq!(moon_to_planet.transform_position(above_moon_moon), above_moon_planet);
        assert_eq!(sun_to_moon.transform_position(above_moon_sun), above_moon_moon);
        assert_eq!(moon_to_sun.transform_position(above_moon_moon), above_moon_sun);
    }

    #[test]
    fn composite_merges_at_lower_exponent() {
        let SolarSystem { sun, planet, moon } = solar_system();
        let sun_to_planet = coord_parent_to_child(&sun, &planet);
        let planet_to_moon = coord_parent_to_child(&planet, &moon);
        let sun_to_moon = coord_composite(&planet_to_moon, &sun_to_planet);

        assert_eq!(sun_to_moon.exp_x, 5);
        assert_eq!(sun_to_moon.exp_c, 3);
        assert_eq!(sun_to_moon.constant, -planet.position * 4 - moon.position);

        let moon_to_planet = coord_child_to_parent(&planet, &moon);
        let planet_to_sun = coord_child_to_parent(&sun, &planet);
        let moon_to_sun = coord_composite(&planet_to_sun, &moon_to_planet);

        assert_eq!(moon_to_sun.exp_x, -5);
        assert_eq!(moon_to_sun.exp_c, -2);
        assert_eq!(moon_to_sun.constant, planet.position * 4 + moon.position);
    }

    #[test]
    fn composite_is_associative() {
        let a = CoSpaceTransform::root(8);
        let b = CoSpaceTransform::new(11).with_position(Vector3g::new(-900_001, 77, 3));
        let c = CoSpaceTransform::new(9).with_position(Vector3g::new(12_345, -6, 1 << 30));
        let d = CoSpaceTransform::new(20).with_position(Vector3g::new(5, 5, -5));

        let ab = coord_parent_to_child(&a, &b);
        let bc = coord_parent_to_child(&b, &c);
        let cd = coord_parent_to_child(&c, &d);

        let left = coord_composite(&cd, &coord_composite(&bc, &ab));
        let right = coord_composite(&coord_composite(&cd, &bc), &ab);
        assert_eq!(left, right);

        let dc = coord_child_to_parent(&c, &d);
        let cb = coord_child_to_parent(&b, &c);
        let ba = coord_child_to_parent(&a, &b);
        let left = coord_composite(&ba, &coord_composite(&cb, &dc));
        let right = coord_composite(&coord_composite(&ba, &cb), &dc);
        assert_eq!(left, right);
    }

    #[test]
    fn composite_with_own_inverse_is_identity() {
        let parent = CoSpaceTransform::root(10);
        let child = CoSpaceTransform::new(4).with_position(Vector3g::new(1 << 40, -3, 99));
        let a = coord_parent_to_child(&parent, &child);

        assert!(coord_composite(&a.inverse(), &a).is_identity());
        assert!(coord_composite(&a, &a.inverse()).is_identity());
    }

    #[test]
    fn inverse_matches_opposite_direction() {
        let parent = CoSpaceTransform::root(10);
        let child = CoSpaceTransform::new(13).with_position(Vector3g::new(100, 200, 300));
        let down = coord_parent_to_child(&parent, &child);
        let up = coord_child_to_parent(&parent, &child);
        assert_eq!(down.inverse(), up);
        assert_eq!(up.inverse(), down);
    }

    #[test]
    fn magnifying_roundtrip_is_exact() {
        let parent = CoSpaceTransform::root(3);
        let child = CoSpaceTransform::new(9).with_position(Vector3g::new(-77_777, 123, 1 << 33));
        let down = coord_parent_to_child(&parent, &child);
        let up = down.inverse();

        for p in [
            Vector3g::ZERO,
            Vector3g::new(1, -1, 1),
            Vector3g::new(-1_000_000_007, 42, 5),
            Vector3g::new(1 << 40, -(1 << 41), 3),
        ] {
            assert_eq!(up.transform_position(down.transform_position(p)), p);
        }
    }

    #[test]
    fn coarsening_truncates_toward_zero() {
        let parent = CoSpaceTransform::root(12);
        let child = CoSpaceTransform::new(10);
        let down = coord_parent_to_child(&parent, &child);

        assert_eq!(down.transform_position(Vector3g::new(7, -7, 4)), Vector3g::new(1, -1, 1));
    }

    #[test]
    fn equal_precision_is_pure_translation() {
        let parent = CoSpaceTransform::root(10);
        let child = CoSpaceTransform::new(10).with_position(Vector3g::new(10, 20, 30));
        let down = coord_parent_to_child(&parent, &child);

        assert_eq!(down.exp_x, 0);
        assert_eq!(down.transform_position(Vector3g::new(11, 22, 33)), Vector3g::new(1, 2, 3));
    }

    #[test]
    fn rotated_child_space() {
        let parent = CoSpaceTransform::root(10);
        let child = CoSpaceTransform::new(10)
            .with_position(Vector3g::new(1000, 0, 0))
            .with_rotation(DQuat::from_rotation_z(FRAC_PI_2));

        let up = coord_child_to_parent(&parent, &child);
        let down = coord_parent_to_child(&parent, &child);

        assert_eq!(up.transform_position(Vector3g::ZERO), child.position);
        assert_eq!(down.transform_position(child.position), Vector3g::ZERO);

        // Child +Y points along parent -X
        assert_eq!(up.transform_position(Vector3g::new(0, 10, 0)), Vector3g::new(990, 0, 0));
        assert_eq!(down.transform_position(Vector3g::new(990, 0, 0)), Vector3g::new(0, 10, 0));

        expect_inverse(&up, &down);
    }

    #[test]
    fn rotated_chain_matches_stepwise() {
        let sun = CoSpaceTransform::root(10);
        let planet = CoSpaceTransform::new(12)
            .with_position(Vector3g::new(1 << 40, 1 << 38, 0))
            .with_rotation(DQuat::from_rotation_z(FRAC_PI_2));
        let moon = CoSpaceTransform::new(15)
            .with_position(Vector3g::new(1 << 30, 0, 1 << 28))
            .with_rotation(DQuat::from_rotation_x(FRAC_PI_2));

        let sun_to_planet = coord_parent_to_child(&sun, &planet);
        let planet_to_moon = coord_parent_to_child(&planet, &moon);
        let sun_to_moon = sun_to_planet.then(&planet_to_moon);

        let p = Vector3g::new((1 << 40) + 4096, (1 << 38) - 8192, 1024);
        let stepwise = planet_to_moon.transform_position(sun_to_planet.transform_position(p));
        let direct = sun_to_moon.transform_position(p);

        let error = (stepwise - direct).abs().max_element();
        assert!(error <= 2, "stepwise {stepwise} direct {direct}");

        let moon_to_sun = coord_child_to_parent(&planet, &moon).then(&coord_child_to_parent(&sun, &planet));
        expect_inverse(&sun_to_moon, &moon_to_sun);
    }

    #[test]
    fn unrotated_parent_keeps_rotation_exact() {
        let parent = CoSpaceTransform::root(10);
        let child = CoSpaceTransform::new(11).with_position(Vector3g::new(3, 4, 5));
        let t = coord_parent_to_child(&parent, &child).then(&coord_child_to_parent(&parent, &child));

        assert_eq!(t.rot_out, DQuat::IDENTITY);
        assert_eq!(t.rot_in, DQuat::IDENTITY);
        assert!(t.is_identity());
    }

    #[test]
    fn identity_requires_zero_constant() {
        let mut t = CoordTransformer::IDENTITY;
        assert!(t.is_identity());
        t.exp_c = 7;
        assert!(t.is_identity());
        t.constant = Vector3g::new(0, 1, 0);
        assert!(!t.is_identity());
        t.constant = Vector3g::ZERO;
        t.exp_x = 1;
        assert!(!t.is_identity());
    }
}
