//! Sun, planet and moon at roughly real-world scale.

use glam::{DQuat, DVec3};
use spaceframe_coords::CoSpaceTransform;
use spaceframe_core::{int_2pow, mul_2pow, CoSpaceId, SatelliteId, SpaceInt, Vector3g};
use spaceframe_universe::{Universe, UniverseConfig};
use tracing::debug;

use crate::Result;

pub const SUN_PRECISION: i16 = 10;
pub const PLANET_PRECISION: i16 = 12;
pub const MOON_PRECISION: i16 = 15;

/// `coefficient * 10^exp` meters, in units of the given precision.
pub fn sci64(coefficient: i64, exp: u32, precision: i16) -> SpaceInt {
    coefficient * 10i64.pow(exp) * int_2pow::<SpaceInt>(i32::from(precision))
}

/// Re-express a position given in `from` precision in `to` precision.
pub fn change_precision(v: Vector3g, from: i16, to: i16) -> Vector3g {
    mul_2pow::<Vector3g, SpaceInt>(v, i32::from(to) - i32::from(from))
}

/// Placements of the three spaces, without a universe.
#[derive(Clone, Copy, Debug)]
pub struct SolarTransforms {
    pub sun: CoSpaceTransform,
    pub planet: CoSpaceTransform,
    pub moon: CoSpaceTransform,
}

impl Default for SolarTransforms {
    fn default() -> Self {
        Self {
            sun: CoSpaceTransform::root(SUN_PRECISION),
            planet: CoSpaceTransform::new(PLANET_PRECISION).with_position(Self::planet_position()),
            moon: CoSpaceTransform::new(MOON_PRECISION).with_position(Self::moon_position()),
        }
    }
}

impl SolarTransforms {
    /// Planet origin in sun units: 150 million km along x and y, 42 m up.
    pub fn planet_position() -> Vector3g {
        Vector3g::new(
            sci64(150, 9, SUN_PRECISION),
            sci64(150, 9, SUN_PRECISION),
            sci64(42, 0, SUN_PRECISION),
        )
    }

    /// Moon origin in planet units: 280 thousand km along x and y, 69 km up.
    pub fn moon_position() -> Vector3g {
        Vector3g::new(
            sci64(280, 6, PLANET_PRECISION),
            sci64(280, 6, PLANET_PRECISION),
            sci64(69, 3, PLANET_PRECISION),
        )
    }
}

/// A universe whose root is the sun's space, with a planet hosting a space
/// and a moon inside it hosting another.
#[derive(Debug)]
pub struct SolarSystem {
    pub universe: Universe,
    pub planet: SatelliteId,
    pub moon: SatelliteId,
    pub sun_space: CoSpaceId,
    pub planet_space: CoSpaceId,
    pub moon_space: CoSpaceId,
}

impl SolarSystem {
    pub fn new() -> Result<Self> {
        Self::with_rotations(DQuat::IDENTITY, DQuat::IDENTITY)
    }

    /// Build with the planet and moon spaces rotated relative to their parents.
    pub fn with_rotations(planet_rotation: DQuat, moon_rotation: DQuat) -> Result<Self> {
        let mut universe = Universe::new(UniverseConfig::new(SUN_PRECISION))?;
        let sun_space = universe.root();

        let planet = universe.create_satellite();
        let planet_at = SolarTransforms::planet_position();
        universe.place(planet, sun_space, planet_at, DVec3::ZERO)?;
        universe.flush();
        let planet_space =
            universe.create_space(planet, planet_at, planet_rotation, PLANET_PRECISION)?;

        let moon = universe.create_satellite();
        let moon_at = SolarTransforms::moon_position();
        universe.place(moon, planet_space, moon_at, DVec3::ZERO)?;
        universe.flush();
        let moon_space = universe.create_space(moon, moon_at, moon_rotation, MOON_PRECISION)?;

        debug!(%sun_space, %planet_space, %moon_space, "Solar system fixture ready");
        Ok(Self {
            universe,
            planet,
            moon,
            sun_space,
            planet_space,
            moon_space,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sci64_scales() {
        assert_eq!(sci64(1, 0, 10), 1024);
        assert_eq!(sci64(3, 2, 0), 300);
    }

    #[test]
    fn change_precision_both_ways() {
        let v = Vector3g::new(8, -8, 12);
        assert_eq!(change_precision(v, 10, 12), Vector3g::new(32, -32, 48));
        assert_eq!(change_precision(v, 12, 10), Vector3g::new(2, -2, 3));
    }

    #[test]
    fn fixture_builds() {
        let system = SolarSystem::new().unwrap();
        let universe = &system.universe;
        assert_eq!(universe.parent_of(system.moon_space).unwrap(), Some(system.planet_space));
        assert_eq!(universe.residence_of(system.moon).unwrap(), Some(system.planet_space));
        assert_eq!(
            universe.placement(system.moon_space).unwrap().position,
            SolarTransforms::moon_position()
        );
    }
}
