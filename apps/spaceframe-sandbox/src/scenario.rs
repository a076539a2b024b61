//! Star, planet and ship swarm driven step by step.

use glam::{DQuat, DVec3};
use spaceframe_core::types::{from_meters, to_meters};
use spaceframe_core::{CoSpaceId, Precision, SatelliteId};
use spaceframe_universe::{Command, Universe, UniverseConfig};
use tracing::{debug, info, warn};

/// Planet orbit radius in meters.
const ORBIT_RADIUS: f64 = 150.0e9;
/// Planet orbital angular velocity in radians per second (one year).
const ORBIT_RATE: f64 = std::f64::consts::TAU / (365.25 * 86_400.0);
/// Extra precision of the planet's space over the star's.
const PLANET_EXTRA_PRECISION: Precision = 2;
/// Spacing between ships in meters.
const SHIP_SPACING: f64 = 1_000.0;
/// Steps between ship hops from one space to another.
const HOP_INTERVAL: u32 = 25;

/// Sandbox parameters (from CLI or defaults).
#[derive(Debug, Clone)]
pub struct ScenarioParams {
    pub ships: usize,
    pub steps: u32,
    pub dt: f64,
    pub root_precision: Precision,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            ships: 16,
            steps: 100,
            dt: 60.0,
            root_precision: 10,
        }
    }
}

impl ScenarioParams {
    /// Parse parameters from command line arguments.
    pub fn from_args() -> Self {
        let mut params = Self::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1);
            let consumed = match (args[i].as_str(), value) {
                ("--ships", Some(v)) => v.parse().map(|n| params.ships = n).is_ok(),
                ("--steps", Some(v)) => v.parse().map(|n| params.steps = n).is_ok(),
                ("--dt", Some(v)) => v.parse().map(|n| params.dt = n).is_ok(),
                ("--root-precision", Some(v)) => {
                    v.parse().map(|n| params.root_precision = n).is_ok()
                }
                _ => false,
            };
            if consumed {
                i += 1;
            }
            i += 1;
        }

        params
    }
}

pub struct Scenario {
    universe: Universe,
    params: ScenarioParams,
    star_space: CoSpaceId,
    planet: SatelliteId,
    planet_space: CoSpaceId,
    ships: Vec<SatelliteId>,
    angle: f64,
    step: u32,
}

impl Scenario {
    pub fn new(params: &ScenarioParams) -> anyhow::Result<Self> {
        let mut universe = Universe::new(UniverseConfig::new(params.root_precision))?;
        let star_space = universe.root();

        let planet = universe.create_satellite();
        let planet_at = from_meters(DVec3::new(ORBIT_RADIUS, 0.0, 0.0), params.root_precision);
        universe.place(planet, star_space, planet_at, DVec3::ZERO)?;
        universe.flush();

        let planet_precision = params.root_precision + PLANET_EXTRA_PRECISION;
        let planet_space =
            universe.create_space(planet, planet_at, DQuat::IDENTITY, planet_precision)?;

        let ships: Vec<_> = (0..params.ships)
            .map(|_| universe.create_satellite())
            .collect();
        for (i, &ship) in ships.iter().enumerate() {
            let offset = DVec3::new(SHIP_SPACING * (i as f64 + 1.0), 0.0, 0.0);
            let velocity = DVec3::new(0.0, 10.0 + i as f64, 0.0);
            universe.place(
                ship,
                planet_space,
                from_meters(offset, planet_precision),
                velocity,
            )?;
        }
        let summary = universe.flush();
        info!(ships = summary.added, %planet_space, "Scenario ready");

        Ok(Self {
            universe,
            params: params.clone(),
            star_space,
            planet,
            planet_space,
            ships,
            angle: 0.0,
            step: 0,
        })
    }

    /// Advance the orbit and every ship by one time step.
    pub fn step(&mut self) -> anyhow::Result<()> {
        let dt = self.params.dt;
        self.angle += ORBIT_RATE * dt;

        let orbit = DVec3::new(self.angle.cos(), self.angle.sin(), 0.0) * ORBIT_RADIUS;
        let planet_at = from_meters(orbit, self.params.root_precision);
        self.universe
            .set_placement(self.planet_space, planet_at, DQuat::IDENTITY)?;
        self.universe
            .space(self.star_space)?
            .command(Command::set_position(self.planet, planet_at));

        self.step += 1;
        if self.step % HOP_INTERVAL == 0 && !self.ships.is_empty() {
            self.hop()?;
        }

        for &ship in &self.ships {
            // Ships mid-hop drift again after the flush
            if self.universe.satellites().pending(ship)?.is_some() {
                continue;
            }
            let Some(space_id) = self.universe.residence_of(ship)? else {
                continue;
            };
            let space = self.universe.space(space_id)?;
            let (_, velocity) = space.state_of(ship)?;
            let delta = from_meters(velocity * dt, space.pow2scale());
            space.command(Command::offset_position(ship, delta));
        }

        let summary = self.universe.flush();
        if !summary.unresolved.is_empty() {
            warn!(count = summary.unresolved.len(), "Unresolved commands");
        }
        debug!(step = self.step, applied = summary.applied, "Step done");
        Ok(())
    }

    /// Move one ship to the other space.
    fn hop(&mut self) -> anyhow::Result<()> {
        let index = (self.step / HOP_INTERVAL) as usize % self.ships.len();
        let ship = self.ships[index];
        let target = match self.universe.residence_of(ship)? {
            Some(space) if space == self.planet_space => self.star_space,
            _ => self.planet_space,
        };
        self.universe.transfer(ship, target)?;
        info!(%ship, %target, step = self.step, "Ship hops");
        Ok(())
    }

    /// Log where every ship is, measured from the star.
    pub fn report(&self) -> anyhow::Result<()> {
        let root_precision = self.params.root_precision;
        for space in self.universe.spaces() {
            if space.is_empty() {
                continue;
            }
            let to_star = self.universe.transformer(space.id(), self.star_space)?;
            let in_star = space.positions_in(&to_star);

            let farthest = in_star
                .iter()
                .map(|&p| to_meters(p, root_precision).length())
                .fold(0.0_f64, f64::max);
            info!(
                space = %space.id(),
                satellites = space.len(),
                farthest_km = farthest / 1_000.0,
                "Space summary"
            );
        }

        for &ship in &self.ships {
            let (space, position) = self.universe.locate(ship)?;
            let meters = to_meters(position, self.universe.space(space)?.pow2scale());
            debug!(%ship, %space, x = meters.x, y = meters.y, z = meters.z, "Ship position");
        }

        let elapsed_days = f64::from(self.step) * self.params.dt / 86_400.0;
        info!(steps = self.step, elapsed_days, "Sandbox finished");
        Ok(())
    }
}
