//! The universe: a tree of coordinate spaces and the satellites placed in them.

use glam::{DQuat, DVec3};
use parking_lot::RwLock;
use rayon::prelude::*;
use spaceframe_coords::{CoSpaceTransform, CoSpaceTree, CoordTransformer};
use spaceframe_core::{CoSpaceId, Error, Precision, Result, SatelliteId, Vector3g};
use tracing::{debug, info, trace_span, warn};

use crate::commands::Command;
use crate::config::UniverseConfig;
use crate::satellites::SatelliteRegistry;
use crate::space::{CoordinateSpace, ExchangeReport};

/// Totals of one [`Universe::flush`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlushSummary {
    /// Spaces exchanged
    pub spaces: usize,
    pub added: usize,
    pub removed: usize,
    /// Commands applied
    pub applied: usize,
    /// Satellites despawned after leaving their last space
    pub destroyed: usize,
    /// Commands that addressed satellites not stored in the target space
    pub unresolved: Vec<(CoSpaceId, Command)>,
    /// Commands editing a value the target space does not store
    pub unsupported: Vec<(CoSpaceId, Command)>,
}

/// Owns the space tree, every coordinate space and the satellite registry.
///
/// Placement changes go through the universe, which keeps each satellite's
/// residence in step with the space storing it. Work queued directly on a
/// [`CoordinateSpace`] is picked up by the next flush, which records the
/// residence of whatever it added or removed and keeps one row per satellite.
#[derive(Debug)]
pub struct Universe {
    config: UniverseConfig,
    tree: RwLock<CoSpaceTree>,
    spaces: Vec<Option<CoordinateSpace>>,
    satellites: SatelliteRegistry,
}

impl Universe {
    /// Create a universe holding only the root space.
    pub fn new(config: UniverseConfig) -> Result<Self> {
        config.validate()?;

        let tree = CoSpaceTree::new(config.root_precision);
        let root = CoordinateSpace::new(
            tree.root(),
            None,
            0,
            config.root_precision,
            config.component_kinds(),
            config.space_capacity,
        );

        info!(
            root_precision = config.root_precision,
            track_velocity = config.track_velocity,
            "Universe created"
        );

        Ok(Self {
            config,
            tree: RwLock::new(tree),
            spaces: vec![Some(root)],
            satellites: SatelliteRegistry::new(),
        })
    }

    pub fn config(&self) -> &UniverseConfig {
        &self.config
    }

    /// The universal root space.
    pub fn root(&self) -> CoSpaceId {
        self.tree.read().root()
    }

    pub fn satellites(&self) -> &SatelliteRegistry {
        &self.satellites
    }

    /// Register a satellite. It is not stored anywhere until placed.
    pub fn create_satellite(&mut self) -> SatelliteId {
        self.satellites.create()
    }

    /// A coordinate space.
    pub fn space(&self, id: CoSpaceId) -> Result<&CoordinateSpace> {
        self.spaces
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(Error::UnknownSpace(id))
    }

    /// Every live coordinate space.
    pub fn spaces(&self) -> impl Iterator<Item = &CoordinateSpace> {
        self.spaces.iter().flatten()
    }

    /// Placement of a space inside its parent.
    pub fn placement(&self, id: CoSpaceId) -> Result<CoSpaceTransform> {
        self.tree.read().get(id).copied()
    }

    /// Parent of a space, `None` for the root.
    pub fn parent_of(&self, id: CoSpaceId) -> Result<Option<CoSpaceId>> {
        self.tree.read().parent_of(id)
    }

    /// Queue a satellite for storage in `space` at `position`, in that
    /// space's units.
    ///
    /// A satellite already stored elsewhere is queued for removal there. A
    /// satellite hosting a space can only be re-placed in the space it lives
    /// in.
    pub fn place(
        &mut self,
        sat: SatelliteId,
        space: CoSpaceId,
        position: Vector3g,
        velocity: DVec3,
    ) -> Result<()> {
        self.satellites.check_alive(sat)?;
        self.queue_move(sat, space, position, velocity)
    }

    fn queue_move(
        &mut self,
        sat: SatelliteId,
        to: CoSpaceId,
        position: Vector3g,
        velocity: DVec3,
    ) -> Result<()> {
        if self.satellites.pending(sat)?.is_some() {
            return Err(Error::PendingPlacement(sat));
        }
        let target = self.space(to)?;
        let residence = self.satellites.residence(sat)?;

        // A hosted space stays parented where its host lives
        if let Some(space) = self.satellites.hosted(sat)? {
            if residence != Some(to) {
                return Err(Error::HostsSpace { sat, space });
            }
        }

        if let Some(from) = residence {
            if from != to {
                let source = self.space(from)?;
                source.remove(source.index_of(sat)?);
            }
        }
        target.add(sat, position, velocity);
        self.satellites.set_pending(sat, to)
    }

    /// Move a satellite into another space, keeping its physical position.
    ///
    /// Position is converted exactly into the target's units and velocity is
    /// rotated into the target's axes. Fails with [`Error::HostsSpace`] for a
    /// satellite hosting a space.
    pub fn transfer(&mut self, sat: SatelliteId, to: CoSpaceId) -> Result<()> {
        self.satellites.check_alive(sat)?;
        if self.satellites.pending(sat)?.is_some() {
            return Err(Error::PendingPlacement(sat));
        }
        let from = self.satellites.residence(sat)?.ok_or(Error::NotResident(sat))?;
        if from == to {
            return Ok(());
        }
        if let Some(space) = self.satellites.hosted(sat)? {
            return Err(Error::HostsSpace { sat, space });
        }

        let (position, velocity) = self.space(from)?.state_of(sat)?;
        let transformer = self.transformer(from, to)?;
        let position = transformer.transform_position(position);
        let velocity = transformer.rotation() * velocity;

        debug!(%sat, %from, %to, "Transferring satellite");
        self.queue_move(sat, to, position, velocity)
    }

    /// Create a space hosted by `host`, inside the space the host lives in.
    ///
    /// `position` is in the parent's units.
    pub fn create_space(
        &mut self,
        host: SatelliteId,
        position: Vector3g,
        rotation: DQuat,
        precision: Precision,
    ) -> Result<CoSpaceId> {
        self.satellites.check_alive(host)?;
        if let Some(space) = self.satellites.hosted(host)? {
            return Err(Error::HostsSpace { sat: host, space });
        }
        let parent = self
            .satellites
            .residence(host)?
            .ok_or(Error::NotResident(host))?;

        let id = {
            let mut tree = self.tree.write();
            let depth = tree.depth_of(parent)? + 1;
            if depth > self.config.max_depth {
                return Err(Error::InvalidConfig(format!(
                    "space depth {depth} exceeds max_depth {}",
                    self.config.max_depth
                )));
            }
            let placement = CoSpaceTransform::new(precision)
                .with_position(position)
                .with_rotation(rotation);
            let id = tree.insert(parent, placement)?;

            let space = CoordinateSpace::new(
                id,
                Some(host),
                depth,
                precision,
                self.config.component_kinds(),
                self.config.space_capacity,
            );
            if self.spaces.len() <= id.index() {
                self.spaces.resize_with(id.index() + 1, || None);
            }
            self.spaces[id.index()] = Some(space);
            id
        };

        self.satellites.set_hosts(host, id)?;
        info!(%id, %parent, %host, precision, "Created coordinate space");
        Ok(id)
    }

    /// Destroy an empty leaf space.
    pub fn destroy_space(&mut self, id: CoSpaceId) -> Result<()> {
        if id == self.root() {
            return Err(Error::RootSpace(id));
        }
        let space = self.space(id)?;
        let pending = space.pending_counts();
        if !space.is_empty() || !pending.is_empty() {
            return Err(Error::SpaceNotEmpty {
                space: id,
                residents: space.len() + pending.to_add,
            });
        }
        let host = space.parent_sat();

        self.tree.write().remove(id)?;
        self.spaces[id.index()] = None;

        if let Some(host) = host {
            if let Err(err) = self.satellites.clear_hosts(host) {
                warn!(%id, %host, %err, "Host of destroyed space is gone");
            }
        }
        info!(%id, "Destroyed coordinate space");
        Ok(())
    }

    /// Destroy a satellite.
    ///
    /// A stored satellite is removed from its space and despawned at the next
    /// flush.
    pub fn destroy_satellite(&mut self, sat: SatelliteId) -> Result<()> {
        self.satellites.check_alive(sat)?;
        if let Some(space) = self.satellites.hosted(sat)? {
            return Err(Error::HostsSpace { sat, space });
        }
        if self.satellites.pending(sat)?.is_some() {
            return Err(Error::PendingPlacement(sat));
        }

        match self.satellites.residence(sat)? {
            Some(id) => {
                let space = self.space(id)?;
                space.remove(space.index_of(sat)?);
                self.satellites.doom(sat)
            }
            None => self.satellites.despawn(sat),
        }
    }

    /// Transformer from positions in `from` to positions in `to`.
    ///
    /// Reflects placements as they are now; rebuild after moving a space.
    pub fn transformer(&self, from: CoSpaceId, to: CoSpaceId) -> Result<CoordTransformer> {
        self.tree.read().transformer(from, to)
    }

    /// Move or rotate a space inside its parent.
    pub fn set_placement(&self, id: CoSpaceId, position: Vector3g, rotation: DQuat) -> Result<()> {
        self.tree.write().set_placement(id, position, rotation)
    }

    /// Space a satellite is stored in, as of the last flush.
    pub fn residence_of(&self, sat: SatelliteId) -> Result<Option<CoSpaceId>> {
        self.satellites.residence(sat)
    }

    /// Space and position of a stored satellite.
    pub fn locate(&self, sat: SatelliteId) -> Result<(CoSpaceId, Vector3g)> {
        let space = self.satellites.residence(sat)?.ok_or(Error::NotResident(sat))?;
        let (position, _) = self.space(space)?.state_of(sat)?;
        Ok((space, position))
    }

    /// Position of a stored satellite expressed in another space.
    pub fn position_in(&self, sat: SatelliteId, target: CoSpaceId) -> Result<Vector3g> {
        let (space, position) = self.locate(sat)?;
        Ok(self.transformer(space, target)?.transform_position(position))
    }

    /// Apply queued work in every space and update residences.
    ///
    /// Removals from all spaces are recorded before additions, so a satellite
    /// moving between spaces ends up resident in its new space. A satellite
    /// added directly to a space while stored in another is dropped from the
    /// other one.
    pub fn flush(&mut self) -> FlushSummary {
        let _span = trace_span!("flush").entered();

        let reports: Vec<(CoSpaceId, ExchangeReport)> = self
            .spaces
            .par_iter_mut()
            .filter_map(Option::as_mut)
            .map(|space| (space.id(), space.exchange()))
            .collect();

        let mut summary = FlushSummary {
            spaces: reports.len(),
            ..Default::default()
        };

        for (id, report) in &reports {
            for &sat in &report.removed {
                summary.removed += 1;
                if self.satellites.is_doomed(sat) {
                    if self.satellites.despawn(sat).is_ok() {
                        summary.destroyed += 1;
                    }
                } else if let Err(err) = self.satellites.clear_residence(sat, *id) {
                    warn!(space = %id, %sat, %err, "Removed satellite is not registered");
                }
            }
        }

        let mut stale: Vec<(CoSpaceId, SatelliteId)> = Vec::new();
        for (id, report) in reports {
            for sat in report.added {
                summary.added += 1;
                if let Ok(Some(previous)) = self.satellites.residence(sat) {
                    if previous != id {
                        stale.push((previous, sat));
                    }
                }
                let recorded = self
                    .satellites
                    .set_residence(sat, id)
                    .and_then(|()| self.satellites.clear_pending(sat));
                if let Err(err) = recorded {
                    warn!(space = %id, %sat, %err, "Added satellite is not registered");
                }
            }
            summary.applied += report.applied;
            summary
                .unresolved
                .extend(report.unresolved.into_iter().map(|command| (id, command)));
            summary
                .unsupported
                .extend(report.unsupported.into_iter().map(|command| (id, command)));
        }

        summary.removed += self.drop_stale_rows(&stale);

        debug!(
            spaces = summary.spaces,
            added = summary.added,
            removed = summary.removed,
            applied = summary.applied,
            destroyed = summary.destroyed,
            unresolved = summary.unresolved.len(),
            unsupported = summary.unsupported.len(),
            "Universe flushed"
        );
        summary
    }

    /// Remove rows left behind in a previous residence. Returns the number of
    /// rows removed.
    fn drop_stale_rows(&mut self, stale: &[(CoSpaceId, SatelliteId)]) -> usize {
        let mut touched = Vec::new();
        for &(previous, sat) in stale {
            let Some(space) = self.spaces.get(previous.index()).and_then(Option::as_ref) else {
                continue;
            };
            if let Ok(index) = space.index_of(sat) {
                debug!(space = %previous, %sat, "Dropping row of satellite added elsewhere");
                space.remove(index);
                touched.push(previous);
            }
        }
        touched.sort_unstable();
        touched.dedup();

        let mut removed = 0;
        for id in touched {
            if let Some(space) = self.spaces.get_mut(id.index()).and_then(Option::as_mut) {
                removed += space.exchange().removed.len();
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn universe() -> Universe {
        Universe::new(UniverseConfig::default()).unwrap()
    }

    /// Root with one satellite hosting a child space of precision 12.
    fn with_planet() -> (Universe, SatelliteId, CoSpaceId) {
        let mut universe = universe();
        let root = universe.root();
        let planet = universe.create_satellite();
        let at = Vector3g::new(1 << 30, 0, 0);
        universe.place(planet, root, at, DVec3::ZERO).unwrap();
        universe.flush();
        let space = universe
            .create_space(planet, at, DQuat::IDENTITY, 12)
            .unwrap();
        (universe, planet, space)
    }

    #[test]
    fn new_universe_has_root_space() {
        let universe = universe();
        let root = universe.space(universe.root()).unwrap();
        assert_eq!(root.parent_sat(), None);
        assert_eq!(root.pow2scale(), 10);
        assert_eq!(root.depth(), 0);
        assert!(Universe::new(UniverseConfig::new(99)).is_err());
    }

    #[test]
    fn place_is_deferred_until_flush() {
        let mut universe = universe();
        let root = universe.root();
        let sat = universe.create_satellite();
        universe.place(sat, root, Vector3g::new(5, 6, 7), DVec3::ZERO).unwrap();

        assert_eq!(universe.residence_of(sat).unwrap(), None);
        assert_eq!(universe.locate(sat).unwrap_err(), Error::NotResident(sat));
        assert_eq!(
            universe.place(sat, root, Vector3g::ZERO, DVec3::ZERO).unwrap_err(),
            Error::PendingPlacement(sat)
        );

        let summary = universe.flush();
        assert_eq!(summary.added, 1);
        assert_eq!(universe.locate(sat).unwrap(), (root, Vector3g::new(5, 6, 7)));
    }

    #[test]
    fn create_space_under_host_residence() {
        let (universe, planet, space) = with_planet();
        let root = universe.root();
        assert_eq!(universe.parent_of(space).unwrap(), Some(root));
        assert_eq!(universe.space(space).unwrap().parent_sat(), Some(planet));
        assert_eq!(universe.space(space).unwrap().depth(), 1);
        assert_eq!(universe.satellites().hosted(planet).unwrap(), Some(space));
    }

    #[test]
    fn one_space_per_host() {
        let (mut universe, planet, space) = with_planet();
        assert_eq!(
            universe
                .create_space(planet, Vector3g::ZERO, DQuat::IDENTITY, 12)
                .unwrap_err(),
            Error::HostsSpace { sat: planet, space }
        );
    }

    #[test]
    fn create_space_requires_resident_host() {
        let mut universe = universe();
        let host = universe.create_satellite();
        assert_eq!(
            universe
                .create_space(host, Vector3g::ZERO, DQuat::IDENTITY, 12)
                .unwrap_err(),
            Error::NotResident(host)
        );
    }

    #[test]
    fn max_depth_is_enforced() {
        let mut universe = Universe::new(UniverseConfig::default().with_max_depth(1)).unwrap();
        let root = universe.root();
        let a = universe.create_satellite();
        universe.place(a, root, Vector3g::ZERO, DVec3::ZERO).unwrap();
        universe.flush();
        let space_a = universe.create_space(a, Vector3g::ZERO, DQuat::IDENTITY, 11).unwrap();

        let b = universe.create_satellite();
        universe.place(b, space_a, Vector3g::ZERO, DVec3::ZERO).unwrap();
        universe.flush();
        assert!(matches!(
            universe.create_space(b, Vector3g::ZERO, DQuat::IDENTITY, 12),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn transfer_keeps_physical_position() {
        let (mut universe, _, space) = with_planet();
        let root = universe.root();
        let ship = universe.create_satellite();
        // 1 m away from the planet along +y, in root units
        universe
            .place(ship, root, Vector3g::new(1 << 30, 1 << 10, 0), DVec3::new(0.0, 3.0, 0.0))
            .unwrap();
        universe.flush();

        universe.transfer(ship, space).unwrap();
        let summary = universe.flush();
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.added, 1);

        assert_eq!(universe.residence_of(ship).unwrap(), Some(space));
        assert_eq!(universe.locate(ship).unwrap(), (space, Vector3g::new(0, 1 << 12, 0)));
        assert!(!universe.space(root).unwrap().contains(ship));
        assert_eq!(
            universe.position_in(ship, root).unwrap(),
            Vector3g::new(1 << 30, 1 << 10, 0)
        );
    }

    #[test]
    fn transfer_rotates_velocity() {
        let mut universe = universe();
        let root = universe.root();
        let host = universe.create_satellite();
        universe.place(host, root, Vector3g::ZERO, DVec3::ZERO).unwrap();
        universe.flush();
        let spun = universe
            .create_space(host, Vector3g::ZERO, DQuat::from_rotation_z(FRAC_PI_2), 10)
            .unwrap();

        let ship = universe.create_satellite();
        universe.place(ship, root, Vector3g::new(100, 0, 0), DVec3::X).unwrap();
        universe.flush();
        universe.transfer(ship, spun).unwrap();
        universe.flush();

        let (position, velocity) = universe.space(spun).unwrap().state_of(ship).unwrap();
        assert_eq!(position, Vector3g::new(0, -100, 0));
        assert_relative_eq!(velocity.y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(velocity.x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn hosts_stay_in_their_space() {
        let (mut universe, planet, space) = with_planet();
        let root = universe.root();
        let other_host = universe.create_satellite();
        universe.place(other_host, root, Vector3g::new(-(1 << 30), 0, 0), DVec3::ZERO).unwrap();
        universe.flush();
        let other = universe
            .create_space(other_host, Vector3g::new(-(1 << 30), 0, 0), DQuat::IDENTITY, 11)
            .unwrap();

        let hosts = Error::HostsSpace { sat: planet, space };
        assert_eq!(universe.transfer(planet, other).unwrap_err(), hosts);
        assert_eq!(
            universe.place(planet, other, Vector3g::ZERO, DVec3::ZERO).unwrap_err(),
            hosts
        );
        assert_eq!(universe.satellites().pending(planet).unwrap(), None);

        let summary = universe.flush();
        assert_eq!(summary.removed, 0);
        assert_eq!(universe.residence_of(planet).unwrap(), Some(root));
        assert_eq!(universe.parent_of(space).unwrap(), Some(root));

        // Moving within its own space is still fine
        universe.place(planet, root, Vector3g::new(1 << 31, 0, 0), DVec3::ZERO).unwrap();
        universe.flush();
        assert_eq!(universe.locate(planet).unwrap(), (root, Vector3g::new(1 << 31, 0, 0)));
        assert_eq!(universe.transfer(planet, root), Ok(()));
    }

    #[test]
    fn transfer_requires_residence() {
        let (mut universe, _, space) = with_planet();
        let ship = universe.create_satellite();
        assert_eq!(universe.transfer(ship, space).unwrap_err(), Error::NotResident(ship));
    }

    #[test]
    fn destroy_space_rules() {
        let (mut universe, planet, space) = with_planet();
        let root = universe.root();
        assert_eq!(universe.destroy_space(root).unwrap_err(), Error::RootSpace(root));

        let ship = universe.create_satellite();
        universe.place(ship, space, Vector3g::ZERO, DVec3::ZERO).unwrap();
        assert!(matches!(
            universe.destroy_space(space),
            Err(Error::SpaceNotEmpty { residents: 1, .. })
        ));
        universe.flush();
        universe.transfer(ship, root).unwrap();
        universe.flush();

        universe.destroy_space(space).unwrap();
        assert_eq!(universe.space(space).unwrap_err(), Error::UnknownSpace(space));
        assert_eq!(universe.satellites().hosted(planet).unwrap(), None);
    }

    #[test]
    fn destroy_satellite_after_flush() {
        let (mut universe, planet, _) = with_planet();
        let root = universe.root();
        assert!(matches!(
            universe.destroy_satellite(planet),
            Err(Error::HostsSpace { .. })
        ));

        let ship = universe.create_satellite();
        universe.place(ship, root, Vector3g::ONE, DVec3::ZERO).unwrap();
        universe.flush();

        universe.destroy_satellite(ship).unwrap();
        assert_eq!(universe.place(ship, root, Vector3g::ZERO, DVec3::ZERO).unwrap_err(), Error::UnknownSatellite(ship));

        let summary = universe.flush();
        assert_eq!(summary.destroyed, 1);
        assert!(!universe.space(root).unwrap().contains(ship));
        assert!(!universe.satellites().is_alive(ship));

        // Never placed: gone immediately
        let loose = universe.create_satellite();
        universe.destroy_satellite(loose).unwrap();
        assert!(!universe.satellites().is_alive(loose));
    }

    #[test]
    fn unresolved_commands_are_reported() {
        let mut universe = universe();
        let root = universe.root();
        let ghost = SatelliteId(12345);
        universe
            .space(root)
            .unwrap()
            .command(Command::set_position(ghost, Vector3g::ZERO));
        let summary = universe.flush();
        assert_eq!(summary.unresolved, vec![(root, Command::set_position(ghost, Vector3g::ZERO))]);
    }

    #[test]
    fn untracked_velocity_commands_are_not_unresolved() {
        let mut universe = Universe::new(UniverseConfig::default().with_velocity(false)).unwrap();
        let root = universe.root();
        let sat = universe.create_satellite();
        universe.place(sat, root, Vector3g::ZERO, DVec3::ZERO).unwrap();
        universe.flush();

        let command = Command::offset_velocity(sat, DVec3::Y);
        universe.space(root).unwrap().command(command);
        let summary = universe.flush();
        assert!(summary.unresolved.is_empty());
        assert_eq!(summary.unsupported, vec![(root, command)]);
    }

    #[test]
    fn direct_add_elsewhere_leaves_one_row() {
        let (mut universe, planet, space) = with_planet();
        let root = universe.root();
        let ship = universe.create_satellite();
        universe.place(ship, root, Vector3g::new(9, 9, 9), DVec3::ZERO).unwrap();
        universe.flush();

        universe
            .space(space)
            .unwrap()
            .add(ship, Vector3g::new(4, 4, 4), DVec3::ZERO);
        let summary = universe.flush();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.removed, 1);

        assert_eq!(universe.residence_of(ship).unwrap(), Some(space));
        assert!(!universe.space(root).unwrap().contains(ship));
        assert_eq!(universe.locate(ship).unwrap(), (space, Vector3g::new(4, 4, 4)));
        assert_eq!(universe.satellites().residents_of(root), vec![planet]);
        assert_eq!(universe.satellites().residents_of(space), vec![ship]);
    }

    #[test]
    fn moving_space_changes_transformer() {
        let (universe, _, space) = with_planet();
        let root = universe.root();
        let before = universe.transformer(root, space).unwrap();
        universe
            .set_placement(space, Vector3g::new(0, 1 << 30, 0), DQuat::IDENTITY)
            .unwrap();
        let after = universe.transformer(root, space).unwrap();

        assert_ne!(before, after);
        assert_eq!(after.transform_position(Vector3g::new(0, 1 << 30, 0)), Vector3g::ZERO);
    }
}
