//! Satellite registry.
//!
//! Uses hecs as the backing store: one entity per satellite, with components
//! recording where it lives and which space it hosts.

use hecs::{Entity, World};
use spaceframe_core::{CoSpaceId, Error, Result, SatelliteId};

/// Space the satellite is stored in, as of the last flush.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Residence(pub CoSpaceId);

/// Space the satellite will be stored in after the next flush.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pending(pub CoSpaceId);

/// Space hosted by the satellite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hosts(pub CoSpaceId);

/// Satellite scheduled for destruction at the next flush.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Doomed;

/// Registry of every satellite in a universe.
#[derive(Default)]
pub struct SatelliteRegistry {
    world: World,
}

impl std::fmt::Debug for SatelliteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SatelliteRegistry")
            .field("len", &self.world.len())
            .finish()
    }
}

impl SatelliteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new satellite with no residence.
    pub fn create(&mut self) -> SatelliteId {
        SatelliteId::from_entity(self.world.spawn(()))
    }

    /// Number of registered satellites.
    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    fn entity(&self, sat: SatelliteId) -> Result<Entity> {
        sat.entity()
            .filter(|&entity| self.world.contains(entity))
            .ok_or(Error::UnknownSatellite(sat))
    }

    /// Returns `true` if the satellite is registered and not scheduled for
    /// destruction.
    pub fn is_alive(&self, sat: SatelliteId) -> bool {
        self.entity(sat)
            .is_ok_and(|entity| !self.world.satisfies::<&Doomed>(entity).unwrap_or(false))
    }

    /// Fail unless the satellite is registered and alive.
    pub fn check_alive(&self, sat: SatelliteId) -> Result<()> {
        if self.is_alive(sat) {
            Ok(())
        } else {
            Err(Error::UnknownSatellite(sat))
        }
    }

    fn get<C: hecs::Component + Copy>(&self, sat: SatelliteId) -> Result<Option<C>> {
        let entity = self.entity(sat)?;
        Ok(self.world.get::<&C>(entity).ok().map(|c| *c))
    }

    fn set<C: hecs::Component>(&mut self, sat: SatelliteId, component: C) -> Result<()> {
        let entity = self.entity(sat)?;
        self.world
            .insert_one(entity, component)
            .map_err(|_| Error::UnknownSatellite(sat))
    }

    fn clear<C: hecs::Component>(&mut self, sat: SatelliteId) -> Result<()> {
        let entity = self.entity(sat)?;
        // Missing component is fine
        let _ = self.world.remove_one::<C>(entity);
        Ok(())
    }

    pub fn residence(&self, sat: SatelliteId) -> Result<Option<CoSpaceId>> {
        Ok(self.get::<Residence>(sat)?.map(|r| r.0))
    }

    pub fn set_residence(&mut self, sat: SatelliteId, space: CoSpaceId) -> Result<()> {
        self.set(sat, Residence(space))
    }

    /// Clear the residence if it still names `space`.
    pub fn clear_residence(&mut self, sat: SatelliteId, space: CoSpaceId) -> Result<()> {
        if self.residence(sat)? == Some(space) {
            self.clear::<Residence>(sat)?;
        }
        Ok(())
    }

    pub fn pending(&self, sat: SatelliteId) -> Result<Option<CoSpaceId>> {
        Ok(self.get::<Pending>(sat)?.map(|p| p.0))
    }

    pub fn set_pending(&mut self, sat: SatelliteId, space: CoSpaceId) -> Result<()> {
        self.set(sat, Pending(space))
    }

    pub fn clear_pending(&mut self, sat: SatelliteId) -> Result<()> {
        self.clear::<Pending>(sat)
    }

    pub fn hosted(&self, sat: SatelliteId) -> Result<Option<CoSpaceId>> {
        Ok(self.get::<Hosts>(sat)?.map(|h| h.0))
    }

    pub fn set_hosts(&mut self, sat: SatelliteId, space: CoSpaceId) -> Result<()> {
        self.set(sat, Hosts(space))
    }

    pub fn clear_hosts(&mut self, sat: SatelliteId) -> Result<()> {
        self.clear::<Hosts>(sat)
    }

    /// Mark a satellite for destruction at the next flush.
    pub fn doom(&mut self, sat: SatelliteId) -> Result<()> {
        self.set(sat, Doomed)
    }

    pub fn is_doomed(&self, sat: SatelliteId) -> bool {
        self.get::<Doomed>(sat).is_ok_and(|d| d.is_some())
    }

    /// Remove a satellite from the registry.
    pub fn despawn(&mut self, sat: SatelliteId) -> Result<()> {
        let entity = self.entity(sat)?;
        self.world
            .despawn(entity)
            .map_err(|_| Error::UnknownSatellite(sat))
    }

    /// Satellites stored in `space`.
    pub fn residents_of(&self, space: CoSpaceId) -> Vec<SatelliteId> {
        self.world
            .query::<&Residence>()
            .iter()
            .filter(|(_, residence)| residence.0 == space)
            .map(|(entity, _)| SatelliteId::from_entity(entity))
            .collect()
    }
}
