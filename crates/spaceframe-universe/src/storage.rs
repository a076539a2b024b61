//! Columnar Cartesian storage for the satellites of one coordinate space.

use glam::DVec3;
use hashbrown::HashMap;
use spaceframe_core::{SatelliteId, Vector3g};

use crate::commands::{Command, CommandOp, CommandOutcome, CommandValue};
use crate::components::Column;

/// Satellites with their positions and (optionally) velocities, one row each.
///
/// Rows are packed: removing a row moves the last row into its place.
#[derive(Clone, Debug, Default)]
pub struct CartesianStorage {
    satellites: Vec<SatelliteId>,
    positions: Vec<Vector3g>,
    velocities: Vec<DVec3>,
    rows: HashMap<SatelliteId, usize>,
    track_velocity: bool,
}

impl CartesianStorage {
    /// Create empty storage with room for `capacity` satellites.
    pub fn with_capacity(capacity: usize, track_velocity: bool) -> Self {
        Self {
            satellites: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            velocities: if track_velocity {
                Vec::with_capacity(capacity)
            } else {
                Vec::new()
            },
            rows: HashMap::with_capacity(capacity),
            track_velocity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }

    /// Returns `true` if velocities are stored.
    #[inline]
    pub fn tracks_velocity(&self) -> bool {
        self.track_velocity
    }

    /// Row of a satellite.
    #[inline]
    pub fn row_of(&self, sat: SatelliteId) -> Option<usize> {
        self.rows.get(&sat).copied()
    }

    /// Insert a satellite, overwriting its row if already present.
    ///
    /// Returns the row the satellite now occupies.
    pub fn insert(&mut self, sat: SatelliteId, position: Vector3g, velocity: DVec3) -> usize {
        if let Some(row) = self.row_of(sat) {
            self.positions[row] = position;
            if self.track_velocity {
                self.velocities[row] = velocity;
            }
            return row;
        }

        let row = self.satellites.len();
        self.satellites.push(sat);
        self.positions.push(position);
        if self.track_velocity {
            self.velocities.push(velocity);
        }
        self.rows.insert(sat, row);
        row
    }

    /// Remove a row by swapping the last row into it.
    ///
    /// # Panics
    /// If `row` is out of range.
    pub fn swap_remove(&mut self, row: usize) -> SatelliteId {
        let len = self.satellites.len();
        assert!(row < len, "remove index {row} out of range (len {len})");

        let removed = self.satellites.swap_remove(row);
        self.positions.swap_remove(row);
        if self.track_velocity {
            self.velocities.swap_remove(row);
        }
        self.rows.remove(&removed);

        if let Some(&moved) = self.satellites.get(row) {
            self.rows.insert(moved, row);
        }
        removed
    }

    /// Apply a command to the row of its satellite.
    pub fn apply(&mut self, command: &Command) -> CommandOutcome {
        let Some(row) = self.row_of(command.sat) else {
            return CommandOutcome::NotStored;
        };

        match (command.op, command.value) {
            (CommandOp::Set, CommandValue::Position(p)) => self.positions[row] = p,
            (CommandOp::Offset, CommandValue::Position(p)) => self.positions[row] += p,
            (_, CommandValue::Velocity(_)) if !self.track_velocity => {
                return CommandOutcome::Unsupported
            }
            (CommandOp::Set, CommandValue::Velocity(v)) => self.velocities[row] = v,
            (CommandOp::Offset, CommandValue::Velocity(v)) => self.velocities[row] += v,
        }
        CommandOutcome::Applied
    }

    #[inline]
    pub fn satellites(&self) -> &[SatelliteId] {
        &self.satellites
    }

    #[inline]
    pub fn positions(&self) -> &[Vector3g] {
        &self.positions
    }

    /// Velocities, empty when not tracked.
    #[inline]
    pub fn velocities(&self) -> &[DVec3] {
        &self.velocities
    }

    /// Position of the satellite in `row`.
    #[inline]
    pub fn position(&self, row: usize) -> Vector3g {
        self.positions[row]
    }

    /// Velocity of the satellite in `row`, zero when not tracked.
    #[inline]
    pub fn velocity(&self, row: usize) -> DVec3 {
        self.velocities.get(row).copied().unwrap_or(DVec3::ZERO)
    }

    /// Raw bytes of a column.
    pub fn column_bytes(&self, column: Column) -> &[u8] {
        match column {
            Column::Satellites => bytemuck::cast_slice(&self.satellites),
            Column::Positions => bytemuck::cast_slice(&self.positions),
            Column::Velocities => bytemuck::cast_slice(&self.velocities),
        }
    }
}
