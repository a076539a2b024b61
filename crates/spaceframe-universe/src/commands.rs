//! Deferred edits to satellites already stored in a coordinate space.

use glam::DVec3;
use spaceframe_core::{SatelliteId, Vector3g};

/// How a command combines with the stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOp {
    /// Replace the stored value
    Set,
    /// Add to the stored value
    Offset,
}

/// Which value a command edits, with its operand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CommandValue {
    /// Position in space units
    Position(Vector3g),
    /// Velocity in meters per second
    Velocity(DVec3),
}

/// Result of applying a command to a space's storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    /// The satellite is not stored in the space
    NotStored,
    /// The space does not store the value the command edits
    Unsupported,
}

/// An edit queued against one satellite, applied at the next flush.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Command {
    pub sat: SatelliteId,
    pub op: CommandOp,
    pub value: CommandValue,
}

impl Command {
    /// Move a satellite to an absolute position.
    pub fn set_position(sat: SatelliteId, position: Vector3g) -> Self {
        Self {
            sat,
            op: CommandOp::Set,
            value: CommandValue::Position(position),
        }
    }

    /// Move a satellite by a delta.
    pub fn offset_position(sat: SatelliteId, delta: Vector3g) -> Self {
        Self {
            sat,
            op: CommandOp::Offset,
            value: CommandValue::Position(delta),
        }
    }

    pub fn set_velocity(sat: SatelliteId, velocity: DVec3) -> Self {
        Self {
            sat,
            op: CommandOp::Set,
            value: CommandValue::Velocity(velocity),
        }
    }

    pub fn offset_velocity(sat: SatelliteId, delta: DVec3) -> Self {
        Self {
            sat,
            op: CommandOp::Offset,
            value: CommandValue::Velocity(delta),
        }
    }

    /// Returns `true` if the command edits velocity.
    #[inline]
    pub fn is_velocity(&self) -> bool {
        matches!(self.value, CommandValue::Velocity(_))
    }
}
