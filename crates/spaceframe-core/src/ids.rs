//! Stable handles for satellites and coordinate spaces.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Stable identity of a satellite.
///
/// A satellite is any placed object. The handle stays the same while the
/// satellite moves between coordinate spaces or storage slots. It wraps the
/// 64-bit form of the registry entity so it can live in plain data columns.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct SatelliteId(pub u64);

impl SatelliteId {
    /// Handle for a registry entity.
    #[inline]
    pub fn from_entity(entity: hecs::Entity) -> Self {
        Self(entity.to_bits().get())
    }

    /// Registry entity for this handle, if the bits form a valid entity.
    #[inline]
    pub fn entity(self) -> Option<hecs::Entity> {
        hecs::Entity::from_bits(self.0)
    }
}

impl fmt::Display for SatelliteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sat#{:x}", self.0)
    }
}

/// Handle of a coordinate space: an index into the space arena.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct CoSpaceId(pub u32);

impl CoSpaceId {
    /// Arena slot of this space.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CoSpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cospace#{}", self.0)
    }
}
