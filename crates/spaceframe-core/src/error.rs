//! Error types shared across spaceframe.

use thiserror::Error;

use crate::ids::{CoSpaceId, SatelliteId};

/// Recoverable errors reported by coordinate spaces and the universe.
///
/// Contract violations such as a negative exponent passed to
/// [`int_2pow`](crate::math::int_2pow) or an out-of-range storage index panic
/// instead of appearing here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Satellite is not resident in the addressed coordinate space
    #[error("satellite {sat} is not resident in {space}")]
    SatelliteNotFound { sat: SatelliteId, space: CoSpaceId },

    /// Satellite handle is not registered
    #[error("unknown satellite {0}")]
    UnknownSatellite(SatelliteId),

    /// Coordinate space handle is not registered
    #[error("unknown coordinate space {0}")]
    UnknownSpace(CoSpaceId),

    /// Satellite exists but has not been placed in any space yet
    #[error("satellite {0} is not placed in any coordinate space")]
    NotResident(SatelliteId),

    /// Satellite already has a move waiting for the next flush
    #[error("satellite {0} has a placement waiting for the next flush")]
    PendingPlacement(SatelliteId),

    /// Space still holds satellites or pending work
    #[error("{space} still holds {residents} satellites")]
    SpaceNotEmpty { space: CoSpaceId, residents: usize },

    /// Space still has child spaces attached
    #[error("{0} still has child coordinate spaces")]
    SpaceHasChildren(CoSpaceId),

    /// Satellite hosts a coordinate space and cannot be destroyed first
    #[error("satellite {sat} hosts {space}")]
    HostsSpace { sat: SatelliteId, space: CoSpaceId },

    /// Operation is not allowed on the universal root
    #[error("operation not allowed on the root coordinate space {0}")]
    RootSpace(CoSpaceId),

    /// Configuration or placement value out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
