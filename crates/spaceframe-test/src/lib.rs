//! Test fixtures for spaceframe.
//!
//! Provides a sun/planet/moon hierarchy at roughly real-world scale, both as
//! bare placements and as a populated [`Universe`](spaceframe_universe::Universe).

pub mod fixtures;

pub use fixtures::{change_precision, sci64, SolarSystem, SolarTransforms};

use spaceframe_core::Vector3g;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("universe error: {0}")]
    Universe(#[from] spaceframe_core::Error),
    #[error("position mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: Vector3g, actual: Vector3g },
}

pub type Result<T> = std::result::Result<T, TestError>;

/// Fail with [`TestError::Mismatch`] unless the positions are equal.
pub fn expect_position(expected: Vector3g, actual: Vector3g) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(TestError::Mismatch { expected, actual })
    }
}
