//! Coordinate space placement and transforms.
//!
//! Every coordinate space is placed inside its parent by a
//! [`CoSpaceTransform`]: an integer origin in parent units, a rotation, and a
//! power-of-two precision. A [`CoordTransformer`] maps positions between two
//! spaces with integer arithmetic only, and transformers compose without
//! rounding through the intermediate spaces.
//!
//! # Usage
//!
//! ```
//! use spaceframe_coords::{coord_composite, coord_parent_to_child, CoSpaceTransform};
//! use spaceframe_core::Vector3g;
//!
//! let sun = CoSpaceTransform::root(10);
//! let planet = CoSpaceTransform::new(12).with_position(Vector3g::new(1 << 20, 0, 0));
//! let moon = CoSpaceTransform::new(15).with_position(Vector3g::new(0, 1 << 24, 0));
//!
//! let sun_to_planet = coord_parent_to_child(&sun, &planet);
//! let planet_to_moon = coord_parent_to_child(&planet, &moon);
//! let sun_to_moon = coord_composite(&planet_to_moon, &sun_to_planet);
//!
//! assert_eq!(sun_to_planet.transform_position(planet.position), Vector3g::ZERO);
//! assert_eq!(
//!     sun_to_moon.transform_position(Vector3g::new(1 << 20, 1 << 22, 0)),
//!     Vector3g::ZERO
//! );
//! ```

pub mod transform;
pub mod transformer;
pub mod tree;

pub use transform::CoSpaceTransform;
pub use transformer::{
    coord_child_to_parent, coord_composite, coord_parent_to_child, CoordTransformer,
};
pub use tree::CoSpaceTree;
