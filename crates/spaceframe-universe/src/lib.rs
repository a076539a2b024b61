//! Coordinate spaces and the satellites stored in them.
//!
//! A [`CoordinateSpace`] keeps its satellites in packed columns and accepts
//! additions, removals and [`Command`]s from any thread through lock-free
//! queues. The queues are applied in one exclusive [`CoordinateSpace::exchange`].
//! A [`Universe`] ties the spaces to a [`CoSpaceTree`](spaceframe_coords::CoSpaceTree)
//! of placements and tracks which space each satellite lives in.

pub mod commands;
pub mod components;
pub mod config;
pub mod satellites;
pub mod space;
pub mod storage;
pub mod universe;

pub use commands::{Command, CommandOp, CommandOutcome, CommandValue};
pub use components::{CComp, ComponentKind, ComponentKindSet, RawView, StridedView};
pub use config::UniverseConfig;
pub use satellites::SatelliteRegistry;
pub use space::{CoordinateSpace, ExchangeReport, PendingCounts};
pub use universe::{FlushSummary, Universe};
