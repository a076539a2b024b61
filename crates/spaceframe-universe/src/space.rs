//! A coordinate space: satellite storage plus deferred edit queues.
//!
//! Any thread holding `&CoordinateSpace` may queue additions, removals and
//! commands. Nothing is visible in storage until the owner calls
//! [`CoordinateSpace::exchange`] with exclusive access, which applies the
//! queues in a fixed order: removals (highest index first), then additions,
//! then commands.

use crossbeam::queue::SegQueue;
use glam::DVec3;
use rayon::prelude::*;
use spaceframe_coords::CoordTransformer;
use spaceframe_core::{
    int_2pow, is_power_of_2, CoSpaceId, Error, Precision, Result, SatelliteId, Vector3g,
};
use tracing::{debug, trace_span, warn};

use crate::commands::{Command, CommandOutcome};
use crate::components::{CComp, ComponentKind, ComponentKindSet, ComponentTable, RawView, StridedView};
use crate::storage::CartesianStorage;

/// Satellite waiting to be added at the next exchange.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingAdd {
    pub sat: SatelliteId,
    pub position: Vector3g,
    pub velocity: DVec3,
}

/// Outcome of one [`CoordinateSpace::exchange`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExchangeReport {
    /// Satellites removed, in the order they were removed
    pub removed: Vec<SatelliteId>,
    /// Satellites added or overwritten, in queue order
    pub added: Vec<SatelliteId>,
    /// Number of commands applied
    pub applied: usize,
    /// Commands that addressed a satellite not stored here
    pub unresolved: Vec<Command>,
    /// Commands editing a value this space does not store
    pub unsupported: Vec<Command>,
}

impl ExchangeReport {
    /// Returns `true` if the exchange changed nothing.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.added.is_empty()
            && self.applied == 0
            && self.unresolved.is_empty()
            && self.unsupported.is_empty()
    }
}

/// Queue lengths, as seen at the moment of the call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingCounts {
    pub to_add: usize,
    pub to_remove: usize,
    pub commands: usize,
}

impl PendingCounts {
    pub fn is_empty(&self) -> bool {
        self.to_add == 0 && self.to_remove == 0 && self.commands == 0
    }
}

/// Satellites stored in one frame of reference.
#[derive(Debug)]
pub struct CoordinateSpace {
    id: CoSpaceId,
    parent_sat: Option<SatelliteId>,
    depth: u32,
    pow2scale: Precision,
    table: ComponentTable,
    storage: CartesianStorage,
    to_add: SegQueue<PendingAdd>,
    to_remove: SegQueue<usize>,
    commands: SegQueue<Command>,
}

impl CoordinateSpace {
    /// Create an empty space.
    ///
    /// `parent_sat` is the satellite hosting this space, `None` only for the
    /// universal root. `pow2scale` is the precision: 2^pow2scale units per
    /// meter.
    pub fn new(
        id: CoSpaceId,
        parent_sat: Option<SatelliteId>,
        depth: u32,
        pow2scale: Precision,
        kinds: ComponentKindSet,
        capacity: usize,
    ) -> Self {
        let table = ComponentTable::cartesian(kinds);
        let storage = CartesianStorage::with_capacity(capacity, table.kinds().has_velocity());
        Self {
            id,
            parent_sat,
            depth,
            pow2scale,
            table,
            storage,
            to_add: SegQueue::new(),
            to_remove: SegQueue::new(),
            commands: SegQueue::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> CoSpaceId {
        self.id
    }

    /// Satellite hosting this space.
    #[inline]
    pub fn parent_sat(&self) -> Option<SatelliteId> {
        self.parent_sat
    }

    /// Distance from the universal root.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Precision of this space: 2^pow2scale units per meter.
    #[inline]
    pub fn pow2scale(&self) -> Precision {
        self.pow2scale
    }

    /// Integer units per meter, `None` when the space is coarser than a meter.
    pub fn units_per_meter(&self) -> Option<i64> {
        let exponent = i32::from(self.pow2scale);
        (0..63).contains(&exponent).then(|| {
            let units = int_2pow::<i64>(exponent);
            debug_assert!(is_power_of_2(units));
            units
        })
    }

    /// Supported component kinds.
    #[inline]
    pub fn kinds(&self) -> ComponentKindSet {
        self.table.kinds()
    }

    /// Number of stored satellites. Queued additions are not counted.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Queue a satellite for addition.
    ///
    /// Adding a satellite that is already stored or queued overwrites its
    /// position and velocity; the last queued addition wins.
    pub fn add(&self, sat: SatelliteId, position: Vector3g, velocity: DVec3) {
        self.to_add.push(PendingAdd {
            sat,
            position,
            velocity,
        });
    }

    /// Queue removal of the satellite stored at `index`.
    ///
    /// Indices refer to storage as it is now. Queuing the same index twice
    /// removes it once. An index out of range panics at the next exchange.
    pub fn remove(&self, index: usize) {
        self.to_remove.push(index);
    }

    /// Queue an edit of a stored satellite.
    pub fn command(&self, command: Command) {
        self.commands.push(command);
    }

    /// Current queue lengths.
    pub fn pending_counts(&self) -> PendingCounts {
        PendingCounts {
            to_add: self.to_add.len(),
            to_remove: self.to_remove.len(),
            commands: self.commands.len(),
        }
    }

    /// Storage index of a satellite.
    pub fn index_of(&self, sat: SatelliteId) -> Result<usize> {
        self.storage
            .row_of(sat)
            .ok_or(Error::SatelliteNotFound { sat, space: self.id })
    }

    /// Returns `true` if the satellite is stored here.
    #[inline]
    pub fn contains(&self, sat: SatelliteId) -> bool {
        self.storage.row_of(sat).is_some()
    }

    /// Stored position and velocity of a satellite.
    pub fn state_of(&self, sat: SatelliteId) -> Result<(Vector3g, DVec3)> {
        let row = self.index_of(sat)?;
        Ok((self.storage.position(row), self.storage.velocity(row)))
    }

    /// Apply all queued work and clear the queues.
    ///
    /// # Panics
    /// If a queued removal index is out of range.
    pub fn exchange(&mut self) -> ExchangeReport {
        let _span = trace_span!("exchange", space = %self.id).entered();
        let mut report = ExchangeReport::default();

        let mut removals = Vec::with_capacity(self.to_remove.len());
        while let Some(index) = self.to_remove.pop() {
            removals.push(index);
        }
        removals.sort_unstable_by(|a, b| b.cmp(a));
        removals.dedup();
        for index in removals {
            report.removed.push(self.storage.swap_remove(index));
        }

        while let Some(add) = self.to_add.pop() {
            self.storage.insert(add.sat, add.position, add.velocity);
            report.added.push(add.sat);
        }

        while let Some(command) = self.commands.pop() {
            match self.storage.apply(&command) {
                CommandOutcome::Applied => report.applied += 1,
                CommandOutcome::NotStored => {
                    warn!(space = %self.id, sat = %command.sat, op = ?command.op, "Dropped command for satellite not stored here");
                    report.unresolved.push(command);
                }
                CommandOutcome::Unsupported => {
                    warn!(space = %self.id, sat = %command.sat, op = ?command.op, "Dropped velocity command, space does not track velocity");
                    report.unsupported.push(command);
                }
            }
        }

        if !report.is_empty() {
            debug!(
                space = %self.id,
                removed = report.removed.len(),
                added = report.added.len(),
                applied = report.applied,
                unresolved = report.unresolved.len(),
                unsupported = report.unsupported.len(),
                len = self.storage.len(),
                "Exchanged coordinate space"
            );
        }
        report
    }

    /// View of one component, `None` if the space does not support the kind.
    pub fn raw_view(&self, kind: ComponentKind) -> Option<RawView<'_>> {
        let slot = self.table.slot(kind)?;
        Some(RawView::new(
            self.storage.column_bytes(slot.column),
            slot,
            self.storage.len(),
        ))
    }

    /// Typed view of one component, `None` if the space does not support it.
    ///
    /// ```
    /// use glam::DVec3;
    /// use spaceframe_core::{CoSpaceId, SatelliteId, Vector3g};
    /// use spaceframe_universe::components::{CCompY, ComponentKindSet};
    /// use spaceframe_universe::CoordinateSpace;
    ///
    /// let mut space = CoordinateSpace::new(CoSpaceId(0), None, 0, 10, ComponentKindSet::all(), 0);
    /// space.add(SatelliteId(1), Vector3g::new(1, 2, 3), DVec3::ZERO);
    /// space.exchange();
    ///
    /// let y = space.ccomp_view::<CCompY>().unwrap();
    /// assert_eq!(y.get(0), 2);
    /// ```
    pub fn ccomp_view<C: CComp>(&self) -> Option<StridedView<'_, C::Data>> {
        self.raw_view(C::KIND)?.typed::<C::Data>()
    }

    /// Stored satellites, in storage order.
    #[inline]
    pub fn satellites(&self) -> &[SatelliteId] {
        self.storage.satellites()
    }

    /// Stored positions, in storage order.
    #[inline]
    pub fn positions(&self) -> &[Vector3g] {
        self.storage.positions()
    }

    /// Every stored position mapped through `transformer`, in storage order.
    pub fn positions_in(&self, transformer: &CoordTransformer) -> Vec<Vector3g> {
        self.storage
            .positions()
            .par_iter()
            .map(|&p| transformer.transform_position(p))
            .collect()
    }
}
