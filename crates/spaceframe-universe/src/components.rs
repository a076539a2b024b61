//! Component kinds and strided views over coordinate space columns.
//!
//! A coordinate space stores its satellites in a few plain data columns.
//! Readers ask for a single component (say, the X coordinate) and receive a
//! [`StridedView`]: the column's bytes plus the offset and stride of that
//! component inside each element.

use std::marker::PhantomData;
use std::mem::size_of;

use bitflags::bitflags;
use bytemuck::Pod;
use glam::DVec3;
use spaceframe_core::{SatelliteId, SpaceInt, Vector3g};

/// Per-satellite data a coordinate space may provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Satellite,
    PosX,
    PosY,
    PosZ,
    VelX,
    VelY,
    VelZ,
}

impl ComponentKind {
    /// Number of kinds.
    pub const COUNT: usize = 7;

    /// Every kind, in slot order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Satellite,
        Self::PosX,
        Self::PosY,
        Self::PosZ,
        Self::VelX,
        Self::VelY,
        Self::VelZ,
    ];

    /// Slot of this kind in a [`ComponentTable`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Flag for this kind.
    pub const fn flag(self) -> ComponentKindSet {
        match self {
            Self::Satellite => ComponentKindSet::SATELLITE,
            Self::PosX => ComponentKindSet::POS_X,
            Self::PosY => ComponentKindSet::POS_Y,
            Self::PosZ => ComponentKindSet::POS_Z,
            Self::VelX => ComponentKindSet::VEL_X,
            Self::VelY => ComponentKindSet::VEL_Y,
            Self::VelZ => ComponentKindSet::VEL_Z,
        }
    }
}

bitflags! {
    /// Set of component kinds supported by a coordinate space.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComponentKindSet: u8 {
        const SATELLITE = 1 << 0;
        const POS_X     = 1 << 1;
        const POS_Y     = 1 << 2;
        const POS_Z     = 1 << 3;
        const VEL_X     = 1 << 4;
        const VEL_Y     = 1 << 5;
        const VEL_Z     = 1 << 6;

        /// Satellite handle and position.
        const POSITION = Self::SATELLITE.bits() | Self::POS_X.bits() | Self::POS_Y.bits() | Self::POS_Z.bits();
        /// Linear velocity.
        const VELOCITY = Self::VEL_X.bits() | Self::VEL_Y.bits() | Self::VEL_Z.bits();
    }
}

impl ComponentKindSet {
    /// Returns `true` if velocities are stored.
    #[inline]
    #[must_use]
    pub const fn has_velocity(self) -> bool {
        self.contains(Self::VELOCITY)
    }
}

/// Storage column a component lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Satellites,
    Positions,
    Velocities,
}

/// Where one component kind lives: which column and where inside each element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentSlot {
    pub column: Column,
    /// Byte offset of the component inside one element
    pub offset: usize,
    /// Bytes between consecutive elements
    pub stride: usize,
    /// Size of the component in bytes
    pub size: usize,
}

/// Kind to slot lookup, built once when a space is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentTable {
    slots: [Option<ComponentSlot>; ComponentKind::COUNT],
    kinds: ComponentKindSet,
}

impl ComponentTable {
    /// Table for Cartesian storage restricted to `kinds`.
    ///
    /// Satellite and position are always present.
    pub fn cartesian(kinds: ComponentKindSet) -> Self {
        let kinds = kinds | ComponentKindSet::POSITION;
        let mut slots = [None; ComponentKind::COUNT];

        for kind in ComponentKind::ALL {
            if !kinds.contains(kind.flag()) {
                continue;
            }
            slots[kind.index()] = Some(match kind {
                ComponentKind::Satellite => ComponentSlot {
                    column: Column::Satellites,
                    offset: 0,
                    stride: size_of::<SatelliteId>(),
                    size: size_of::<SatelliteId>(),
                },
                ComponentKind::PosX | ComponentKind::PosY | ComponentKind::PosZ => {
                    let axis = kind.index() - ComponentKind::PosX.index();
                    ComponentSlot {
                        column: Column::Positions,
                        offset: axis * size_of::<SpaceInt>(),
                        stride: size_of::<Vector3g>(),
                        size: size_of::<SpaceInt>(),
                    }
                }
                ComponentKind::VelX | ComponentKind::VelY | ComponentKind::VelZ => {
                    let axis = kind.index() - ComponentKind::VelX.index();
                    ComponentSlot {
                        column: Column::Velocities,
                        offset: axis * size_of::<f64>(),
                        stride: size_of::<DVec3>(),
                        size: size_of::<f64>(),
                    }
                }
            });
        }

        Self { slots, kinds }
    }

    /// Slot for a kind, `None` if the kind is unsupported.
    #[inline]
    pub fn slot(&self, kind: ComponentKind) -> Option<ComponentSlot> {
        self.slots[kind.index()]
    }

    /// Supported kinds.
    #[inline]
    pub fn kinds(&self) -> ComponentKindSet {
        self.kinds
    }
}

/// Marker types naming a component kind and its element type.
pub trait CComp {
    const KIND: ComponentKind;
    type Data: Pod;
}

macro_rules! ccomp {
    ($($(#[$meta:meta])* $name:ident => $kind:ident : $data:ty),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug)]
            pub struct $name;

            impl CComp for $name {
                const KIND: ComponentKind = ComponentKind::$kind;
                type Data = $data;
            }
        )*
    };
}

ccomp! {
    /// Satellite handle
    CCompSat => Satellite: SatelliteId,
    /// Position X, in space units
    CCompX => PosX: SpaceInt,
    /// Position Y, in space units
    CCompY => PosY: SpaceInt,
    /// Position Z, in space units
    CCompZ => PosZ: SpaceInt,
    /// Velocity X, in meters per second
    CCompVx => VelX: f64,
    /// Velocity Y, in meters per second
    CCompVy => VelY: f64,
    /// Velocity Z, in meters per second
    CCompVz => VelZ: f64,
}

/// Untyped view of one component across all satellites of a space.
#[derive(Clone, Copy, Debug)]
pub struct RawView<'a> {
    bytes: &'a [u8],
    slot: ComponentSlot,
    len: usize,
}

impl<'a> RawView<'a> {
    pub(crate) fn new(bytes: &'a [u8], slot: ComponentSlot, len: usize) -> Self {
        debug_assert!(slot.offset + slot.size <= slot.stride);
        debug_assert!(bytes.len() >= len * slot.stride);
        Self { bytes, slot, len }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slot the view was built from.
    #[inline]
    pub fn slot(&self) -> ComponentSlot {
        self.slot
    }

    /// Bytes of element `index`.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn bytes_of(&self, index: usize) -> &'a [u8] {
        assert!(index < self.len, "component index {index} out of range (len {})", self.len);
        let start = index * self.slot.stride + self.slot.offset;
        &self.bytes[start..start + self.slot.size]
    }

    /// Typed view, `None` if `T` does not match the component size.
    pub fn typed<T: Pod>(self) -> Option<StridedView<'a, T>> {
        (size_of::<T>() == self.slot.size).then_some(StridedView {
            raw: self,
            _marker: PhantomData,
        })
    }
}

/// Typed view of one component across all satellites of a space.
///
/// Borrows the space, so it cannot outlive a flush.
#[derive(Clone, Copy, Debug)]
pub struct StridedView<'a, T> {
    raw: RawView<'a>,
    _marker: PhantomData<T>,
}

impl<'a, T: Pod> StridedView<'a, T> {
    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    /// Value at `index`.
    ///
    /// # Panics
    /// If `index` is out of range.
    #[inline]
    pub fn get(&self, index: usize) -> T {
        bytemuck::pod_read_unaligned(self.raw.bytes_of(index))
    }

    /// Value at `index`, `None` if out of range.
    #[inline]
    pub fn try_get(&self, index: usize) -> Option<T> {
        (index < self.raw.len).then(|| self.get(index))
    }

    /// Iterate all values in storage order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = T> + 'a {
        let view = *self;
        (0..view.len()).map(move |i| view.get(i))
    }
}
