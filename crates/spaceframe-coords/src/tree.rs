//! Hierarchy of coordinate spaces.
//!
//! Spaces live in an arena indexed by [`CoSpaceId`]. Freed slots are reused,
//! so a stale id may later name a different space.

use glam::DQuat;
use spaceframe_core::constants::MAX_PRECISION_STEP;
use spaceframe_core::{CoSpaceId, Error, Precision, Result, Vector3g};
use tracing::{debug, trace};

use crate::transform::CoSpaceTransform;
use crate::transformer::CoordTransformer;

#[derive(Clone, Debug)]
struct Node {
    placement: CoSpaceTransform,
    children: Vec<CoSpaceId>,
    depth: u32,
}

/// Tree of coordinate space placements with a single root.
#[derive(Clone, Debug)]
pub struct CoSpaceTree {
    nodes: Vec<Option<Node>>,
    free: Vec<u32>,
    root: CoSpaceId,
}

impl CoSpaceTree {
    /// Create a tree holding only a root space of the given precision.
    pub fn new(root_precision: Precision) -> Self {
        let root = Node {
            placement: CoSpaceTransform::root(root_precision),
            children: Vec::new(),
            depth: 0,
        };
        Self {
            nodes: vec![Some(root)],
            free: Vec::new(),
            root: CoSpaceId(0),
        }
    }

    /// The root space.
    #[inline]
    pub fn root(&self) -> CoSpaceId {
        self.root
    }

    /// Number of live spaces, root included.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Never true: the root cannot be removed.
    pub fn is_empty(&self) -> bool {
        false
    }

    fn node(&self, id: CoSpaceId) -> Result<&Node> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(Error::UnknownSpace(id))
    }

    fn node_mut(&mut self, id: CoSpaceId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownSpace(id))
    }

    /// True if `id` names a live space.
    #[inline]
    pub fn contains(&self, id: CoSpaceId) -> bool {
        self.node(id).is_ok()
    }

    /// Attach a new space under `parent`.
    ///
    /// The parent recorded in `placement` is overwritten with `parent`. The
    /// precision may differ from the parent's by at most
    /// [`MAX_PRECISION_STEP`].
    pub fn insert(&mut self, parent: CoSpaceId, placement: CoSpaceTransform) -> Result<CoSpaceId> {
        placement.validate()?;
        let parent_node = self.node(parent)?;
        let step = i32::from(placement.precision) - i32::from(parent_node.placement.precision);
        if step.abs() > MAX_PRECISION_STEP {
            return Err(Error::InvalidConfig(format!(
                "precision {} is {step} away from parent precision {}, limit ±{MAX_PRECISION_STEP}",
                placement.precision, parent_node.placement.precision
            )));
        }
        let depth = parent_node.depth + 1;

        let node = Node {
            placement: placement.with_parent(parent),
            children: Vec::new(),
            depth,
        };

        let id = if let Some(index) = self.free.pop() {
            self.nodes[index as usize] = Some(node);
            CoSpaceId(index)
        } else {
            let index = u32::try_from(self.nodes.len())
                .map_err(|_| Error::InvalidConfig("coordinate space arena is full".into()))?;
            self.nodes.push(Some(node));
            CoSpaceId(index)
        };

        self.node_mut(parent)?.children.push(id);
        debug!(%id, %parent, depth, precision = placement.precision, "Inserted coordinate space");
        Ok(id)
    }

    /// Detach a leaf space and return its last placement.
    pub fn remove(&mut self, id: CoSpaceId) -> Result<CoSpaceTransform> {
        if id == self.root {
            return Err(Error::RootSpace(id));
        }
        let node = self.node(id)?;
        if !node.children.is_empty() {
            return Err(Error::SpaceHasChildren(id));
        }
        let placement = node.placement;

        if let Some(parent) = placement.parent {
            self.node_mut(parent)?.children.retain(|&child| child != id);
        }
        self.nodes[id.index()] = None;
        self.free.push(id.0);

        debug!(%id, "Removed coordinate space");
        Ok(placement)
    }

    /// Placement of a space inside its parent.
    pub fn get(&self, id: CoSpaceId) -> Result<&CoSpaceTransform> {
        self.node(id).map(|node| &node.placement)
    }

    /// Replace the position and rotation of a space.
    ///
    /// Precision and parent stay as they are. Transformers built before the
    /// change keep describing the old placement.
    pub fn set_placement(
        &mut self,
        id: CoSpaceId,
        position: Vector3g,
        rotation: DQuat,
    ) -> Result<()> {
        if id == self.root {
            return Err(Error::RootSpace(id));
        }
        let node = self.node_mut(id)?;
        let updated = node
            .placement
            .with_position(position)
            .with_rotation(rotation);
        updated.validate()?;
        node.placement = updated;
        trace!(%id, ?position, "Moved coordinate space");
        Ok(())
    }

    /// Parent of a space, `None` for the root.
    pub fn parent_of(&self, id: CoSpaceId) -> Result<Option<CoSpaceId>> {
        self.node(id).map(|node| node.placement.parent)
    }

    /// Direct children of a space.
    pub fn children_of(&self, id: CoSpaceId) -> Result<&[CoSpaceId]> {
        self.node(id).map(|node| node.children.as_slice())
    }

    /// Distance from the root, which has depth 0.
    pub fn depth_of(&self, id: CoSpaceId) -> Result<u32> {
        self.node(id).map(|node| node.depth)
    }

    /// Chain from `id` up to the root, both included.
    pub fn ancestors(&self, id: CoSpaceId) -> Result<Vec<CoSpaceId>> {
        let mut chain = Vec::with_capacity(self.depth_of(id)? as usize + 1);
        let mut current = Some(id);
        while let Some(space) = current {
            chain.push(space);
            current = self.node(space)?.placement.parent;
        }
        Ok(chain)
    }

    /// Deepest space that is an ancestor of both (a space counts as its own
    /// ancestor).
    pub fn common_ancestor(&self, a: CoSpaceId, b: CoSpaceId) -> Result<CoSpaceId> {
        let (mut a, mut b) = (a, b);
        let (mut depth_a, mut depth_b) = (self.depth_of(a)?, self.depth_of(b)?);

        while depth_a > depth_b {
            a = self.parent_or_self(a)?;
            depth_a -= 1;
        }
        while depth_b > depth_a {
            b = self.parent_or_self(b)?;
            depth_b -= 1;
        }
        while a != b {
            a = self.parent_or_self(a)?;
            b = self.parent_or_self(b)?;
        }
        Ok(a)
    }

    fn parent_or_self(&self, id: CoSpaceId) -> Result<CoSpaceId> {
        Ok(self.node(id)?.placement.parent.unwrap_or(id))
    }

    /// Transformer mapping positions in `from` into positions in `to`.
    ///
    /// Walks up to the common ancestor, then down to `to`, composing one
    /// transformer for the whole path.
    pub fn transformer(&self, from: CoSpaceId, to: CoSpaceId) -> Result<CoordTransformer> {
        let ancestor = self.common_ancestor(from, to)?;
        let mut acc: Option<CoordTransformer> = None;

        let mut current = from;
        while current != ancestor {
            let node = self.node(current)?;
            let parent = self.parent_or_self(current)?;
            let parent_precision = self.node(parent)?.placement.precision;
            let step = CoordTransformer::child_to_parent(&node.placement, parent_precision);
            acc = Some(acc.map_or(step, |acc| acc.then(&step)));
            current = parent;
        }

        let mut down = Vec::new();
        let mut current = to;
        while current != ancestor {
            down.push(current);
            current = self.parent_or_self(current)?;
        }
        for &child in down.iter().rev() {
            let node = self.node(child)?;
            let parent = self.parent_or_self(child)?;
            let parent_precision = self.node(parent)?.placement.precision;
            let step = CoordTransformer::parent_to_child(&node.placement, parent_precision);
            acc = Some(acc.map_or(step, |acc| acc.then(&step)));
        }

        trace!(%from, %to, %ancestor, "Built transformer");
        Ok(acc.unwrap_or(CoordTransformer::IDENTITY))
    }
}
