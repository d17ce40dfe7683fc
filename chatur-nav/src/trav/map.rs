//! Arena-owned storage of the traversability graph.

use std::collections::HashMap;

use bhumi_map::CellIndex;
use nalgebra::{Vector2, Vector3};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::Hyperplane;

use super::node::{NodeId, NodeKind, TravNode};

/// The traversability map: an arena of [`TravNode`]s plus a per-cell
/// spatial index, each cell's layer list kept sorted by height.
///
/// Nodes hold their neighbors as arena ids, so the cyclic 8-neighborhood
/// needs no shared ownership and the whole graph drops in one step.
///
/// One reader-writer lock guards the arena and the spatial index together.
/// Expansion and insertion take the write lock; everything else reads
/// through short-lived read locks that copy out small values. Node fields
/// become effectively immutable once the node is expanded.
pub struct TravMap {
    resolution: f64,
    num_cells: (usize, usize),
    origin: Vector2<f64>,
    inner: RwLock<MapInner>,
}

pub(crate) struct MapInner {
    pub(crate) nodes: Vec<TravNode>,
    cells: HashMap<CellIndex, Vec<NodeId>>,
}

impl TravMap {
    pub(crate) fn new(resolution: f64, num_cells: (usize, usize), origin: Vector2<f64>) -> Self {
        Self {
            resolution,
            num_cells,
            origin,
            inner: RwLock::new(MapInner {
                nodes: Vec::new(),
                cells: HashMap::new(),
            }),
        }
    }

    /// Cell side length in meters.
    #[inline]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Number of cells in x and y.
    #[inline]
    pub fn num_cells(&self) -> (usize, usize) {
        self.num_cells
    }

    /// Number of nodes created so far.
    pub fn num_nodes(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Check whether an index addresses a cell inside the map.
    #[inline]
    pub fn in_grid(&self, idx: CellIndex) -> bool {
        idx.x >= 0
            && idx.y >= 0
            && (idx.x as usize) < self.num_cells.0
            && (idx.y as usize) < self.num_cells.1
    }

    /// Index of the cell containing a world position's xy projection.
    pub fn to_grid(&self, world: &Vector3<f64>) -> Option<CellIndex> {
        let idx = CellIndex::new(
            ((world.x - self.origin.x) / self.resolution).floor() as i32,
            ((world.y - self.origin.y) / self.resolution).floor() as i32,
        );
        self.in_grid(idx).then_some(idx)
    }

    /// World position of a cell's center at z = 0.
    pub fn from_grid(&self, idx: CellIndex) -> Option<Vector3<f64>> {
        self.in_grid(idx).then(|| {
            Vector3::new(
                self.origin.x + (idx.x as f64 + 0.5) * self.resolution,
                self.origin.y + (idx.y as f64 + 0.5) * self.resolution,
                0.0,
            )
        })
    }

    /// Snapshot of a node.
    pub fn node(&self, id: NodeId) -> TravNode {
        self.inner.read().nodes[id.index()].clone()
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.inner.read().nodes[id.index()].kind
    }

    #[inline]
    pub fn height(&self, id: NodeId) -> f64 {
        self.inner.read().nodes[id.index()].height
    }

    #[inline]
    pub fn index(&self, id: NodeId) -> CellIndex {
        self.inner.read().nodes[id.index()].index
    }

    #[inline]
    pub fn slope(&self, id: NodeId) -> f64 {
        self.inner.read().nodes[id.index()].slope
    }

    #[inline]
    pub fn slope_dir_atan2(&self, id: NodeId) -> f64 {
        self.inner.read().nodes[id.index()].slope_dir_atan2
    }

    #[inline]
    pub fn plane(&self, id: NodeId) -> Option<Hyperplane> {
        self.inner.read().nodes[id.index()].plane
    }

    #[inline]
    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.inner.read().nodes[id.index()].expanded
    }

    /// Neighbor ids of a node.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.inner.read().nodes[id.index()].neighbors.clone()
    }

    /// The neighbor of `id` living at `idx`, if the two are linked.
    pub fn connected_node_at(&self, id: NodeId, idx: CellIndex) -> Option<NodeId> {
        let inner = self.inner.read();
        inner.nodes[id.index()]
            .neighbors
            .iter()
            .copied()
            .find(|n| inner.nodes[n.index()].index == idx)
    }

    /// Find a node at `idx` whose height is within `max_step` of `height`.
    pub fn node_within(&self, idx: CellIndex, height: f64, max_step: f64) -> Option<NodeId> {
        self.inner.read().node_within(idx, height, max_step)
    }

    /// Override a node's classification.
    ///
    /// Exposed for exploration layers that re-tag traversable nodes as
    /// frontiers.
    pub fn set_kind(&self, id: NodeId, kind: NodeKind) {
        self.inner.write().nodes[id.index()].kind = kind;
    }

    pub(crate) fn insert_node(&self, idx: CellIndex, height: f64) -> NodeId {
        self.inner.write().insert_node(idx, height)
    }

    pub(crate) fn mark_unexpanded(&self, id: NodeId) {
        self.inner.write().nodes[id.index()].expanded = false;
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, MapInner> {
        self.inner.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, MapInner> {
        self.inner.write()
    }
}

impl MapInner {
    pub(crate) fn insert_node(&mut self, idx: CellIndex, height: f64) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TravNode::new(id, idx, height));
        let cell = self.cells.entry(idx).or_default();
        let pos = cell.partition_point(|n| self.nodes[n.index()].height < height);
        cell.insert(pos, id);
        id
    }

    /// Move a node to its plane-corrected height, keeping the cell list
    /// sorted.
    pub(crate) fn relocate(&mut self, id: NodeId, new_height: f64) {
        let idx = self.nodes[id.index()].index;
        let cell = self.cells.get_mut(&idx).expect("node cell missing");
        cell.retain(|n| *n != id);
        self.nodes[id.index()].height = new_height;
        let pos = cell.partition_point(|n| self.nodes[n.index()].height < new_height);
        cell.insert(pos, id);
    }

    /// Symmetric neighbor link; re-linking is a no-op.
    pub(crate) fn link(&mut self, a: NodeId, b: NodeId) {
        if !self.nodes[a.index()].neighbors.contains(&b) {
            self.nodes[a.index()].neighbors.push(b);
        }
        if !self.nodes[b.index()].neighbors.contains(&a) {
            self.nodes[b.index()].neighbors.push(a);
        }
    }

    pub(crate) fn node_within(
        &self,
        idx: CellIndex,
        height: f64,
        max_step: f64,
    ) -> Option<NodeId> {
        let cell = self.cells.get(&idx)?;
        for &id in cell {
            let h = self.nodes[id.index()].height;
            if (h - height).abs() < max_step {
                return Some(id);
            }
            if h > height {
                // list is sorted by height, nothing closer follows
                break;
            }
        }
        None
    }
}
