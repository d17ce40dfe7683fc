//! Nodes of the traversability graph.

use bhumi_map::CellIndex;
use nalgebra::Vector3;

use crate::core::Hyperplane;

/// Dense, stable identifier of a traversability node.
///
/// Ids index the map's node arena and double as indices into the
/// per-node heuristic tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Classification of a traversability node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Created but never expanded.
    Unset,
    /// Expansion found too little surface data to classify.
    Unknown,
    /// The robot can stand here.
    Traversable,
    /// Blocked by slope or by a chest-height obstruction.
    Obstacle,
    /// Traversable cell abutting unexplored terrain. Routes like
    /// [`NodeKind::Traversable`]; the distinction only matters to
    /// exploration.
    Frontier,
}

impl NodeKind {
    /// Whether a path may pass through a node of this kind.
    #[inline]
    pub fn is_routable(self) -> bool {
        matches!(self, NodeKind::Traversable | NodeKind::Frontier)
    }
}

/// One node of the traversability graph: a (cell, layer) pair with its
/// fitted support plane and up to 8 step-reachable neighbors.
///
/// All fields except `height` are written once, during expansion; `height`
/// is additionally adjusted once when the plane fit refines it.
#[derive(Clone, Debug)]
pub struct TravNode {
    pub id: NodeId,
    pub index: CellIndex,
    pub height: f64,
    pub kind: NodeKind,
    pub expanded: bool,
    /// Support plane in a frame centered on the cell's xy center, absolute z.
    pub plane: Option<Hyperplane>,
    /// Angle between the support plane normal and vertical, radians.
    pub slope: f64,
    /// Direction of steepest ascent on the support plane.
    pub slope_direction: Vector3<f64>,
    /// `atan2` of the steepest-ascent direction's xy projection.
    pub slope_dir_atan2: f64,
    pub neighbors: Vec<NodeId>,
}

impl TravNode {
    pub(crate) fn new(id: NodeId, index: CellIndex, height: f64) -> Self {
        Self {
            id,
            index,
            height,
            kind: NodeKind::Unset,
            expanded: false,
            plane: None,
            slope: 0.0,
            slope_direction: Vector3::zeros(),
            slope_dir_atan2: 0.0,
            neighbors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routable_kinds() {
        assert!(NodeKind::Traversable.is_routable());
        assert!(NodeKind::Frontier.is_routable());
        assert!(!NodeKind::Unset.is_routable());
        assert!(!NodeKind::Unknown.is_routable());
        assert!(!NodeKind::Obstacle.is_routable());
    }
}
