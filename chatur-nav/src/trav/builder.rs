//! Lazy construction of the traversability graph from the elevation map.

use std::collections::VecDeque;
use std::sync::Arc;

use bhumi_map::{Aabb3, CellIndex, MlsGrid};
use nalgebra::Vector3;

use crate::config::TraversabilityConfig;
use crate::core::ransac::{fit_plane_ransac, PlaneRansacConfig};
use crate::core::Hyperplane;
use crate::error::{PlannerError, Result};

use super::map::TravMap;
use super::node::{NodeId, NodeKind};

/// Grows the traversability graph on demand.
///
/// Nodes are created as start/goal seeds or while linking neighbors, and
/// classified when first expanded: plane fit over the surrounding surface
/// patches, slope test, chest-height obstacle test, then step-height
/// neighbor linking. Expansion is idempotent and thread safe; concurrent
/// expanders race on the classification but only the first result is
/// applied.
pub struct TravBuilder {
    config: TraversabilityConfig,
    ransac: PlaneRansacConfig,
    mls: Arc<MlsGrid>,
    map: TravMap,
}

/// Outcome of classifying one node, computed outside the map lock.
enum Expansion {
    Unknown,
    Obstacle,
    Traversable {
        plane: Hyperplane,
        slope: f64,
        slope_direction: Vector3<f64>,
        slope_dir_atan2: f64,
        height: f64,
        /// Step-reachable neighbor cells with their plane-extrapolated
        /// heights.
        links: Vec<(CellIndex, f64)>,
    },
}

impl TravBuilder {
    pub fn new(mls: Arc<MlsGrid>, config: TraversabilityConfig) -> Self {
        let (mls_w, mls_h) = mls.num_cells();
        let num_cells = (
            ((mls_w as f64 * mls.resolution()) / config.grid_resolution).round() as usize,
            ((mls_h as f64 * mls.resolution()) / config.grid_resolution).round() as usize,
        );
        let map = TravMap::new(config.grid_resolution, num_cells, mls.origin());
        Self {
            config,
            ransac: PlaneRansacConfig::default(),
            mls,
            map,
        }
    }

    #[inline]
    pub fn map(&self) -> &TravMap {
        &self.map
    }

    /// Locate or create the node under a world position.
    ///
    /// Reuses an existing layer at that cell when its height is within the
    /// step height of `world.z`; otherwise seeds a fresh node at `world.z`.
    pub fn generate_start_node(&self, world: &Vector3<f64>) -> Result<NodeId> {
        let idx = self
            .map
            .to_grid(world)
            .ok_or(PlannerError::OutOfGrid(world.x, world.y, world.z))?;

        if let Some(id) = self
            .map
            .node_within(idx, world.z, self.config.max_step_height)
        {
            tracing::debug!("seed pose matches existing node {:?}", id);
            return Ok(id);
        }
        Ok(self.map.insert_node(idx, world.z))
    }

    /// Expand a node, classifying it and linking its reachable neighbors.
    ///
    /// Returns whether the node is routable afterwards. Only the first call
    /// per node does work; the node is marked expanded even when
    /// classification fails.
    pub fn expand_node(&self, id: NodeId) -> bool {
        {
            let inner = self.map.read();
            let node = &inner.nodes[id.index()];
            if node.expanded {
                return node.kind.is_routable();
            }
        }
        let outcome = self.classify(id);
        self.apply(id, outcome)
    }

    /// Breadth-first bulk expansion of everything reachable from `start`.
    pub fn expand_all(&self, start: NodeId) {
        let mut candidates = VecDeque::new();
        candidates.push_back(start);

        let mut count = 0usize;
        while let Some(id) = candidates.pop_front() {
            if self.map.is_expanded(id) {
                continue;
            }
            count += 1;
            if count % 1000 == 0 {
                tracing::debug!("expanded {} nodes", count);
            }
            if !self.expand_node(id) {
                continue;
            }
            for n in self.map.neighbors(id) {
                if !self.map.is_expanded(n) {
                    candidates.push_back(n);
                }
            }
        }
        tracing::info!("expanded {} nodes", count);
    }

    /// Clear a node's expanded flag so the next expansion refits its plane.
    pub fn mark_unexpanded(&self, id: NodeId) {
        self.map.mark_unexpanded(id);
    }

    fn classify(&self, id: NodeId) -> Expansion {
        let (index, node_height) = {
            let inner = self.map.read();
            let node = &inner.nodes[id.index()];
            (node.index, node.height)
        };

        let mut pos = self
            .map
            .from_grid(index)
            .expect("node index outside its own map");
        pos.z = node_height;

        // All surfaces within the robot footprint, one step height up or
        // down.
        let half = Vector3::new(
            self.config.robot_size_x / 2.0,
            self.config.robot_size_x / 2.0,
            self.config.max_step_height,
        );
        let aabb = Aabb3::from_center_half_extents(pos, half);

        // Sample cloud in a frame centered on the node, absolute z.
        let mut points = Vec::new();
        self.mls.intersect_aabb(&aabb, |cell, patch| {
            let center = self.mls.cell_center(cell);
            points.push(Vector3::new(
                center.x - pos.x,
                center.y - pos.y,
                patch.top(),
            ));
            false
        });

        if points.len() < self.ransac.min_points {
            return Expansion::Unknown;
        }
        let Some(fit) = fit_plane_ransac(&points, &self.ransac, plane_seed(index)) else {
            return Expansion::Unknown;
        };
        let plane = fit.plane;

        let slope = plane.slope();
        if slope > self.config.max_slope {
            return Expansion::Obstacle;
        }
        let slope_direction = plane.slope_direction();
        let slope_dir_atan2 = slope_direction.y.atan2(slope_direction.x);

        // Project the node onto the fitted plane.
        let refined = plane.height_at(0.0, 0.0);
        let height = if refined.is_finite() {
            refined
        } else {
            node_height
        };

        // Anything between step height and chest height above the support
        // plane blocks the cell.
        for p in &points {
            let dist = plane.signed_distance(p);
            if dist > self.config.max_step_height && dist < self.config.robot_height {
                return Expansion::Obstacle;
            }
        }

        let resolution = self.map.resolution();
        let mut links = Vec::with_capacity(8);
        for nidx in index.neighbors_8() {
            if !self.map.in_grid(nidx) {
                continue;
            }
            let off = nidx - index;
            let h = plane.height_at(off.x as f64 * resolution, off.y as f64 * resolution);
            if !h.is_finite() {
                continue;
            }
            if (h - height).abs() > self.config.max_step_height {
                continue;
            }
            links.push((nidx, h));
        }

        Expansion::Traversable {
            plane,
            slope,
            slope_direction,
            slope_dir_atan2,
            height,
            links,
        }
    }

    fn apply(&self, id: NodeId, outcome: Expansion) -> bool {
        let mut inner = self.map.write();
        if inner.nodes[id.index()].expanded {
            // another worker finished first
            return inner.nodes[id.index()].kind.is_routable();
        }
        inner.nodes[id.index()].expanded = true;

        match outcome {
            Expansion::Unknown => {
                inner.nodes[id.index()].kind = NodeKind::Unknown;
                false
            }
            Expansion::Obstacle => {
                inner.nodes[id.index()].kind = NodeKind::Obstacle;
                false
            }
            Expansion::Traversable {
                plane,
                slope,
                slope_direction,
                slope_dir_atan2,
                height,
                links,
            } => {
                {
                    let node = &mut inner.nodes[id.index()];
                    node.plane = Some(plane);
                    node.slope = slope;
                    node.slope_direction = slope_direction;
                    node.slope_dir_atan2 = slope_dir_atan2;
                    node.kind = NodeKind::Traversable;
                }
                inner.relocate(id, height);

                for (nidx, h) in links {
                    let neighbor = match inner.node_within(nidx, h, self.config.max_step_height) {
                        Some(n) => n,
                        None => inner.insert_node(nidx, h),
                    };
                    inner.link(id, neighbor);
                }
                true
            }
        }
    }
}

fn plane_seed(index: CellIndex) -> u64 {
    ((index.x as u32 as u64) << 32) | (index.y as u32 as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bhumi_map::SurfacePatch;
    use nalgebra::Vector2;

    fn flat_mls(n: usize) -> Arc<MlsGrid> {
        let mut grid = MlsGrid::new(n, n, 0.1, Vector2::zeros());
        for y in 0..n as i32 {
            for x in 0..n as i32 {
                grid.add_patch(CellIndex::new(x, y), SurfacePatch::thin(0.0));
            }
        }
        Arc::new(grid)
    }

    fn test_config() -> TraversabilityConfig {
        TraversabilityConfig {
            robot_height: 1.2,
            ..TraversabilityConfig::default()
        }
    }

    #[test]
    fn test_generate_start_node_out_of_grid() {
        let builder = TravBuilder::new(flat_mls(5), test_config());
        let err = builder
            .generate_start_node(&Vector3::new(-1.0, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, PlannerError::OutOfGrid(..)));
    }

    #[test]
    fn test_generate_start_node_reuses_matching_layer() {
        let builder = TravBuilder::new(flat_mls(5), test_config());
        let a = builder
            .generate_start_node(&Vector3::new(0.25, 0.25, 0.0))
            .unwrap();
        let b = builder
            .generate_start_node(&Vector3::new(0.25, 0.25, 0.05))
            .unwrap();
        assert_eq!(a, b);

        // A layer a full story up is a different node.
        let c = builder
            .generate_start_node(&Vector3::new(0.25, 0.25, 2.0))
            .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_expand_flat_cell_is_traversable() {
        let builder = TravBuilder::new(flat_mls(5), test_config());
        let id = builder
            .generate_start_node(&Vector3::new(0.25, 0.25, 0.0))
            .unwrap();
        assert!(builder.expand_node(id));

        let node = builder.map().node(id);
        assert_eq!(node.kind, NodeKind::Traversable);
        assert!(node.expanded);
        assert!(node.slope.abs() < 1e-9);
        assert!(node.height.abs() < 1e-9);
        assert_eq!(node.neighbors.len(), 8);
    }

    #[test]
    fn test_expand_is_idempotent() {
        let builder = TravBuilder::new(flat_mls(5), test_config());
        let id = builder
            .generate_start_node(&Vector3::new(0.25, 0.25, 0.0))
            .unwrap();
        assert!(builder.expand_node(id));
        let first = builder.map().node(id);
        assert!(builder.expand_node(id));
        let second = builder.map().node(id);

        assert_eq!(first.kind, second.kind);
        assert_eq!(first.height, second.height);
        assert_eq!(first.neighbors, second.neighbors);
        assert_eq!(builder.map().num_nodes(), 9);
    }

    #[test]
    fn test_expand_too_little_data_is_unknown() {
        // A single patch cannot support a plane fit.
        let mut grid = MlsGrid::new(5, 5, 0.1, Vector2::zeros());
        grid.add_patch(CellIndex::new(2, 2), SurfacePatch::thin(0.0));
        let builder = TravBuilder::new(Arc::new(grid), test_config());

        let id = builder
            .generate_start_node(&Vector3::new(0.25, 0.25, 0.0))
            .unwrap();
        assert!(!builder.expand_node(id));
        assert_eq!(builder.map().kind(id), NodeKind::Unknown);
        assert!(builder.map().is_expanded(id));
    }

    #[test]
    fn test_expand_steep_cell_is_obstacle() {
        // Gradient 1.0 => slope 45 degrees, above the default max slope.
        let mut grid = MlsGrid::new(9, 9, 0.1, Vector2::zeros());
        for y in 0..9i32 {
            for x in 0..9i32 {
                let z = x as f64 * 0.1;
                grid.add_patch(CellIndex::new(x, y), SurfacePatch::thin(z));
            }
        }
        let builder = TravBuilder::new(Arc::new(grid), test_config());
        let id = builder
            .generate_start_node(&Vector3::new(0.45, 0.45, 0.45))
            .unwrap();
        assert!(!builder.expand_node(id));
        assert_eq!(builder.map().kind(id), NodeKind::Obstacle);
    }

    #[test]
    fn test_chest_height_obstruction_is_obstacle() {
        let mut grid = MlsGrid::new(5, 5, 0.1, Vector2::zeros());
        for y in 0..5i32 {
            for x in 0..5i32 {
                grid.add_patch(CellIndex::new(x, y), SurfacePatch::thin(0.0));
            }
        }
        // A slab at chest height over the center cell.
        grid.add_patch(CellIndex::new(2, 2), SurfacePatch::new(0.0, 0.6));
        let builder = TravBuilder::new(Arc::new(grid), test_config());

        let id = builder
            .generate_start_node(&Vector3::new(0.25, 0.25, 0.0))
            .unwrap();
        assert!(!builder.expand_node(id));
        assert_eq!(builder.map().kind(id), NodeKind::Obstacle);
    }

    #[test]
    fn test_step_height_gap_not_linked() {
        // Left half at z=0, right half a full meter up.
        let mut grid = MlsGrid::new(10, 10, 0.1, Vector2::zeros());
        for y in 0..10i32 {
            for x in 0..10i32 {
                let z = if x >= 5 { 1.0 } else { 0.0 };
                grid.add_patch(CellIndex::new(x, y), SurfacePatch::thin(z));
            }
        }
        let builder = TravBuilder::new(Arc::new(grid), test_config());
        let id = builder
            .generate_start_node(&Vector3::new(0.25, 0.55, 0.0))
            .unwrap();
        builder.expand_all(id);
        assert!(builder.map().is_expanded(id));

        // Nothing reachable on the upper level.
        let upper = builder.map().node_within(CellIndex::new(7, 5), 1.0, 0.2);
        assert!(upper.is_none());
    }

    #[test]
    fn test_expand_all_covers_flat_grid() {
        let builder = TravBuilder::new(flat_mls(10), test_config());
        let id = builder
            .generate_start_node(&Vector3::new(0.05, 0.05, 0.0))
            .unwrap();
        builder.expand_all(id);

        assert_eq!(builder.map().num_nodes(), 100);
        for n in 0..100 {
            let node = builder.map().node(NodeId(n));
            assert!(node.expanded);
            assert_eq!(node.kind, NodeKind::Traversable);
        }
    }

    #[test]
    fn test_neighbor_heights_within_step() {
        let builder = TravBuilder::new(flat_mls(10), test_config());
        let id = builder
            .generate_start_node(&Vector3::new(0.05, 0.05, 0.0))
            .unwrap();
        builder.expand_all(id);

        let map = builder.map();
        for n in 0..map.num_nodes() as u32 {
            let node = map.node(NodeId(n));
            for nb in node.neighbors {
                assert!((map.height(nb) - node.height).abs() <= 0.2);
            }
        }
    }
}
