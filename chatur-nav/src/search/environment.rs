//! The XYZθ planning environment.
//!
//! Layers discrete headings over the traversability graph and serves the
//! three oracle operations the graph search needs: successor generation,
//! heuristic-to-goal and heuristic-to-start. States are materialized
//! lazily, the first time a motion reaches them.

use std::collections::{HashMap, HashSet, VecDeque};
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::sync::Arc;

use bhumi_map::{CellIndex, MlsGrid};
use nalgebra::{Vector2, Vector3};
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::config::{Mobility, SlopeMetric, TraversabilityConfig};
use crate::core::DiscreteAngle;
use crate::error::{PlannerError, Result};
use crate::motion::{Motion, MotionKind, MotionTable, COST_SCALE};
use crate::trav::{NodeId, TravBuilder, TravMap};

use super::collision::is_collision_free;
use super::heuristic::{shortest_distances, Distance, MAX_DIST};
use super::{SearchSpace, StateId, Successor};

/// A planning state: a traversability node plus a discrete heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct State {
    pub trav: NodeId,
    pub theta: DiscreteAngle,
}

/// One motion primitive of the result path sampled into world space.
///
/// Points follow the primitive's intermediate poses with heights taken
/// from the terrain; the speed is signed, negative for backward motions.
#[derive(Clone, Debug)]
pub struct TrajectorySegment {
    pub points: Vec<Vector3<f64>>,
    pub speed: f64,
}

/// A placed terminal (start or goal) pose.
#[derive(Clone, Copy, Debug)]
struct Terminal {
    state: StateId,
    trav: NodeId,
    theta: DiscreteAngle,
}

/// Append-only bidirectional table between state ids and states.
#[derive(Default)]
struct StateTable {
    inner: Mutex<StateTableInner>,
}

#[derive(Default)]
struct StateTableInner {
    states: Vec<State>,
    lookup: HashMap<(NodeId, DiscreteAngle), StateId>,
}

impl StateTable {
    fn get_or_insert(&self, trav: NodeId, theta: DiscreteAngle) -> StateId {
        let mut inner = self.inner.lock();
        if let Some(&id) = inner.lookup.get(&(trav, theta)) {
            return id;
        }
        let id = StateId(inner.states.len() as u32);
        inner.states.push(State { trav, theta });
        inner.lookup.insert((trav, theta), id);
        id
    }

    fn state(&self, id: StateId) -> Result<State> {
        self.inner
            .lock()
            .states
            .get(id.0 as usize)
            .copied()
            .ok_or_else(|| PlannerError::Internal(format!("unknown state id {}", id.0)))
    }

    fn len(&self) -> usize {
        self.inner.lock().states.len()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.states.clear();
        inner.lookup.clear();
    }
}

/// The planning environment over one elevation map.
pub struct NavEnvironment {
    config: TraversabilityConfig,
    mobility: Mobility,
    motions: Arc<MotionTable>,
    mls: Arc<MlsGrid>,
    builder: TravBuilder,
    states: StateTable,
    start: Option<Terminal>,
    goal: Option<Terminal>,
    /// Per-trav-node distances to the terminals; filled by `set_goal`.
    distances: Vec<Distance>,
}

impl NavEnvironment {
    pub fn new(
        mls: Arc<MlsGrid>,
        config: TraversabilityConfig,
        mobility: Mobility,
        motions: Arc<MotionTable>,
    ) -> Result<Self> {
        if config.grid_resolution <= 0.0 {
            return Err(PlannerError::Config(
                "grid resolution must be positive".into(),
            ));
        }
        if mobility.translation_speed <= 0.0 || mobility.turning_speed <= 0.0 {
            return Err(PlannerError::Config(
                "mobility speeds must be positive".into(),
            ));
        }
        let builder = TravBuilder::new(mls.clone(), config.clone());
        Ok(Self {
            config,
            mobility,
            motions,
            mls,
            builder,
            states: StateTable::default(),
            start: None,
            goal: None,
            distances: Vec::new(),
        })
    }

    /// Replace the elevation map, dropping the traversability graph, all
    /// states and the heuristic tables. The resolution must not change.
    pub fn update_map(&mut self, mls: Arc<MlsGrid>) -> Result<()> {
        if (mls.resolution() - self.mls.resolution()).abs() > 1e-12 {
            return Err(PlannerError::Config(format!(
                "elevation map resolution changed from {} to {}",
                self.mls.resolution(),
                mls.resolution()
            )));
        }
        self.builder = TravBuilder::new(mls.clone(), self.config.clone());
        self.mls = mls;
        self.states.clear();
        self.distances.clear();
        self.start = None;
        self.goal = None;
        Ok(())
    }

    /// The traversability graph.
    #[inline]
    pub fn trav_map(&self) -> &TravMap {
        self.builder.map()
    }

    /// The motion primitive table.
    #[inline]
    pub fn motions(&self) -> &MotionTable {
        &self.motions
    }

    /// Number of states materialized so far.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Resolve a state id.
    pub fn state(&self, id: StateId) -> Result<State> {
        self.states.state(id)
    }

    /// World position of a state: its cell center at the node's height.
    pub fn state_position(&self, id: StateId) -> Result<Vector3<f64>> {
        let state = self.states.state(id)?;
        let map = self.trav_map();
        let mut pos = map
            .from_grid(map.index(state.trav))
            .ok_or_else(|| PlannerError::Internal("state cell outside the map".into()))?;
        pos.z = map.height(state.trav);
        Ok(pos)
    }

    /// Place the start pose.
    ///
    /// Seeds (or reuses) the traversability node under `position`, forces
    /// a plane fit to correct the node height, and rejects poses whose
    /// heading is not allowed on the local slope or whose body collides
    /// with the terrain.
    pub fn set_start(&mut self, position: &Vector3<f64>, yaw: f64) -> Result<StateId> {
        let terminal = self.seed_terminal(position, yaw)?;
        self.builder.mark_unexpanded(terminal.trav);

        if !self.orientation_allowed(terminal.trav, yaw)? {
            return Err(PlannerError::NotTraversable(
                "start heading not allowed on this slope".into(),
            ));
        }
        if !self.pose_collision_free(terminal.trav, yaw)? {
            return Err(PlannerError::NotTraversable(
                "start pose collides with the terrain".into(),
            ));
        }

        tracing::debug!("start state {} at {:?}", terminal.state.0, position);
        self.start = Some(terminal);
        self.distances.clear();
        Ok(terminal.state)
    }

    /// Place the goal pose, then expand the reachable graph and precompute
    /// the heuristic tables. The start must be set first.
    pub fn set_goal(&mut self, position: &Vector3<f64>, yaw: f64) -> Result<StateId> {
        let start = self.start.ok_or_else(|| {
            PlannerError::Internal("start must be set before the goal".into())
        })?;

        let terminal = self.seed_terminal(position, yaw)?;
        // force a fresh plane fit during the bulk expansion
        self.builder.mark_unexpanded(terminal.trav);

        if !self.orientation_allowed(terminal.trav, yaw)? {
            return Err(PlannerError::NotTraversable(
                "goal heading not allowed on this slope".into(),
            ));
        }
        if !self.pose_collision_free(terminal.trav, yaw)? {
            return Err(PlannerError::NotTraversable(
                "goal pose collides with the terrain".into(),
            ));
        }

        self.builder.expand_all(start.trav);
        tracing::debug!(
            "graph expanded to {} nodes, precomputing heuristic",
            self.trav_map().num_nodes()
        );
        self.goal = Some(terminal);
        self.precompute_heuristic()?;
        Ok(terminal.state)
    }

    /// Seed the traversability node and planning state under a pose.
    fn seed_terminal(&mut self, position: &Vector3<f64>, yaw: f64) -> Result<Terminal> {
        let trav = self.builder.generate_start_node(position)?;
        // the expansion also corrects the node height via the plane fit
        if !self.builder.expand_node(trav) {
            return Err(PlannerError::NotTraversable(format!(
                "cell under ({:.3}, {:.3}, {:.3}) does not classify as traversable",
                position.x, position.y, position.z
            )));
        }
        let theta = DiscreteAngle::from_radians(yaw, self.motions.num_angles());
        let state = self.states.get_or_insert(trav, theta);
        Ok(Terminal { state, trav, theta })
    }

    /// Whether a heading is permitted on a node's slope.
    ///
    /// Below `incline_limit_min_slope` every heading is allowed. Above it
    /// the permitted band narrows linearly from a half circle down to
    /// `incline_limit` at `max_slope`, centered on the fall line; the
    /// mirrored band allows facing downhill.
    pub fn orientation_allowed(&self, node: NodeId, yaw: f64) -> Result<bool> {
        let slope = self.trav_map().slope(node);
        if slope < self.config.incline_limit_min_slope {
            return Ok(true);
        }

        let limit = interpolate(
            slope,
            self.config.incline_limit_min_slope,
            FRAC_PI_2,
            self.config.max_slope,
            self.config.incline_limit,
        );
        let width = 2.0 * limit;
        if width < 0.0 {
            return Err(PlannerError::Internal(format!(
                "negative orientation band at slope {:.3}; the map was built \
                 with a different max_slope than configured",
                slope
            )));
        }

        let start = self.trav_map().slope_dir_atan2(node) - limit;
        Ok(angle_in_segment(yaw, start, width) || angle_in_segment(yaw, start - PI, width))
    }

    fn pose_collision_free(&self, node: NodeId, yaw: f64) -> Result<bool> {
        let map = self.trav_map();
        let plane = map.plane(node).ok_or_else(|| {
            PlannerError::Internal("expanded node has no support plane".into())
        })?;
        let mut position = map
            .from_grid(map.index(node))
            .ok_or_else(|| PlannerError::Internal("node cell outside the map".into()))?;
        position.z = map.height(node) + self.config.robot_height * 0.5;
        Ok(is_collision_free(
            &self.mls,
            &self.config,
            &position,
            &plane.normal(),
            yaw,
        ))
    }

    /// Step from a node to the node under an adjacent cell, expanding it
    /// on demand. `None` when the cells are not step-connected or the
    /// target does not classify as routable.
    fn movement_possible(
        &self,
        from: NodeId,
        from_idx: CellIndex,
        to_idx: CellIndex,
    ) -> Option<NodeId> {
        if to_idx == from_idx {
            return Some(from);
        }
        let target = self.trav_map().connected_node_at(from, to_idx)?;
        self.builder.expand_node(target);
        self.trav_map().kind(target).is_routable().then_some(target)
    }

    /// Try one motion out of a state. `Ok(None)` filters the motion out;
    /// errors are invariant violations and abort the search.
    fn try_motion(
        &self,
        source: State,
        source_idx: CellIndex,
        source_height: f64,
        motion: &Motion,
    ) -> Result<Option<Successor>> {
        let mut trav = source.trav;
        let mut cur_idx = source_idx;
        let mut path = Vec::with_capacity(motion.intermediate_steps.len() + 1);

        for step in &motion.intermediate_steps {
            // each step carries a full offset from the start cell
            let new_idx = source_idx + step.cell;
            let Some(next) = self.movement_possible(trav, cur_idx, new_idx) else {
                return Ok(None);
            };
            trav = next;
            path.push(trav);
            if !self.orientation_allowed(trav, step.pose.orientation)? {
                return Ok(None);
            }
            cur_idx = new_idx;
        }

        let final_idx = source_idx + CellIndex::new(motion.dx, motion.dy);
        let Some(final_node) = self.movement_possible(trav, cur_idx, final_idx) else {
            return Ok(None);
        };
        path.push(final_node);
        if self.trav_map().index(final_node) != final_idx {
            return Err(PlannerError::Internal(
                "node index does not match the motion's final cell".into(),
            ));
        }

        // swept-volume collision, the last cell at the end heading
        for (i, &node) in path.iter().enumerate() {
            let yaw = if i < motion.intermediate_steps.len() {
                motion.intermediate_steps[i].pose.orientation
            } else {
                motion.end_theta.to_radians()
            };
            if !self.pose_collision_free(node, yaw)? {
                return Ok(None);
            }
        }

        let successor = self.states.get_or_insert(final_node, motion.end_theta);

        let mut cost = match self.config.slope_metric {
            SlopeMetric::None => motion.base_cost as f64,
            SlopeMetric::Avg => {
                let factor = self.avg_slope(&path) * self.config.slope_metric_scale;
                motion.base_cost as f64 * (1.0 + factor)
            }
            SlopeMetric::Max => {
                let factor = self.max_slope(&path) * self.config.slope_metric_scale;
                motion.base_cost as f64 * (1.0 + factor)
            }
            SlopeMetric::Triangle => {
                // straight-line extrapolation into the third dimension
                let height_diff = (source_height - self.trav_map().height(final_node)).abs();
                let len_3d = (motion.translational_dist.powi(2) + height_diff.powi(2)).sqrt();
                let translation_speed = self.mobility.translation_speed.min(motion.speed);
                Motion::calculate_cost(
                    len_3d,
                    motion.angular_dist,
                    translation_speed,
                    self.mobility.turning_speed,
                    motion.cost_multiplier,
                ) as f64
            }
        };
        cost += self.config.cost_obstacle_multiplier * self.obstacle_count(&path) as f64;

        let cost = cost as i32;
        if cost < motion.base_cost {
            return Err(PlannerError::Internal(format!(
                "successor cost {} below motion base cost {}",
                cost, motion.base_cost
            )));
        }

        Ok(Some(Successor {
            state: successor,
            cost,
            motion: motion.id,
        }))
    }

    fn avg_slope(&self, path: &[NodeId]) -> f64 {
        let inner = self.trav_map().read();
        let sum: f64 = path.iter().map(|n| inner.nodes[n.index()].slope).sum();
        sum / path.len() as f64
    }

    fn max_slope(&self, path: &[NodeId]) -> f64 {
        let inner = self.trav_map().read();
        path.iter()
            .map(|n| inner.nodes[n.index()].slope)
            .fold(0.0, f64::max)
    }

    /// Number of non-routable nodes within `cost_obstacle_dist` (2D) of the
    /// swept path, found by flooding the graph around each swept node.
    fn obstacle_count(&self, path: &[NodeId]) -> usize {
        if self.config.cost_obstacle_multiplier == 0.0 || self.config.cost_obstacle_dist <= 0.0 {
            return 0;
        }
        let max_sq = self.config.cost_obstacle_dist * self.config.cost_obstacle_dist;
        let resolution = self.trav_map().resolution();
        let inner = self.trav_map().read();
        let cell_pos = |id: NodeId| {
            let idx = inner.nodes[id.index()].index;
            Vector2::new(idx.x as f64 * resolution, idx.y as f64 * resolution)
        };

        let mut corridor: HashSet<NodeId> = HashSet::new();
        for &seed in path {
            let seed_pos = cell_pos(seed);
            let mut queue = VecDeque::new();
            let mut visited = HashSet::new();
            queue.push_back(seed);
            visited.insert(seed);
            while let Some(current) = queue.pop_front() {
                corridor.insert(current);
                for &neighbor in &inner.nodes[current.index()].neighbors {
                    if !visited.insert(neighbor) {
                        continue;
                    }
                    if (cell_pos(neighbor) - seed_pos).norm_squared() > max_sq {
                        continue;
                    }
                    queue.push_back(neighbor);
                }
            }
        }

        corridor
            .iter()
            .filter(|n| !inner.nodes[n.index()].kind.is_routable())
            .count()
    }

    fn precompute_heuristic(&mut self) -> Result<()> {
        let start = self
            .start
            .ok_or_else(|| PlannerError::Internal("start not set".into()))?;
        let goal = self
            .goal
            .ok_or_else(|| PlannerError::Internal("goal not set".into()))?;

        let map = self.builder.map();
        let to_start = shortest_distances(map, start.trav, self.config.heuristic);
        let to_goal = shortest_distances(map, goal.trav, self.config.heuristic);

        for (i, &d) in to_start.iter().enumerate() {
            if i != start.trav.index() && i != goal.trav.index() && d <= 0.0 {
                return Err(PlannerError::Internal(format!(
                    "distance to start is zero at non-terminal node {}",
                    i
                )));
            }
        }

        self.distances = to_start
            .iter()
            .zip(&to_goal)
            .map(|(&to_start, &to_goal)| Distance { to_start, to_goal })
            .collect();
        tracing::debug!("heuristic tables filled for {} nodes", self.distances.len());
        Ok(())
    }

    fn terminal_distance(&self, trav: NodeId) -> Result<Distance> {
        if self.distances.is_empty() {
            return Err(PlannerError::Internal(
                "heuristic queried before the goal was set".into(),
            ));
        }
        // nodes created after precomputation are unreachable by definition
        Ok(self
            .distances
            .get(trav.index())
            .copied()
            .unwrap_or(Distance {
                to_start: MAX_DIST,
                to_goal: MAX_DIST,
            }))
    }

    /// Re-derive the cheapest motion connecting two adjacent states of a
    /// result path.
    pub fn motion_between(&self, from: StateId, to: StateId) -> Result<Motion> {
        let mut best: Option<(i32, Motion)> = None;
        for successor in self.successors(from)? {
            if successor.state != to {
                continue;
            }
            if best.as_ref().is_none_or(|(cost, _)| successor.cost < *cost) {
                best = Some((successor.cost, self.motions.get(successor.motion).clone()));
            }
        }
        best.map(|(_, motion)| motion).ok_or_else(|| {
            PlannerError::Internal("no motion connects two states of the result path".into())
        })
    }

    /// The motions along a result path of state ids.
    pub fn motions_along(&self, path: &[StateId]) -> Result<Vec<Motion>> {
        path.windows(2)
            .map(|pair| self.motion_between(pair[0], pair[1]))
            .collect()
    }

    /// Sample a result path into world-space trajectory segments, one per
    /// motion, with heights taken from the traversability graph and speeds
    /// signed by direction.
    pub fn trajectory(&self, path: &[StateId]) -> Result<Vec<TrajectorySegment>> {
        let map = self.trav_map();
        let mut segments = Vec::new();

        for pair in path.windows(2) {
            let motion = self.motion_between(pair[0], pair[1])?;
            let start_pos = self.state_position(pair[0])?;
            let start_state = self.states.state(pair[0])?;
            let start_idx = map.index(start_state.trav);

            let mut node = start_state.trav;
            let mut last_idx = start_idx;
            let mut points: Vec<Vector3<f64>> = Vec::new();
            for step in &motion.intermediate_steps {
                let cur_idx = start_idx + step.cell;
                if cur_idx != last_idx {
                    node = map.connected_node_at(node, cur_idx).ok_or_else(|| {
                        PlannerError::Internal(
                            "trajectory is not continuous on the traversability graph".into(),
                        )
                    })?;
                    last_idx = cur_idx;
                }
                let pos = Vector3::new(
                    start_pos.x + step.pose.x,
                    start_pos.y + step.pose.y,
                    map.height(node),
                );
                if points.last().is_none_or(|last| (last - pos).norm() > 1e-9) {
                    points.push(pos);
                }
            }

            let speed = if motion.kind == MotionKind::Backward {
                -motion.speed
            } else {
                motion.speed
            };
            segments.push(TrajectorySegment { points, speed });
        }
        Ok(segments)
    }
}

impl SearchSpace for NavEnvironment {
    fn initial_ids(&self) -> Result<(StateId, StateId)> {
        match (self.start, self.goal) {
            (Some(start), Some(goal)) => Ok((start.state, goal.state)),
            _ => Err(PlannerError::Internal(
                "search queried before start and goal were set".into(),
            )),
        }
    }

    fn heuristic_to_goal(&self, state: StateId) -> Result<i32> {
        let goal = self
            .goal
            .ok_or_else(|| PlannerError::Internal("goal not set".into()))?;
        let state = self.states.state(state)?;
        let distance = self.terminal_distance(state.trav)?.to_goal;

        let translation_time = distance / self.mobility.translation_speed;
        let rotation_time = state.theta.shortest_dist(goal.theta) / self.mobility.turning_speed;
        let heuristic = (translation_time.max(rotation_time) * COST_SCALE).floor() as i32;
        if heuristic < 0 {
            return Err(PlannerError::Internal(format!(
                "negative goal heuristic {}",
                heuristic
            )));
        }
        Ok(heuristic)
    }

    fn heuristic_to_start(&self, state: StateId) -> Result<i32> {
        let start = self
            .start
            .ok_or_else(|| PlannerError::Internal("start not set".into()))?;
        let state = self.states.state(state)?;
        let distance = self.terminal_distance(state.trav)?.to_start;

        let translation_time = distance / self.mobility.translation_speed;
        let rotation_time = start.theta.shortest_dist(state.theta) / self.mobility.turning_speed;
        let heuristic = (translation_time.max(rotation_time) * COST_SCALE).floor() as i32;
        if heuristic < 0 {
            return Err(PlannerError::Internal(format!(
                "negative start heuristic {}",
                heuristic
            )));
        }
        Ok(heuristic)
    }

    fn successors(&self, state: StateId) -> Result<Vec<Successor>> {
        let source = self.states.state(state)?;
        let source_idx = self.trav_map().index(source.trav);

        // the source may still be unexpanded when the start was re-seeded
        if !self.trav_map().is_expanded(source.trav) && !self.builder.expand_node(source.trav) {
            return Ok(Vec::new());
        }
        let source_height = self.trav_map().height(source.trav);

        let motions = self.motions.motions_for(source.theta);
        let results: Vec<Option<Successor>> = if self.config.parallelism_enabled {
            motions
                .par_iter()
                .with_min_len(5)
                .map(|m| self.try_motion(source, source_idx, source_height, m))
                .collect::<Result<_>>()?
        } else {
            motions
                .iter()
                .map(|m| self.try_motion(source, source_idx, source_height, m))
                .collect::<Result<_>>()?
        };

        Ok(results.into_iter().flatten().collect())
    }
}

/// Linear interpolation through `(x0, y0)` and `(x1, y1)`.
fn interpolate(x: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// Whether `angle` lies inside the arc starting at `start` spanning
/// `width` radians counter-clockwise.
fn angle_in_segment(angle: f64, start: f64, width: f64) -> bool {
    (angle - start).rem_euclid(TAU) <= width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate() {
        assert_eq!(interpolate(0.5, 0.0, 0.0, 1.0, 2.0), 1.0);
        assert_eq!(interpolate(0.3, 0.3, 1.5, 0.8, 0.2), 1.5);
        assert!((interpolate(0.8, 0.3, 1.5, 0.8, 0.2) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_angle_in_segment() {
        assert!(angle_in_segment(0.1, 0.0, 0.5));
        assert!(!angle_in_segment(0.6, 0.0, 0.5));
        // wraps across zero
        assert!(angle_in_segment(0.1, -0.2, 0.5));
        assert!(angle_in_segment(TAU - 0.1, -0.2, 0.5));
        assert!(!angle_in_segment(PI, -0.2, 0.5));
    }

    #[test]
    fn test_state_table_dedup() {
        let table = StateTable::default();
        let theta = DiscreteAngle::new(3, 16);
        let a = table.get_or_insert(NodeId(7), theta);
        let b = table.get_or_insert(NodeId(7), theta);
        let c = table.get_or_insert(NodeId(7), DiscreteAngle::new(4, 16));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
        assert_eq!(table.state(a).unwrap().trav, NodeId(7));
        assert!(table.state(StateId(99)).is_err());
    }
}
