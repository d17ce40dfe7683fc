//! Motion primitives: precomputed maneuvers between discrete headings.
//!
//! The planner consumes a read-only table of primitives indexed by start
//! heading. Each primitive carries the cells it sweeps, its intermediate
//! poses, and a base cost derived from execution time.

use bhumi_map::CellIndex;
use serde::Deserialize;

use crate::core::DiscreteAngle;
use crate::error::{PlannerError, Result};

/// Costs are execution time in seconds scaled by this factor and truncated
/// to an integer.
pub const COST_SCALE: f64 = 1000.0;

/// Dense identifier of a motion in its table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MotionId(pub u32);

/// Direction class of a primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionKind {
    Forward,
    Backward,
    Lateral,
    PointTurn,
}

/// A pose relative to the start of a motion: position in meters, heading in
/// radians.
#[derive(Clone, Copy, Debug)]
pub struct Pose2 {
    pub x: f64,
    pub y: f64,
    pub orientation: f64,
}

/// An intermediate pose of a motion together with the cell it falls into,
/// as an offset from the start cell.
#[derive(Clone, Debug)]
pub struct PoseWithCell {
    pub pose: Pose2,
    pub cell: CellIndex,
}

/// A precomputed maneuver from one discrete heading to another with a fixed
/// cell displacement.
///
/// `intermediate_steps` is ordered and does not include the final cell, so
/// a motion sweeps `intermediate_steps.len() + 1` cells.
#[derive(Clone, Debug)]
pub struct Motion {
    /// Table-assigned id; the value given at construction is overwritten.
    pub id: MotionId,
    pub start_theta: DiscreteAngle,
    pub end_theta: DiscreteAngle,
    /// Cell displacement from start to end.
    pub dx: i32,
    pub dy: i32,
    pub intermediate_steps: Vec<PoseWithCell>,
    /// Length of the 2D path in meters.
    pub translational_dist: f64,
    /// Total heading change in radians.
    pub angular_dist: f64,
    /// Execution-time cost of the motion on flat ground. Always >= 1.
    pub base_cost: i32,
    /// Nominal execution speed in m/s.
    pub speed: f64,
    pub cost_multiplier: i32,
    pub kind: MotionKind,
}

impl Motion {
    /// Time-based cost of moving `translational_dist` meters while turning
    /// `angular_dist` radians.
    ///
    /// The robot can translate and rotate at the same time, so the slower
    /// of the two axes dominates.
    pub fn calculate_cost(
        translational_dist: f64,
        angular_dist: f64,
        translation_speed: f64,
        turning_speed: f64,
        cost_multiplier: i32,
    ) -> i32 {
        let translation_time = translational_dist / translation_speed;
        let rotation_time = angular_dist / turning_speed;
        (translation_time.max(rotation_time) * COST_SCALE * cost_multiplier as f64).ceil() as i32
    }
}

/// Read-only table of motion primitives, binned by start heading.
pub struct MotionTable {
    num_angles: u16,
    bins: Vec<Vec<Motion>>,
    /// MotionId -> (bin, slot)
    index: Vec<(u16, u32)>,
}

impl MotionTable {
    pub fn new(num_angles: u16) -> Self {
        Self {
            num_angles,
            bins: vec![Vec::new(); num_angles as usize],
            index: Vec::new(),
        }
    }

    /// Heading discretization the table was built for.
    #[inline]
    pub fn num_angles(&self) -> u16 {
        self.num_angles
    }

    /// Number of motions in the table.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Register a motion, assigning its id.
    pub fn push(&mut self, mut motion: Motion) -> Result<MotionId> {
        if motion.start_theta.num_angles() != self.num_angles
            || motion.end_theta.num_angles() != self.num_angles
        {
            return Err(PlannerError::Config(format!(
                "motion discretization does not match table ({} angles)",
                self.num_angles
            )));
        }
        if motion.base_cost < 1 {
            return Err(PlannerError::Config(format!(
                "motion base cost must be positive, got {}",
                motion.base_cost
            )));
        }

        let id = MotionId(self.index.len() as u32);
        motion.id = id;
        let bin = motion.start_theta.index();
        self.index.push((bin as u16, self.bins[bin].len() as u32));
        self.bins[bin].push(motion);
        Ok(id)
    }

    /// All motions starting at the given heading.
    pub fn motions_for(&self, start_theta: DiscreteAngle) -> &[Motion] {
        &self.bins[start_theta.index()]
    }

    pub fn get(&self, id: MotionId) -> &Motion {
        let (bin, slot) = self.index[id.0 as usize];
        &self.bins[bin as usize][slot as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_motion(theta: i32, num_angles: u16) -> Motion {
        let theta = DiscreteAngle::new(theta, num_angles);
        Motion {
            id: MotionId(0),
            start_theta: theta,
            end_theta: theta,
            dx: 1,
            dy: 0,
            intermediate_steps: vec![PoseWithCell {
                pose: Pose2 {
                    x: 0.0,
                    y: 0.0,
                    orientation: theta.to_radians(),
                },
                cell: CellIndex::new(0, 0),
            }],
            translational_dist: 0.1,
            angular_dist: 0.0,
            base_cost: Motion::calculate_cost(0.1, 0.0, 1.0, 1.0, 1),
            speed: 1.0,
            cost_multiplier: 1,
            kind: MotionKind::Forward,
        }
    }

    #[test]
    fn test_calculate_cost_slower_axis_dominates() {
        // 1 m at 1 m/s = 1000; half a turn at 1 rad/s dominates.
        assert_eq!(Motion::calculate_cost(1.0, 0.0, 1.0, 1.0, 1), 1000);
        assert_eq!(
            Motion::calculate_cost(1.0, 3.0, 1.0, 1.0, 1),
            3000
        );
        assert_eq!(Motion::calculate_cost(1.0, 0.0, 1.0, 1.0, 2), 2000);
    }

    #[test]
    fn test_push_assigns_dense_ids_and_bins() {
        let mut table = MotionTable::new(16);
        let a = table.push(straight_motion(0, 16)).unwrap();
        let b = table.push(straight_motion(0, 16)).unwrap();
        let c = table.push(straight_motion(3, 16)).unwrap();

        assert_eq!((a, b, c), (MotionId(0), MotionId(1), MotionId(2)));
        assert_eq!(table.len(), 3);
        assert_eq!(table.motions_for(DiscreteAngle::new(0, 16)).len(), 2);
        assert_eq!(table.motions_for(DiscreteAngle::new(3, 16)).len(), 1);
        assert_eq!(table.motions_for(DiscreteAngle::new(7, 16)).len(), 0);
        assert_eq!(table.get(c).start_theta, DiscreteAngle::new(3, 16));
    }

    #[test]
    fn test_push_rejects_bad_motions() {
        let mut table = MotionTable::new(16);

        let mut wrong_discretization = straight_motion(0, 8);
        wrong_discretization.base_cost = 100;
        assert!(table.push(wrong_discretization).is_err());

        let mut free_motion = straight_motion(0, 16);
        free_motion.base_cost = 0;
        assert!(table.push(free_motion).is_err());
    }
}
