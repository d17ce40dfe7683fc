//! The XYZθ search space and its supporting engines.
//!
//! [`NavEnvironment`] layers discrete headings on top of the traversability
//! graph and implements the oracle a best-first graph search queries:
//! successors, heuristic-to-goal and heuristic-to-start. [`astar`] is a
//! weighted-A* driver over that oracle.

pub mod astar;
pub mod collision;
pub mod environment;
pub mod heuristic;

pub use astar::{find_path, AStarConfig, SearchResult};
pub use environment::{NavEnvironment, State, TrajectorySegment};

use crate::error::Result;
use crate::motion::MotionId;

/// Dense identifier of a planning state (a traversability node plus a
/// discrete heading).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

/// One outgoing edge of a planning state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Successor {
    pub state: StateId,
    /// Integer motion cost, at least the motion's base cost.
    pub cost: i32,
    pub motion: MotionId,
}

/// The oracle interface a graph-search driver plans against.
///
/// Successor order is unspecified; costs are deterministic per
/// (state, motion). Heuristics are non-negative and admissible under the
/// assumption that the robot rotates while translating.
pub trait SearchSpace {
    /// The start and goal state ids. Both poses must have been set.
    fn initial_ids(&self) -> Result<(StateId, StateId)>;

    /// Lower bound on the remaining cost from `state` to the goal.
    fn heuristic_to_goal(&self, state: StateId) -> Result<i32>;

    /// Lower bound on the cost from the start to `state`.
    fn heuristic_to_start(&self, state: StateId) -> Result<i32>;

    /// All feasible motions out of `state`.
    fn successors(&self, state: StateId) -> Result<Vec<Successor>>;
}
