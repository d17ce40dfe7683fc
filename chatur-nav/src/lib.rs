//! # Chatur-Nav: 4D Path Planning on Uneven Terrain
//!
//! A motion-primitive path planner for ground robots on 3D terrain. The
//! planner searches in (x, y, z, heading): it lazily grows a 3D
//! traversability graph out of a multi-level elevation map, layers
//! discrete headings on top, and drives a weighted A* over precomputed
//! motion primitives. Slope limits, step heights, heading restrictions on
//! inclines and swept-volume collisions are all enforced while successors
//! are generated.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bhumi_map::MlsGrid;
//! use chatur_nav::{MotionTable, NavConfig, Planner};
//! use nalgebra::{Vector2, Vector3};
//!
//! let config = NavConfig::default();
//! let motions = MotionTable::new(16); // filled from a primitive library
//! let mut planner = Planner::new(config, motions);
//!
//! let map = MlsGrid::new(100, 100, 0.1, Vector2::zeros());
//! planner.update_map(Arc::new(map)).unwrap();
//!
//! let path = planner
//!     .plan(&Vector3::new(0.5, 0.5, 0.0), 0.0, &Vector3::new(8.0, 6.0, 0.0), 0.0)
//!     .unwrap();
//! if let Some(path) = path {
//!     println!("{} motions, cost {}", path.motions.len(), path.cost);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: discrete headings, planes, RANSAC plane fitting
//! - [`trav`]: the lazy traversability graph and its builder
//! - [`motion`]: the motion-primitive table the planner consumes
//! - [`search`]: the XYZθ environment, collision engine, heuristic
//!   precomputation and the A* driver
//! - [`planner`]: the facade tying everything together
//!
//! Successor generation optionally runs on a work-stealing thread pool;
//! everything else is single threaded.

pub mod config;
pub mod core;
pub mod error;
pub mod motion;
pub mod planner;
pub mod search;
pub mod trav;

pub use config::{HeuristicKind, Mobility, NavConfig, SlopeMetric, TraversabilityConfig};
pub use crate::core::{DiscreteAngle, Hyperplane};
pub use error::{PlannerError, Result};
pub use motion::{Motion, MotionId, MotionKind, MotionTable, Pose2, PoseWithCell};
pub use planner::{PlannedPath, Planner};
pub use search::{
    find_path, AStarConfig, NavEnvironment, SearchResult, SearchSpace, State, StateId, Successor,
    TrajectorySegment,
};
pub use trav::{NodeId, NodeKind, TravBuilder, TravMap, TravNode};
