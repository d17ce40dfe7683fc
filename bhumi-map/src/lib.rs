//! # Bhumi-Map: Multi-Level Surface Elevation Grid
//!
//! A 2.5D+ elevation map for outdoor robot navigation on uneven terrain.
//! Each (x, y) cell of the grid holds a vertically ordered list of surface
//! patches, so bridges, overhangs and multi-storey structures can be
//! represented without flattening them into a single height value.
//!
//! ## Quick Start
//!
//! ```rust
//! use bhumi_map::{CellIndex, MlsGrid, SurfacePatch};
//! use nalgebra::{Vector2, Vector3};
//!
//! // A 10 x 10 grid with 0.1 m cells, origin at the world origin.
//! let mut grid = MlsGrid::new(10, 10, 0.1, Vector2::zeros());
//! grid.add_patch(CellIndex::new(3, 4), SurfacePatch::thin(0.25));
//!
//! let idx = grid.to_grid(&Vector3::new(0.35, 0.45, 0.0)).unwrap();
//! assert_eq!(idx, CellIndex::new(3, 4));
//! assert_eq!(grid.patches(idx).len(), 1);
//! ```
//!
//! ## Coordinate Frame
//!
//! Coordinates follow the ROS REP-103 convention: X-forward, Y-left, Z-up,
//! distances in meters. Grid indices are signed; `(0, 0)` is the cell whose
//! minimum corner coincides with the grid origin.
//!
//! ## Modules
//!
//! - [`cell`]: Signed 2D cell indices
//! - [`bounds`]: 3D axis-aligned bounding boxes
//! - [`patch`]: Vertical surface intervals
//! - [`grid`]: The multi-level surface grid container

pub mod bounds;
pub mod cell;
pub mod grid;
pub mod patch;

pub use bounds::Aabb3;
pub use cell::CellIndex;
pub use grid::MlsGrid;
pub use patch::SurfacePatch;
