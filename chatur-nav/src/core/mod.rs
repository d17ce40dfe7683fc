//! Core geometric types for the planner.
//!
//! - [`DiscreteAngle`]: a heading binned into N sectors of the full circle
//! - [`Hyperplane`]: an infinite oriented plane in 3D
//! - [`ransac`]: robust plane fitting from surface samples

pub mod angle;
pub mod plane;
pub mod ransac;

pub use angle::DiscreteAngle;
pub use plane::Hyperplane;
