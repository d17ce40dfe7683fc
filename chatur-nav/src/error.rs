//! Error types for ChaturNav.

use thiserror::Error;

/// ChaturNav error type.
///
/// `OutOfGrid` and `NotTraversable` are client errors surfaced when placing
/// the start or goal pose. `Internal` indicates a violated invariant,
/// usually a mismatch between the map and the configuration the planner was
/// built with; it aborts the plan.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("pose ({0:.3}, {1:.3}, {2:.3}) is outside the map")]
    OutOfGrid(f64, f64, f64),

    #[error("pose is not traversable: {0}")]
    NotTraversable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl From<toml::de::Error> for PlannerError {
    fn from(e: toml::de::Error) -> Self {
        PlannerError::Config(e.to_string())
    }
}

impl From<std::io::Error> for PlannerError {
    fn from(e: std::io::Error) -> Self {
        PlannerError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
