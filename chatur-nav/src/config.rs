//! Configuration loading for ChaturNav.

use crate::error::Result;
use crate::search::AStarConfig;
use serde::Deserialize;
use std::path::Path;

/// How the slope of the terrain under a motion enters its cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeMetric {
    /// Slope is ignored; the motion keeps its base cost.
    None,
    /// Scale the base cost by the mean slope of the swept cells.
    Avg,
    /// Scale the base cost by the steepest swept cell.
    Max,
    /// Re-derive the cost from the 3D motion length (2D length extruded by
    /// the height difference between start and end cell).
    Triangle,
}

/// Distance metric for the precomputed heuristic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum HeuristicKind {
    /// Euclidean distance in the ground plane.
    #[serde(rename = "2d")]
    TwoD,
    /// Euclidean distance including height differences.
    #[serde(rename = "3d")]
    ThreeD,
}

/// Main configuration structure.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct NavConfig {
    #[serde(default)]
    pub traversability: TraversabilityConfig,
    #[serde(default)]
    pub mobility: Mobility,
    #[serde(default)]
    pub search: AStarConfig,
}

impl NavConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

/// Terrain and robot-geometry parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct TraversabilityConfig {
    /// Side length of a traversability cell in meters (default: 0.1)
    #[serde(default = "default_grid_resolution")]
    pub grid_resolution: f64,

    /// Robot footprint length in meters (default: 0.5)
    #[serde(default = "default_robot_size_x")]
    pub robot_size_x: f64,

    /// Robot footprint width in meters (default: 0.5)
    #[serde(default = "default_robot_size_y")]
    pub robot_size_y: f64,

    /// Robot body height in meters (default: 0.5)
    #[serde(default = "default_robot_height")]
    pub robot_height: f64,

    /// Maximum climbable slope in radians (default: 0.45)
    #[serde(default = "default_max_slope")]
    pub max_slope: f64,

    /// Maximum vertical jump between adjacent cells in meters (default: 0.2)
    #[serde(default = "default_max_step_height")]
    pub max_step_height: f64,

    /// Slope above which the heading is restricted toward the fall line
    /// (default: 0.2)
    #[serde(default = "default_incline_limit_min_slope")]
    pub incline_limit_min_slope: f64,

    /// Half-width of the permitted heading band at `max_slope`, in radians
    /// (default: 0.1)
    #[serde(default = "default_incline_limit")]
    pub incline_limit: f64,

    /// Slope cost metric (default: none)
    #[serde(default = "default_slope_metric")]
    pub slope_metric: SlopeMetric,

    /// Gain of the slope cost metric (default: 1.0)
    #[serde(default = "default_slope_metric_scale")]
    pub slope_metric_scale: f64,

    /// Radius in meters within which nearby obstacles penalize a motion
    /// (default: 0.0, disabled)
    #[serde(default)]
    pub cost_obstacle_dist: f64,

    /// Cost added per obstacle cell within `cost_obstacle_dist`
    /// (default: 0.0)
    #[serde(default)]
    pub cost_obstacle_multiplier: f64,

    /// Heuristic distance metric (default: 2d)
    #[serde(default = "default_heuristic")]
    pub heuristic: HeuristicKind,

    /// Generate successors on a thread pool (default: true)
    #[serde(default = "default_parallelism_enabled")]
    pub parallelism_enabled: bool,
}

fn default_grid_resolution() -> f64 {
    0.1
}

fn default_robot_size_x() -> f64 {
    0.5
}

fn default_robot_size_y() -> f64 {
    0.5
}

fn default_robot_height() -> f64 {
    0.5
}

fn default_max_slope() -> f64 {
    0.45
}

fn default_max_step_height() -> f64 {
    0.2
}

fn default_incline_limit_min_slope() -> f64 {
    0.2
}

fn default_incline_limit() -> f64 {
    0.1
}

fn default_slope_metric() -> SlopeMetric {
    SlopeMetric::None
}

fn default_slope_metric_scale() -> f64 {
    1.0
}

fn default_heuristic() -> HeuristicKind {
    HeuristicKind::TwoD
}

fn default_parallelism_enabled() -> bool {
    true
}

impl Default for TraversabilityConfig {
    fn default() -> Self {
        Self {
            grid_resolution: default_grid_resolution(),
            robot_size_x: default_robot_size_x(),
            robot_size_y: default_robot_size_y(),
            robot_height: default_robot_height(),
            max_slope: default_max_slope(),
            max_step_height: default_max_step_height(),
            incline_limit_min_slope: default_incline_limit_min_slope(),
            incline_limit: default_incline_limit(),
            slope_metric: default_slope_metric(),
            slope_metric_scale: default_slope_metric_scale(),
            cost_obstacle_dist: 0.0,
            cost_obstacle_multiplier: 0.0,
            heuristic: default_heuristic(),
            parallelism_enabled: default_parallelism_enabled(),
        }
    }
}

/// Velocity limits of the platform.
#[derive(Clone, Debug, Deserialize)]
pub struct Mobility {
    /// Nominal translational speed in m/s (default: 1.0)
    #[serde(default = "default_translation_speed")]
    pub translation_speed: f64,

    /// Nominal turning speed in rad/s (default: 1.0)
    #[serde(default = "default_turning_speed")]
    pub turning_speed: f64,
}

fn default_translation_speed() -> f64 {
    1.0
}

fn default_turning_speed() -> f64 {
    1.0
}

impl Default for Mobility {
    fn default() -> Self {
        Self {
            translation_speed: default_translation_speed(),
            turning_speed: default_turning_speed(),
        }
    }
}
