//! The planner facade: map in, trajectory out.

use std::sync::Arc;

use bhumi_map::MlsGrid;
use nalgebra::Vector3;

use crate::config::NavConfig;
use crate::error::{PlannerError, Result};
use crate::motion::{Motion, MotionTable};
use crate::search::{self, NavEnvironment, StateId, TrajectorySegment};

/// A complete plan from start to goal.
#[derive(Clone, Debug)]
pub struct PlannedPath {
    /// Visited states, start and goal inclusive.
    pub states: Vec<StateId>,
    /// The motion primitives executing the path.
    pub motions: Vec<Motion>,
    /// World-space trajectory, one segment per motion, speeds signed by
    /// direction.
    pub segments: Vec<TrajectorySegment>,
    /// Total integer cost of the path.
    pub cost: i64,
}

/// Owns the planning environment and drives the search.
///
/// The environment is created when the first elevation map arrives and
/// kept across map updates as long as the resolution does not change.
pub struct Planner {
    config: NavConfig,
    motions: Arc<MotionTable>,
    env: Option<NavEnvironment>,
}

impl Planner {
    pub fn new(config: NavConfig, motions: MotionTable) -> Self {
        Self {
            config,
            motions: Arc::new(motions),
            env: None,
        }
    }

    /// Feed a new elevation map. Everything derived from the previous map
    /// is dropped.
    pub fn update_map(&mut self, mls: Arc<MlsGrid>) -> Result<()> {
        match &mut self.env {
            Some(env) => env.update_map(mls),
            None => {
                let env = NavEnvironment::new(
                    mls,
                    self.config.traversability.clone(),
                    self.config.mobility.clone(),
                    self.motions.clone(),
                )?;
                self.env = Some(env);
                Ok(())
            }
        }
    }

    /// The current environment, if a map has been set.
    pub fn env(&self) -> Option<&NavEnvironment> {
        self.env.as_ref()
    }

    /// Plan from a start pose to a goal pose.
    ///
    /// Returns `Ok(None)` when the goal is unreachable; start or goal
    /// poses that are off the map, in collision or on a forbidden slope
    /// are errors.
    pub fn plan(
        &mut self,
        start: &Vector3<f64>,
        start_yaw: f64,
        goal: &Vector3<f64>,
        goal_yaw: f64,
    ) -> Result<Option<PlannedPath>> {
        let env = self
            .env
            .as_mut()
            .ok_or_else(|| PlannerError::Config("no elevation map was set".into()))?;

        env.set_start(start, start_yaw)?;
        env.set_goal(goal, goal_yaw)?;

        let Some(result) = search::find_path(&*env, &self.config.search)? else {
            tracing::info!("no path found");
            return Ok(None);
        };
        tracing::info!(
            "path with {} motions, cost {}, {} states expanded",
            result.states.len().saturating_sub(1),
            result.cost,
            result.expanded
        );

        let motions = env.motions_along(&result.states)?;
        let segments = env.trajectory(&result.states)?;
        Ok(Some(PlannedPath {
            states: result.states,
            motions,
            segments,
            cost: result.cost,
        }))
    }
}
