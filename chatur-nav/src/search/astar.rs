//! Weighted A* driver over a [`SearchSpace`].

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use serde::Deserialize;

use crate::error::Result;

use super::{SearchSpace, StateId};

/// Configuration for the weighted A* search.
#[derive(Clone, Debug, Deserialize)]
pub struct AStarConfig {
    /// Inflation factor on the heuristic; 1.0 is optimal A*, larger values
    /// trade optimality for speed (default: 1.0)
    #[serde(default = "default_heuristic_weight")]
    pub heuristic_weight: f64,

    /// Maximum state expansions before giving up (default: 1000000)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_heuristic_weight() -> f64 {
    1.0
}

fn default_max_iterations() -> usize {
    1_000_000
}

impl Default for AStarConfig {
    fn default() -> Self {
        Self {
            heuristic_weight: default_heuristic_weight(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// A found path through the search space.
#[derive(Clone, Debug)]
pub struct SearchResult {
    /// State ids from start to goal, inclusive.
    pub states: Vec<StateId>,
    /// Summed motion costs.
    pub cost: i64,
    /// Number of states expanded during the search.
    pub expanded: usize,
}

/// Node in the open list.
struct OpenNode {
    id: StateId,
    g: i64,
    f: i64,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f
    }
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (lower f = higher priority)
        other.f.cmp(&self.f)
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Search the space from its start state to its goal state.
///
/// Returns `None` when the goal is unreachable or the iteration budget is
/// exhausted; oracle errors abort the search.
pub fn find_path<S: SearchSpace>(space: &S, config: &AStarConfig) -> Result<Option<SearchResult>> {
    let (start, goal) = space.initial_ids()?;

    let mut open = BinaryHeap::new();
    let mut g_scores: HashMap<StateId, i64> = HashMap::new();
    let mut came_from: HashMap<StateId, StateId> = HashMap::new();
    let mut closed: HashSet<StateId> = HashSet::new();

    let h_start = weigh(space.heuristic_to_goal(start)?, config.heuristic_weight);
    g_scores.insert(start, 0);
    open.push(OpenNode {
        id: start,
        g: 0,
        f: h_start,
    });

    let mut expanded = 0usize;
    while let Some(current) = open.pop() {
        if current.id == goal {
            return Ok(Some(SearchResult {
                states: reconstruct_path(&came_from, goal),
                cost: current.g,
                expanded,
            }));
        }
        if !closed.insert(current.id) {
            continue;
        }

        expanded += 1;
        if expanded > config.max_iterations {
            tracing::warn!("search exceeded {} expansions", config.max_iterations);
            return Ok(None);
        }

        for successor in space.successors(current.id)? {
            if closed.contains(&successor.state) {
                continue;
            }
            let tentative = current.g + successor.cost as i64;
            if tentative < *g_scores.get(&successor.state).unwrap_or(&i64::MAX) {
                g_scores.insert(successor.state, tentative);
                came_from.insert(successor.state, current.id);
                let h = weigh(
                    space.heuristic_to_goal(successor.state)?,
                    config.heuristic_weight,
                );
                open.push(OpenNode {
                    id: successor.state,
                    g: tentative,
                    f: tentative + h,
                });
            }
        }
    }

    Ok(None)
}

#[inline]
fn weigh(heuristic: i32, weight: f64) -> i64 {
    (heuristic as f64 * weight) as i64
}

fn reconstruct_path(came_from: &HashMap<StateId, StateId>, goal: StateId) -> Vec<StateId> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&previous) = came_from.get(&current) {
        path.push(previous);
        current = previous;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlannerError;
    use crate::motion::MotionId;
    use crate::search::Successor;

    /// A straight corridor of `n` states with unit edges and an exact
    /// heuristic, plus an expensive shortcut edge for tie-breaking tests.
    struct Corridor {
        n: u32,
    }

    impl SearchSpace for Corridor {
        fn initial_ids(&self) -> Result<(StateId, StateId)> {
            Ok((StateId(0), StateId(self.n - 1)))
        }

        fn heuristic_to_goal(&self, state: StateId) -> Result<i32> {
            Ok(((self.n - 1 - state.0) * 100) as i32)
        }

        fn heuristic_to_start(&self, state: StateId) -> Result<i32> {
            Ok((state.0 * 100) as i32)
        }

        fn successors(&self, state: StateId) -> Result<Vec<Successor>> {
            let mut successors = Vec::new();
            if state.0 + 1 < self.n {
                successors.push(Successor {
                    state: StateId(state.0 + 1),
                    cost: 100,
                    motion: MotionId(0),
                });
            }
            // expensive jump two ahead, never worth taking
            if state.0 + 2 < self.n {
                successors.push(Successor {
                    state: StateId(state.0 + 2),
                    cost: 300,
                    motion: MotionId(1),
                });
            }
            Ok(successors)
        }
    }

    #[test]
    fn test_finds_optimal_path() {
        let space = Corridor { n: 5 };
        let result = find_path(&space, &AStarConfig::default()).unwrap().unwrap();
        assert_eq!(result.cost, 400);
        assert_eq!(
            result.states,
            (0..5).map(StateId).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_iteration_budget() {
        let space = Corridor { n: 100 };
        let config = AStarConfig {
            max_iterations: 3,
            ..AStarConfig::default()
        };
        assert!(find_path(&space, &config).unwrap().is_none());
    }

    #[test]
    fn test_start_is_goal() {
        let space = Corridor { n: 1 };
        let result = find_path(&space, &AStarConfig::default()).unwrap().unwrap();
        assert_eq!(result.states, vec![StateId(0)]);
        assert_eq!(result.cost, 0);
    }

    struct Broken;

    impl SearchSpace for Broken {
        fn initial_ids(&self) -> Result<(StateId, StateId)> {
            Ok((StateId(0), StateId(1)))
        }

        fn heuristic_to_goal(&self, _: StateId) -> Result<i32> {
            Ok(0)
        }

        fn heuristic_to_start(&self, _: StateId) -> Result<i32> {
            Ok(0)
        }

        fn successors(&self, _: StateId) -> Result<Vec<Successor>> {
            Err(PlannerError::Internal("boom".into()))
        }
    }

    #[test]
    fn test_oracle_errors_abort() {
        assert!(find_path(&Broken, &AStarConfig::default()).is_err());
    }
}
