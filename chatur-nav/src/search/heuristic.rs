//! Dijkstra precomputation of per-node distances to the terminals.
//!
//! After the traversability graph is fully expanded, one Dijkstra run per
//! terminal caches the shortest surface distance from every node, turning
//! heuristic queries into O(1) lookups.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::config::HeuristicKind;
use crate::trav::{NodeId, TravMap};

/// Distance assigned to unreachable nodes. Large enough to never occur on
/// a real map, small enough not to overflow when added into costs.
pub const MAX_DIST: f64 = 99_999.0;

/// Cached distances of one traversability node to both terminals.
#[derive(Clone, Copy, Debug)]
pub struct Distance {
    pub to_start: f64,
    pub to_goal: f64,
}

/// Entry of the Dijkstra priority queue.
struct QueueEntry {
    dist: f64,
    id: NodeId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist
    }
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (lower distance = higher priority)
        other
            .dist
            .partial_cmp(&self.dist)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest distance from `source` to every node of the graph, walking
/// only traversable or frontier nodes. Unreached nodes keep [`MAX_DIST`].
///
/// Edge weights are Euclidean distances between grid-origin-relative cell
/// positions at the nodes' heights, in 2D or 3D depending on `metric`.
pub(crate) fn shortest_distances(
    map: &TravMap,
    source: NodeId,
    metric: HeuristicKind,
) -> Vec<f64> {
    let inner = map.read();
    let resolution = map.resolution();

    let mut distances = vec![MAX_DIST; inner.nodes.len()];
    distances[source.index()] = 0.0;

    let node_pos = |id: NodeId| {
        let node = &inner.nodes[id.index()];
        (
            node.index.x as f64 * resolution,
            node.index.y as f64 * resolution,
            node.height,
        )
    };

    let mut queue = BinaryHeap::new();
    queue.push(QueueEntry {
        dist: 0.0,
        id: source,
    });

    while let Some(entry) = queue.pop() {
        if entry.dist > distances[entry.id.index()] {
            continue; // stale entry
        }
        let (ux, uy, uz) = node_pos(entry.id);

        for &v in &inner.nodes[entry.id.index()].neighbors {
            if !inner.nodes[v.index()].kind.is_routable() {
                continue;
            }
            let (vx, vy, vz) = node_pos(v);
            let weight = match metric {
                HeuristicKind::TwoD => ((ux - vx).powi(2) + (uy - vy).powi(2)).sqrt(),
                HeuristicKind::ThreeD => {
                    ((ux - vx).powi(2) + (uy - vy).powi(2) + (uz - vz).powi(2)).sqrt()
                }
            };
            let through_u = entry.dist + weight;
            if through_u < distances[v.index()] {
                distances[v.index()] = through_u;
                queue.push(QueueEntry {
                    dist: through_u,
                    id: v,
                });
            }
        }
    }

    distances
}
