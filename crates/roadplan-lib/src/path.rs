//! Priority-queue path search: Dijkstra and A*.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::f64::consts::SQRT_2;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cost::{edge_cost, CostProfile};
use crate::distance::{grid_approx, great_circle, planar_approx, Coordinate};
use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId};

/// Outcome of one search. `path` is empty and `cost` infinite when the
/// goal is unreachable.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub path: Vec<NodeId>,
    pub cost: f64,
    pub nodes_visited: usize,
}

impl SearchOutcome {
    pub(crate) fn trivial(node: NodeId) -> Self {
        Self {
            path: vec![node],
            cost: 0.0,
            nodes_visited: 1,
        }
    }

    pub(crate) fn unreachable(nodes_visited: usize) -> Self {
        Self {
            path: Vec::new(),
            cost: f64::INFINITY,
            nodes_visited,
        }
    }
}

/// Distance estimate used by A* to rank frontier nodes.
///
/// Every variant stays at or below the straight-line distance. `Grid` divides
/// the axis-delta sum by `sqrt(2)`, the most it can exceed the straight line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Heuristic {
    GreatCircle,
    #[default]
    Planar,
    Grid,
}

impl Heuristic {
    pub fn estimate(self, from: Coordinate, to: Coordinate) -> f64 {
        match self {
            Heuristic::GreatCircle => great_circle(from.lng, from.lat, to.lng, to.lat),
            Heuristic::Planar => planar_approx(from.lng, from.lat, to.lng, to.lat),
            Heuristic::Grid => grid_approx(from.lng, from.lat, to.lng, to.lat) / SQRT_2,
        }
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Heuristic::GreatCircle => "great-circle",
            Heuristic::Planar => "planar",
            Heuristic::Grid => "grid",
        };
        f.write_str(value)
    }
}

impl FromStr for Heuristic {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "great-circle" | "great_circle" | "haversine" => Ok(Heuristic::GreatCircle),
            "planar" | "euclidean" => Ok(Heuristic::Planar),
            "grid" | "manhattan" => Ok(Heuristic::Grid),
            _ => Err(Error::UnknownHeuristic {
                name: value.to_string(),
            }),
        }
    }
}

/// Run Dijkstra's algorithm under `profile`, stopping once `goal` is settled.
pub fn find_route_dijkstra(
    graph: &Graph,
    start: NodeId,
    goal: NodeId,
    profile: &CostProfile,
) -> SearchOutcome {
    if !graph.contains_node(start) || !graph.contains_node(goal) {
        return SearchOutcome::unreachable(0);
    }
    if start == goal {
        return SearchOutcome::trivial(start);
    }

    let mut distances: HashMap<NodeId, f64> = HashMap::new();
    let mut parents: HashMap<NodeId, NodeId> = HashMap::new();
    let mut settled: HashSet<NodeId> = HashSet::new();
    let mut queue = BinaryHeap::new();

    distances.insert(start, 0.0);
    queue.push(QueueEntry::new(start, 0.0));

    while let Some(entry) = queue.pop() {
        if !settled.insert(entry.node) {
            continue;
        }
        let current_cost = entry.cost.0;

        if entry.node == goal {
            return SearchOutcome {
                path: reconstruct_path(&parents, start, goal),
                cost: current_cost,
                nodes_visited: settled.len(),
            };
        }

        for (next, edge) in graph.neighbours(entry.node) {
            if settled.contains(&next) {
                continue;
            }
            let next_cost = current_cost + edge_cost(edge, profile);
            if next_cost < *distances.get(&next).unwrap_or(&f64::INFINITY) {
                distances.insert(next, next_cost);
                parents.insert(next, entry.node);
                queue.push(QueueEntry::new(next, next_cost));
            }
        }
    }

    SearchOutcome::unreachable(settled.len())
}

/// Run A* under `profile`, ranking the frontier by `g + h`.
///
/// `h` is the heuristic distance from a node to the goal, taken from the
/// node coordinates stored in the graph, multiplied by the cheapest cost
/// per meter any edge can have under `profile`. It is zero when either
/// coordinate is missing or when the profile has no distance floor, in which
/// case the search degenerates to Dijkstra. Nodes may be re-opened when a
/// cheaper route is found.
pub fn find_route_a_star(
    graph: &Graph,
    start: NodeId,
    goal: NodeId,
    profile: &CostProfile,
    heuristic: Heuristic,
) -> SearchOutcome {
    if !graph.contains_node(start) || !graph.contains_node(goal) {
        return SearchOutcome::unreachable(0);
    }
    if start == goal {
        return SearchOutcome::trivial(start);
    }

    let goal_position = graph.coordinate(goal);
    let per_meter = profile.min_cost_per_meter();
    let estimate = |node: NodeId| -> f64 {
        match (graph.coordinate(node), goal_position) {
            (Some(from), Some(to)) if per_meter > 0.0 => {
                per_meter * heuristic.estimate(from, to)
            }
            _ => 0.0,
        }
    };

    let mut g_score: HashMap<NodeId, f64> = HashMap::new();
    let mut parents: HashMap<NodeId, NodeId> = HashMap::new();
    let mut expanded: HashSet<NodeId> = HashSet::new();
    let mut queue = BinaryHeap::new();

    g_score.insert(start, 0.0);
    queue.push(AStarEntry::new(start, 0.0, estimate(start)));

    while let Some(entry) = queue.pop() {
        let current_score = match g_score.get(&entry.node) {
            Some(score) if *score < entry.cost.0 => continue,
            Some(score) => *score,
            None => continue,
        };
        expanded.insert(entry.node);

        if entry.node == goal {
            return SearchOutcome {
                path: reconstruct_path(&parents, start, goal),
                cost: current_score,
                nodes_visited: expanded.len(),
            };
        }

        for (next, edge) in graph.neighbours(entry.node) {
            let tentative_g = current_score + edge_cost(edge, profile);
            if tentative_g < *g_score.get(&next).unwrap_or(&f64::INFINITY) {
                g_score.insert(next, tentative_g);
                parents.insert(next, entry.node);
                queue.push(AStarEntry::new(next, tentative_g, estimate(next)));
            }
        }
    }

    SearchOutcome::unreachable(expanded.len())
}

fn reconstruct_path(parents: &HashMap<NodeId, NodeId>, start: NodeId, goal: NodeId) -> Vec<NodeId> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match parents.get(&current) {
            Some(parent) => {
                current = *parent;
                path.push(current);
            }
            None => break,
        }
    }
    path.reverse();
    path
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct QueueEntry {
    node: NodeId,
    cost: FloatOrd,
}

impl QueueEntry {
    fn new(node: NodeId, cost: f64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap by cost.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct AStarEntry {
    node: NodeId,
    cost: FloatOrd,
    estimate: FloatOrd,
}

impl AStarEntry {
    fn new(node: NodeId, cost: f64, heuristic: f64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
            estimate: FloatOrd(cost + heuristic),
        }
    }
}

impl Ord for AStarEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for AStarEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
