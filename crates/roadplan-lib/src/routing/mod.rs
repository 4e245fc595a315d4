//! Algorithm identifiers, results and dispatch.
//!
//! This module provides:
//! - [`RouteAlgorithm`] - Supported search algorithms (Dijkstra, A*, PSO)
//! - [`AlgorithmResult`] - Path, cost and metrics produced by one run
//! - [`RoutePlanner`] - Closed set of configured planners behind one `run`
//! - [`AlgorithmRegistry`] - Identifier to planner lookup used by the engine
//!
//! Every planner searches under its own fixed [`CostProfile`], so results of
//! different algorithms are comparable by total cost only.

mod planner;

pub use planner::{AlgorithmRegistry, RoutePlanner};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cost::{infinite_as_null, CostProfile};
use crate::error::{Error, Result};
use crate::graph::NodeId;
use crate::path::Heuristic;

/// Supported search algorithms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RouteAlgorithm {
    /// Dijkstra's algorithm over distance only.
    #[default]
    Dijkstra,
    /// A* search over distance and congestion.
    #[serde(rename = "astar", alias = "a-star", alias = "a_star")]
    AStar,
    /// Particle swarm optimisation over all objectives.
    Pso,
}

impl RouteAlgorithm {
    /// Every algorithm, in the order results are computed and reported.
    pub const ALL: [RouteAlgorithm; 3] = [
        RouteAlgorithm::Dijkstra,
        RouteAlgorithm::AStar,
        RouteAlgorithm::Pso,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RouteAlgorithm::Dijkstra => "dijkstra",
            RouteAlgorithm::AStar => "astar",
            RouteAlgorithm::Pso => "pso",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            RouteAlgorithm::Dijkstra => "Dijkstra",
            RouteAlgorithm::AStar => "A*",
            RouteAlgorithm::Pso => "PSO",
        }
    }

    /// One-line description suitable for listings.
    pub fn description(self) -> &'static str {
        match self {
            RouteAlgorithm::Dijkstra => {
                "Classic shortest-path search; optimal for non-negative edge weights."
            }
            RouteAlgorithm::AStar => {
                "Heuristic-guided search; expands fewer nodes than Dijkstra and finds the same optimal cost."
            }
            RouteAlgorithm::Pso => {
                "Stochastic particle swarm over whole paths; handles multiple objectives but may settle on a local optimum."
            }
        }
    }

    /// Fixed objective set and weights this algorithm searches under.
    pub fn cost_profile(self) -> CostProfile {
        match self {
            RouteAlgorithm::Dijkstra => CostProfile::distance_only(),
            RouteAlgorithm::AStar => CostProfile::distance_and_congestion(),
            RouteAlgorithm::Pso => CostProfile::all_objectives(),
        }
    }
}

impl fmt::Display for RouteAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteAlgorithm {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dijkstra" => Ok(RouteAlgorithm::Dijkstra),
            "astar" | "a-star" | "a_star" => Ok(RouteAlgorithm::AStar),
            "pso" => Ok(RouteAlgorithm::Pso),
            _ => Err(Error::UnknownAlgorithm {
                name: value.to_string(),
            }),
        }
    }
}

/// Algorithm-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlgorithmDetails {
    Dijkstra,
    #[serde(rename = "astar")]
    AStar { heuristic: Heuristic },
    Pso {
        population_size: usize,
        max_iterations: usize,
        iterations: usize,
        inertia_weight: f64,
        cognitive_weight: f64,
        social_weight: f64,
        #[serde(with = "infinite_as_null")]
        final_fitness: f64,
        improved_iterations: usize,
    },
}

/// Metrics recorded for one algorithm run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmMetrics {
    pub algorithm: RouteAlgorithm,
    pub execution_time_ms: f64,
    pub nodes_visited: usize,
    pub details: AlgorithmDetails,
}

/// Immutable result of one algorithm run. An empty path with infinite cost
/// means the goal was unreachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmResult {
    pub path: Vec<NodeId>,
    #[serde(with = "infinite_as_null")]
    pub cost: f64,
    pub metrics: AlgorithmMetrics,
}

impl AlgorithmResult {
    pub fn is_reachable(&self) -> bool {
        !self.path.is_empty() && self.cost.is_finite()
    }
}
