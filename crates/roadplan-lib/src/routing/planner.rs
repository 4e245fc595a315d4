//! Configured planners as a closed set of variants.
//!
//! [`RoutePlanner`] replaces open-ended dynamic dispatch with one enum whose
//! variants carry their own configuration. [`AlgorithmRegistry`] maps each
//! [`RouteAlgorithm`] identifier to its configured planner; adding an
//! algorithm means adding a variant here and an identifier in the parent
//! module.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::cost::CostProfile;
use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId};
use crate::path::{find_route_a_star, find_route_dijkstra, Heuristic};
use crate::pso::{find_route_pso, PsoConfig};

use super::{AlgorithmDetails, AlgorithmMetrics, AlgorithmResult, RouteAlgorithm};

/// A search algorithm together with its configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutePlanner {
    Dijkstra,
    AStar { heuristic: Heuristic },
    Pso(PsoConfig),
}

impl RoutePlanner {
    /// The algorithm identifier for this planner.
    pub fn algorithm(&self) -> RouteAlgorithm {
        match self {
            RoutePlanner::Dijkstra => RouteAlgorithm::Dijkstra,
            RoutePlanner::AStar { .. } => RouteAlgorithm::AStar,
            RoutePlanner::Pso(_) => RouteAlgorithm::Pso,
        }
    }

    /// Run under the algorithm's fixed cost profile.
    pub fn run(&self, graph: &Graph, start: NodeId, goal: NodeId) -> AlgorithmResult {
        self.find_path(graph, start, goal, &self.algorithm().cost_profile())
    }

    /// Run under an explicit cost profile.
    ///
    /// `start == goal` yields `([start], 0)`; unknown endpoints and
    /// unreachable goals yield an empty path with infinite cost.
    pub fn find_path(
        &self,
        graph: &Graph,
        start: NodeId,
        goal: NodeId,
        profile: &CostProfile,
    ) -> AlgorithmResult {
        let started = Instant::now();
        let (outcome, details) = match self {
            RoutePlanner::Dijkstra => (
                find_route_dijkstra(graph, start, goal, profile),
                AlgorithmDetails::Dijkstra,
            ),
            RoutePlanner::AStar { heuristic } => (
                find_route_a_star(graph, start, goal, profile, *heuristic),
                AlgorithmDetails::AStar {
                    heuristic: *heuristic,
                },
            ),
            RoutePlanner::Pso(config) => {
                let outcome = find_route_pso(graph, start, goal, profile, config);
                let details = AlgorithmDetails::Pso {
                    population_size: config.population_size,
                    max_iterations: config.max_iterations,
                    iterations: outcome.iterations,
                    inertia_weight: config.inertia_weight,
                    cognitive_weight: config.cognitive_weight,
                    social_weight: config.social_weight,
                    final_fitness: outcome.final_fitness,
                    improved_iterations: outcome.improved_iterations,
                };
                (outcome.search, details)
            }
        };
        let execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        tracing::debug!(
            algorithm = %self.algorithm(),
            start,
            goal,
            cost = outcome.cost,
            hops = outcome.path.len().saturating_sub(1),
            nodes_visited = outcome.nodes_visited,
            "algorithm finished"
        );

        AlgorithmResult {
            path: outcome.path,
            cost: outcome.cost,
            metrics: AlgorithmMetrics {
                algorithm: self.algorithm(),
                execution_time_ms,
                nodes_visited: outcome.nodes_visited,
                details,
            },
        }
    }
}

/// Maps algorithm identifiers to configured planners.
#[derive(Debug, Clone)]
pub struct AlgorithmRegistry {
    planners: BTreeMap<RouteAlgorithm, RoutePlanner>,
}

impl AlgorithmRegistry {
    /// Registry holding every algorithm.
    pub fn new(heuristic: Heuristic, pso: PsoConfig) -> Self {
        let planners = [
            RoutePlanner::Dijkstra,
            RoutePlanner::AStar { heuristic },
            RoutePlanner::Pso(pso),
        ]
        .into_iter()
        .map(|planner| (planner.algorithm(), planner))
        .collect();
        Self { planners }
    }

    /// Replace the planner registered for its algorithm.
    pub fn register(&mut self, planner: RoutePlanner) {
        self.planners.insert(planner.algorithm(), planner);
    }

    pub fn get(&self, algorithm: RouteAlgorithm) -> Option<&RoutePlanner> {
        self.planners.get(&algorithm)
    }

    /// Resolve a textual identifier such as `"a-star"`.
    pub fn lookup(&self, name: &str) -> Result<&RoutePlanner> {
        let algorithm: RouteAlgorithm = name.parse()?;
        self.get(algorithm).ok_or_else(|| Error::UnknownAlgorithm {
            name: name.to_string(),
        })
    }

    /// Identifiers of the registered algorithms.
    pub fn available(&self) -> Vec<RouteAlgorithm> {
        self.planners.keys().copied().collect()
    }

    /// Run every registered planner in identifier order.
    pub fn run_all(
        &self,
        graph: &Graph,
        start: NodeId,
        goal: NodeId,
    ) -> BTreeMap<RouteAlgorithm, AlgorithmResult> {
        self.planners
            .iter()
            .map(|(algorithm, planner)| (*algorithm, planner.run(graph, start, goal)))
            .collect()
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::new(Heuristic::default(), PsoConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{triangle, two_components};

    fn registry() -> AlgorithmRegistry {
        AlgorithmRegistry::new(
            Heuristic::GreatCircle,
            PsoConfig {
                seed: Some(5),
                ..PsoConfig::default()
            },
        )
    }

    #[test]
    fn registry_lists_every_algorithm() {
        assert_eq!(registry().available(), RouteAlgorithm::ALL.to_vec());
        assert_eq!(
            registry().lookup("a-star").unwrap().algorithm(),
            RouteAlgorithm::AStar
        );
        assert!(registry().lookup("genetic").is_err());
    }

    #[test]
    fn every_planner_honours_the_shared_contract() {
        let registry = registry();
        let profile = CostProfile::distance_only();
        for algorithm in RouteAlgorithm::ALL {
            let planner = registry.get(algorithm).expect("registered");

            let result = planner.find_path(&triangle(), 1, 3, &profile);
            assert_eq!(result.path, vec![1, 2, 3], "{algorithm}");
            assert_eq!(result.cost, 250.0, "{algorithm}");
            assert_eq!(result.metrics.algorithm, algorithm);

            let result = planner.find_path(&triangle(), 2, 2, &profile);
            assert_eq!((result.path, result.cost), (vec![2], 0.0), "{algorithm}");

            let result = planner.find_path(&two_components(), 1, 4, &profile);
            assert!(result.path.is_empty(), "{algorithm}");
            assert!(result.cost.is_infinite(), "{algorithm}");
        }
    }

    #[test]
    fn run_all_reports_details_per_algorithm() {
        let results = registry().run_all(&triangle(), 1, 3);
        assert_eq!(results.len(), 3);
        assert!(matches!(
            results[&RouteAlgorithm::AStar].metrics.details,
            AlgorithmDetails::AStar {
                heuristic: Heuristic::GreatCircle
            }
        ));
        match &results[&RouteAlgorithm::Pso].metrics.details {
            AlgorithmDetails::Pso {
                population_size,
                iterations,
                ..
            } => {
                assert_eq!(*population_size, 50);
                assert!(*iterations > 0);
            }
            other => panic!("unexpected details {other:?}"),
        }
    }
}
