// Canned planning results shared by renderer tests.
use roadplan_lib::{
    AlgorithmDetails, AlgorithmMetrics, Coordinate, Heuristic, PlanResult, RouteAlgorithm,
};

fn metrics(algorithm: RouteAlgorithm) -> AlgorithmMetrics {
    let details = match algorithm {
        RouteAlgorithm::Dijkstra => AlgorithmDetails::Dijkstra,
        RouteAlgorithm::AStar => AlgorithmDetails::AStar {
            heuristic: Heuristic::Planar,
        },
        RouteAlgorithm::Pso => AlgorithmDetails::Pso {
            population_size: 50,
            max_iterations: 100,
            iterations: 12,
            inertia_weight: 0.7,
            cognitive_weight: 1.5,
            social_weight: 1.5,
            final_fitness: 10_150.0,
            improved_iterations: 2,
        },
    };
    AlgorithmMetrics {
        algorithm,
        execution_time_ms: 0.25,
        nodes_visited: 4,
        details,
    }
}

/// A three-node route between the two sample addresses.
pub fn plan(algorithm: RouteAlgorithm) -> PlanResult {
    PlanResult {
        success: true,
        algorithm,
        start_address: "Xiangtan University".to_string(),
        end_address: "Wanda Plaza".to_string(),
        start_coord: Coordinate::new(27.882, 112.864),
        end_coord: Coordinate::new(27.829, 112.944),
        start_node: 1,
        end_node: 3,
        path: vec![1, 2, 3],
        cost: 10_150.0,
        requested_cost: None,
        breakdown: None,
        path_distance: Some(10_150.0),
        metrics: metrics(algorithm),
        from_cache: false,
        route_coordinates: vec![
            Coordinate::new(27.882, 112.864),
            Coordinate::new(27.855, 112.905),
            Coordinate::new(27.829, 112.944),
        ],
    }
}

/// The answer for a pair whose graph does not connect the endpoints.
pub fn unreachable_plan() -> PlanResult {
    PlanResult {
        success: false,
        path: Vec::new(),
        cost: f64::INFINITY,
        path_distance: None,
        route_coordinates: Vec::new(),
        ..plan(RouteAlgorithm::Dijkstra)
    }
}
