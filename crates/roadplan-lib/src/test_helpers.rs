// Test-only helpers for `roadplan-lib` tests
#![allow(dead_code)]

use crate::distance::Coordinate;
use crate::graph::{EdgeAttributes, Graph, NodeId};
use crate::providers::RouteVariant;

/// Route variant over `(lat, lng)` points with zeroed provider figures.
pub fn variant(route_type: &str, points: &[(f64, f64)]) -> RouteVariant {
    RouteVariant {
        coords: points
            .iter()
            .map(|&(lat, lng)| Coordinate::new(lat, lng))
            .collect(),
        distance: 0.0,
        duration: 0.0,
        route_type: route_type.to_string(),
        route_name: String::new(),
    }
}

/// `{1<->2: 100, 2<->3: 150, 1<->3: 300}`.
pub fn triangle() -> Graph {
    Graph::from_distances(&[(1, 2, 100.0), (2, 3, 150.0), (1, 3, 300.0)])
}

/// `{1<->2: 100}` and `{3<->4: 150}` with no link between them.
pub fn two_components() -> Graph {
    Graph::from_distances(&[(1, 2, 100.0), (3, 4, 150.0)])
}

/// Graph whose nodes lie on one meridian so every heuristic stays below the
/// edge distances.
pub fn meridian_graph(edges: &[(NodeId, NodeId)], latitudes: &[(NodeId, f64)]) -> Graph {
    let mut graph = Graph::new();
    for &(node, lat) in latitudes {
        graph.add_node(node, Some(Coordinate::new(lat, 112.0)));
    }
    for &(a, b) in edges {
        let (Some(ca), Some(cb)) = (graph.coordinate(a), graph.coordinate(b)) else {
            continue;
        };
        graph.insert_edge(a, b, EdgeAttributes::with_distance(ca.distance_to(&cb)));
    }
    graph
}
