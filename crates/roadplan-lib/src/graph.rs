//! Routing graph and its synthesis from multi-route driving directions.
//!
//! A [`Graph`] is built per planning request from the polylines of every
//! route variant the directions provider returned. Polyline vertices become
//! nodes (deduplicated after rounding to six decimal places), consecutive
//! vertices become bidirectional edges, and each variant stamps a synthetic
//! congestion level on the edges it introduces so cost-aware algorithms have
//! a reason to prefer one variant over another.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::distance::{great_circle, Coordinate};
use crate::error::{Error, Result};
use crate::providers::RouteVariant;

/// Identifier of a node within one synthesized graph. Ids start at 1.
pub type NodeId = u32;

/// Decimal places kept when deduplicating polyline vertices.
const COORDINATE_PRECISION: i32 = 6;

/// Congestion stamped on waypoint detours so multi-objective searches favour them.
const WAYPOINT_CONGESTION: f64 = 0.15;
const DIRECT_CONGESTION: f64 = 0.30;
const DEFAULT_CONGESTION: f64 = 0.30;

/// Attributes carried by every directed edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeAttributes {
    /// Great-circle length in meters.
    pub distance: f64,
    /// Synthetic congestion level in `[0, 1]`.
    pub congestion: f64,
    #[serde(default)]
    pub construction: bool,
    /// Tag of the route variant that introduced the edge.
    #[serde(default)]
    pub source_route: String,
}

impl EdgeAttributes {
    /// Plain distance-only edge, mostly useful for hand-built graphs.
    pub fn with_distance(distance: f64) -> Self {
        Self {
            distance,
            congestion: 0.0,
            construction: false,
            source_route: String::new(),
        }
    }
}

/// Logically undirected routing graph.
///
/// Every edge is stored in both directions with identical attributes. Node
/// iteration order is ascending by id, which keeps every algorithm
/// deterministic for a given graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    adjacency: BTreeMap<NodeId, BTreeMap<NodeId, EdgeAttributes>>,
    coordinates: BTreeMap<NodeId, Coordinate>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from its serialized parts, rejecting edges that point
    /// at nodes the adjacency does not contain.
    pub fn from_parts(
        adjacency: BTreeMap<NodeId, BTreeMap<NodeId, EdgeAttributes>>,
        coordinates: BTreeMap<NodeId, Coordinate>,
    ) -> Result<Self> {
        for (from, targets) in &adjacency {
            for to in targets.keys() {
                if !adjacency.contains_key(to) {
                    return Err(Error::MalformedGraph {
                        from: *from,
                        to: *to,
                    });
                }
            }
        }
        Ok(Self {
            adjacency,
            coordinates,
        })
    }

    /// Build a distance-only graph from `(a, b, meters)` triples.
    pub fn from_distances(edges: &[(NodeId, NodeId, f64)]) -> Self {
        let mut graph = Self::new();
        for &(a, b, distance) in edges {
            graph.insert_edge(a, b, EdgeAttributes::with_distance(distance));
        }
        graph
    }

    /// Register a node without edges. Existing coordinates are kept.
    pub fn add_node(&mut self, node: NodeId, coordinate: Option<Coordinate>) {
        self.adjacency.entry(node).or_default();
        if let Some(coordinate) = coordinate {
            self.coordinates.entry(node).or_insert(coordinate);
        }
    }

    /// Insert `a <-> b` unless the edge already exists.
    ///
    /// Returns `false` when an earlier writer already owns the edge; its
    /// attributes are left untouched.
    pub fn insert_edge(&mut self, a: NodeId, b: NodeId, attributes: EdgeAttributes) -> bool {
        if self.edge(a, b).is_some() {
            return false;
        }
        self.adjacency
            .entry(a)
            .or_default()
            .insert(b, attributes.clone());
        self.adjacency.entry(b).or_default().insert(a, attributes);
        true
    }

    pub fn edge(&self, from: NodeId, to: NodeId) -> Option<&EdgeAttributes> {
        self.adjacency.get(&from).and_then(|targets| targets.get(&to))
    }

    /// Neighbours of `node` in ascending id order. Unknown nodes have none.
    pub fn neighbours(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &EdgeAttributes)> {
        self.adjacency
            .get(&node)
            .into_iter()
            .flat_map(|targets| targets.iter().map(|(id, attrs)| (*id, attrs)))
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeMap::len).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn coordinate(&self, node: NodeId) -> Option<Coordinate> {
        self.coordinates.get(&node).copied()
    }

    pub fn adjacency(&self) -> &BTreeMap<NodeId, BTreeMap<NodeId, EdgeAttributes>> {
        &self.adjacency
    }

    pub fn coordinates(&self) -> &BTreeMap<NodeId, Coordinate> {
        &self.coordinates
    }

    /// Node whose coordinate is closest (great-circle) to the target.
    ///
    /// Linear scan; ties resolve to the lowest id. Returns `None` when no node
    /// has a coordinate.
    pub fn nearest_node(&self, lat: f64, lng: f64) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for (&node, coordinate) in &self.coordinates {
            let d = great_circle(lng, lat, coordinate.lng, coordinate.lat);
            match best {
                Some((_, best_d)) if best_d <= d => {}
                _ => best = Some((node, d)),
            }
        }
        best.map(|(node, _)| node)
    }

    /// Coordinates of the given path's nodes, skipping nodes without one.
    pub fn path_coordinates(&self, path: &[NodeId]) -> Vec<Coordinate> {
        path.iter()
            .filter_map(|node| self.coordinate(*node))
            .collect()
    }
}

/// Per-variant bookkeeping produced alongside the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSummary {
    pub route_type: String,
    pub route_name: String,
    /// Node sequence the variant's polyline maps to.
    pub path: Vec<NodeId>,
    /// Provider-reported length in meters.
    pub distance: f64,
    /// Provider-reported duration in seconds.
    pub duration: f64,
    pub congestion: f64,
    pub strategy: u32,
}

/// Result of [`synthesize`].
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub graph: Graph,
    pub variants: Vec<VariantSummary>,
}

impl Synthesis {
    /// First variant's polyline in `lng,lat;lng,lat` form.
    pub fn raw_polyline(&self) -> String {
        self.variants
            .first()
            .map(|variant| encode_polyline(&self.graph.path_coordinates(&variant.path)))
            .unwrap_or_default()
    }

    /// Sum of provider-reported distances over all variants.
    pub fn total_distance(&self) -> f64 {
        self.variants.iter().map(|variant| variant.distance).sum()
    }

    /// Sum of provider-reported durations over all variants.
    pub fn total_duration(&self) -> f64 {
        self.variants.iter().map(|variant| variant.duration).sum()
    }
}

/// Build a routing graph from every route variant of one directions response.
///
/// Node ids are assigned from 1 in order of first sight. Returns
/// [`Error::GraphSynthesis`] when the variants yield no edge at all.
pub fn synthesize(variants: &[RouteVariant]) -> Result<Synthesis> {
    let mut graph = Graph::new();
    let mut node_ids: HashMap<(i64, i64), NodeId> = HashMap::new();
    let mut next_id: NodeId = 1;
    let mut summaries = Vec::with_capacity(variants.len());

    for (index, variant) in variants.iter().enumerate() {
        let strategy = strategy_code(&variant.route_type, index);
        let congestion = variant_congestion(&variant.route_type, strategy);

        let mut path = Vec::with_capacity(variant.coords.len());
        for coordinate in &variant.coords {
            let key = (
                round_coordinate(coordinate.lat),
                round_coordinate(coordinate.lng),
            );
            let node = *node_ids.entry(key).or_insert_with(|| {
                let id = next_id;
                next_id += 1;
                id
            });
            graph.add_node(node, Some(*coordinate));
            path.push(node);
        }

        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a == b || graph.edge(a, b).is_some() {
                continue;
            }
            let (Some(ca), Some(cb)) = (graph.coordinate(a), graph.coordinate(b)) else {
                continue;
            };
            graph.insert_edge(
                a,
                b,
                EdgeAttributes {
                    distance: great_circle(ca.lng, ca.lat, cb.lng, cb.lat),
                    congestion,
                    construction: false,
                    source_route: variant.route_type.clone(),
                },
            );
        }

        let route_name = if variant.route_name.is_empty() {
            format!("route {index}")
        } else {
            variant.route_name.clone()
        };
        summaries.push(VariantSummary {
            route_type: variant.route_type.clone(),
            route_name,
            path,
            distance: variant.distance,
            duration: variant.duration,
            congestion,
            strategy,
        });
    }

    if graph.edge_count() == 0 {
        return Err(Error::GraphSynthesis {
            variants: variants.len(),
        });
    }

    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        variants = variants.len(),
        "synthesized routing graph"
    );

    Ok(Synthesis {
        graph,
        variants: summaries,
    })
}

fn round_coordinate(value: f64) -> i64 {
    (value * 10f64.powi(COORDINATE_PRECISION)).round() as i64
}

/// Strategy code from a `strategy_N` tag, else the variant's position.
fn strategy_code(route_type: &str, index: usize) -> u32 {
    route_type
        .strip_prefix("strategy_")
        .and_then(|code| code.parse().ok())
        .unwrap_or(index as u32)
}

fn variant_congestion(route_type: &str, strategy: u32) -> f64 {
    if route_type.contains("waypoint") {
        WAYPOINT_CONGESTION
    } else if route_type.contains("direct") {
        DIRECT_CONGESTION
    } else {
        strategy_congestion(strategy)
    }
}

/// Provider strategy codes: speed first, cost first, distance first,
/// no highways, avoid congestion.
fn strategy_congestion(strategy: u32) -> f64 {
    match strategy {
        0 => 0.15,
        1 => 0.30,
        2 => 0.50,
        3 => 0.60,
        4 => 0.20,
        _ => DEFAULT_CONGESTION,
    }
}

/// Parse a `lng,lat;lng,lat` polyline, skipping malformed points.
pub fn parse_polyline(polyline: &str) -> Vec<Coordinate> {
    polyline
        .split(';')
        .filter_map(|point| {
            let (lng, lat) = point.trim().split_once(',')?;
            let lng: f64 = lng.trim().parse().ok()?;
            let lat: f64 = lat.trim().parse().ok()?;
            Some(Coordinate::new(lat, lng))
        })
        .collect()
}

/// Encode coordinates as a `lng,lat;lng,lat` polyline.
pub fn encode_polyline(coordinates: &[Coordinate]) -> String {
    coordinates
        .iter()
        .map(|c| format!("{},{}", c.lng, c.lat))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::variant;

    #[test]
    fn shared_vertices_are_deduplicated() {
        let variants = vec![
            variant("direct", &[(27.0, 112.0), (27.001, 112.0), (27.002, 112.0)]),
            variant(
                "waypoint_0",
                &[(27.0, 112.0), (27.001, 112.001), (27.002, 112.0)],
            ),
        ];
        let synthesis = synthesize(&variants).expect("graph");
        assert_eq!(synthesis.graph.node_count(), 4);
        assert_eq!(synthesis.graph.edge_count(), 4);
        assert_eq!(synthesis.variants[0].path, vec![1, 2, 3]);
        assert_eq!(synthesis.variants[1].path, vec![1, 4, 3]);
    }

    #[test]
    fn rounding_merges_nearly_identical_vertices() {
        let variants = vec![
            variant("direct", &[(27.0, 112.0), (27.001, 112.0)]),
            variant("waypoint_0", &[(27.000_000_1, 112.0), (27.002, 112.0)]),
        ];
        let synthesis = synthesize(&variants).expect("graph");
        assert_eq!(synthesis.graph.node_count(), 3);
        // The first-seen raw coordinate is kept.
        assert_eq!(
            synthesis.graph.coordinate(1),
            Some(Coordinate::new(27.0, 112.0))
        );
    }

    #[test]
    fn first_writer_wins_for_shared_edges() {
        let shared = [(27.0, 112.0), (27.001, 112.0)];
        let variants = vec![variant("direct", &shared), variant("waypoint_0", &shared)];
        let synthesis = synthesize(&variants).expect("graph");
        let edge = synthesis.graph.edge(1, 2).expect("edge");
        assert_eq!(edge.congestion, DIRECT_CONGESTION);
        assert_eq!(edge.source_route, "direct");
        assert_eq!(synthesis.graph.edge(2, 1), Some(edge));
        assert_eq!(synthesis.variants[1].congestion, WAYPOINT_CONGESTION);
    }

    #[test]
    fn congestion_follows_variant_tags() {
        let variants = vec![
            variant("strategy_2", &[(27.0, 112.0), (27.001, 112.0)]),
            variant("alternative", &[(27.1, 112.0), (27.101, 112.0)]),
            variant("strategy_9", &[(27.2, 112.0), (27.201, 112.0)]),
            variant("another", &[(27.3, 112.0), (27.301, 112.0)]),
            variant("fallback", &[(27.4, 112.0), (27.401, 112.0)]),
        ];
        let synthesis = synthesize(&variants).expect("graph");
        let congestion: Vec<f64> = synthesis.variants.iter().map(|v| v.congestion).collect();
        assert_eq!(congestion, vec![0.50, 0.30, 0.30, 0.60, 0.20]);
    }

    #[test]
    fn edge_distance_is_great_circle() {
        let variants = vec![variant("direct", &[(27.0, 112.0), (27.01, 112.0)])];
        let synthesis = synthesize(&variants).expect("graph");
        let edge = synthesis.graph.edge(1, 2).expect("edge");
        assert_eq!(edge.distance, great_circle(112.0, 27.0, 112.0, 27.01));
        assert!(!edge.construction);
    }

    #[test]
    fn empty_variants_fail_synthesis() {
        let err = synthesize(&[]).unwrap_err();
        assert!(matches!(err, Error::GraphSynthesis { variants: 0 }));

        let single_points = vec![variant("direct", &[(27.0, 112.0)])];
        let err = synthesize(&single_points).unwrap_err();
        assert!(matches!(err, Error::GraphSynthesis { variants: 1 }));
    }

    #[test]
    fn nearest_node_snaps_to_closest_vertex() {
        let variants = vec![variant(
            "direct",
            &[(27.0, 112.0), (27.01, 112.0), (27.02, 112.0)],
        )];
        let synthesis = synthesize(&variants).expect("graph");
        assert_eq!(synthesis.graph.nearest_node(27.012, 112.0005), Some(2));
        assert_eq!(synthesis.graph.nearest_node(26.0, 112.0), Some(1));
        assert_eq!(Graph::new().nearest_node(27.0, 112.0), None);
    }

    #[test]
    fn from_parts_rejects_dangling_edges() {
        let mut adjacency = BTreeMap::new();
        adjacency.insert(
            1,
            BTreeMap::from([(2, EdgeAttributes::with_distance(10.0))]),
        );
        let err = Graph::from_parts(adjacency, BTreeMap::new()).unwrap_err();
        assert!(matches!(err, Error::MalformedGraph { from: 1, to: 2 }));
    }

    #[test]
    fn summaries_total_provider_figures() {
        let mut first = variant("direct", &[(27.0, 112.0), (27.01, 112.0)]);
        first.distance = 1200.0;
        first.duration = 300.0;
        let mut second = variant("waypoint_0", &[(27.0, 112.0), (27.01, 112.01)]);
        second.distance = 1500.0;
        second.duration = 360.0;

        let synthesis = synthesize(&[first, second]).expect("graph");
        assert_eq!(synthesis.total_distance(), 2700.0);
        assert_eq!(synthesis.total_duration(), 660.0);
        assert_eq!(synthesis.raw_polyline(), "112,27;112,27.01");
    }

    #[test]
    fn polyline_parsing_skips_malformed_points() {
        let points = parse_polyline("112.94,27.83; bogus ;112.95,27.84;1,2,3;;");
        assert_eq!(
            points,
            vec![Coordinate::new(27.83, 112.94), Coordinate::new(27.84, 112.95)]
        );
        assert_eq!(encode_polyline(&points), "112.94,27.83;112.95,27.84");
    }
}
