//! Multi-objective cost model shared by every search algorithm.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{EdgeAttributes, Graph, NodeId};

/// Multiplier applied to an edge's distance when it is under construction.
pub const CONSTRUCTION_PENALTY: f64 = 5.0;

/// Weight assumed for an objective missing from the weight map.
const MISSING_WEIGHT: f64 = 1.0;

/// A named cost dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Distance,
    Congestion,
    Construction,
}

impl Objective {
    pub const ALL: [Objective; 3] = [
        Objective::Distance,
        Objective::Congestion,
        Objective::Construction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Objective::Distance => "distance",
            Objective::Congestion => "congestion",
            Objective::Construction => "construction",
        }
    }

    /// Unweighted cost of one edge under this objective.
    pub fn raw_cost(self, edge: &EdgeAttributes) -> f64 {
        match self {
            Objective::Distance => edge.distance,
            Objective::Congestion => edge.congestion * edge.distance,
            Objective::Construction if edge.construction => CONSTRUCTION_PENALTY * edge.distance,
            Objective::Construction => 0.0,
        }
    }

    /// Weight used when a caller names objectives without weights.
    pub fn default_weight(self) -> f64 {
        match self {
            Objective::Distance => 0.5,
            Objective::Congestion => 0.3,
            Objective::Construction => 0.2,
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Objective {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "distance" => Ok(Objective::Distance),
            "congestion" => Ok(Objective::Congestion),
            "construction" => Ok(Objective::Construction),
            _ => Err(Error::UnknownObjective {
                name: value.to_string(),
            }),
        }
    }
}

/// Ordered objective set plus weights.
///
/// Weights are not required to sum to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostProfile {
    pub objectives: Vec<Objective>,
    pub weights: BTreeMap<Objective, f64>,
}

impl CostProfile {
    pub fn new(objectives: Vec<Objective>, weights: BTreeMap<Objective, f64>) -> Self {
        Self {
            objectives,
            weights,
        }
    }

    /// Dijkstra's fixed profile: raw distance.
    pub fn distance_only() -> Self {
        Self::new(
            vec![Objective::Distance],
            BTreeMap::from([(Objective::Distance, 1.0)]),
        )
    }

    /// A*'s fixed profile: distance 0.7, congestion 0.3.
    pub fn distance_and_congestion() -> Self {
        Self::new(
            vec![Objective::Distance, Objective::Congestion],
            BTreeMap::from([(Objective::Distance, 0.7), (Objective::Congestion, 0.3)]),
        )
    }

    /// PSO's fixed profile: distance 0.5, congestion 0.3, construction 0.2.
    pub fn all_objectives() -> Self {
        Self::with_default_weights(&Objective::ALL)
    }

    /// Profile over caller-chosen objectives using the default weights.
    pub fn with_default_weights(objectives: &[Objective]) -> Self {
        let mut ordered = Vec::with_capacity(objectives.len());
        for objective in objectives {
            if !ordered.contains(objective) {
                ordered.push(*objective);
            }
        }
        let weights = ordered
            .iter()
            .map(|objective| (*objective, objective.default_weight()))
            .collect();
        Self::new(ordered, weights)
    }

    pub fn weight(&self, objective: Objective) -> f64 {
        self.weights
            .get(&objective)
            .copied()
            .unwrap_or(MISSING_WEIGHT)
    }

    pub fn is_single_objective(&self) -> bool {
        self.objectives.len() == 1
    }

    /// Lowest cost per meter any edge can have under this profile.
    ///
    /// Congestion and construction may contribute nothing on a given edge, so
    /// only the distance objective sets a floor.
    pub fn min_cost_per_meter(&self) -> f64 {
        if !self.objectives.contains(&Objective::Distance) {
            return 0.0;
        }
        if self.is_single_objective() {
            return 1.0;
        }
        self.weight(Objective::Distance).max(0.0)
    }
}

impl Default for CostProfile {
    fn default() -> Self {
        Self::distance_only()
    }
}

/// Scalar cost of one edge under `profile`.
///
/// A single-objective profile yields the raw objective cost, ignoring its
/// weight.
pub fn edge_cost(edge: &EdgeAttributes, profile: &CostProfile) -> f64 {
    if let [objective] = profile.objectives.as_slice() {
        return objective.raw_cost(edge);
    }
    profile
        .objectives
        .iter()
        .map(|objective| objective.raw_cost(edge) * profile.weight(*objective))
        .sum()
}

/// Sum of [`edge_cost`] along consecutive node pairs.
///
/// Fails with [`Error::MissingEdge`] when the path steps over an edge the
/// graph does not contain.
pub fn path_cost(path: &[NodeId], graph: &Graph, profile: &CostProfile) -> Result<f64> {
    let mut total = 0.0;
    for pair in path.windows(2) {
        total += edge_cost(edge_between(graph, pair[0], pair[1])?, profile);
    }
    Ok(total)
}

/// Physical length of a path in meters.
pub fn path_distance(path: &[NodeId], graph: &Graph) -> Result<f64> {
    path_cost(path, graph, &CostProfile::distance_only())
}

/// Per-objective raw costs of a path plus the weighted total.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub distance: f64,
    pub congestion: f64,
    pub construction: f64,
    /// Equal to [`path_cost`] under the profile the breakdown was taken for.
    pub total: f64,
}

/// Break a path's cost down by objective.
pub fn breakdown(path: &[NodeId], graph: &Graph, profile: &CostProfile) -> Result<CostBreakdown> {
    let mut result = CostBreakdown::default();
    for pair in path.windows(2) {
        let edge = edge_between(graph, pair[0], pair[1])?;
        result.distance += Objective::Distance.raw_cost(edge);
        result.congestion += Objective::Congestion.raw_cost(edge);
        result.construction += Objective::Construction.raw_cost(edge);
        result.total += edge_cost(edge, profile);
    }
    Ok(result)
}

fn edge_between(graph: &Graph, from: NodeId, to: NodeId) -> Result<&EdgeAttributes> {
    graph
        .edge(from, to)
        .ok_or(Error::MissingEdge { from, to })
}

/// Serialise non-finite costs as JSON `null` and read `null` back as `∞`.
pub mod infinite_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(distance: f64, congestion: f64, construction: bool) -> EdgeAttributes {
        EdgeAttributes {
            distance,
            congestion,
            construction,
            source_route: "direct".to_string(),
        }
    }

    #[test]
    fn single_objective_ignores_weight() {
        let profile = CostProfile::new(
            vec![Objective::Congestion],
            BTreeMap::from([(Objective::Congestion, 0.1)]),
        );
        assert_eq!(edge_cost(&edge(200.0, 0.5, false), &profile), 100.0);
    }

    #[test]
    fn weighted_objectives_accumulate() {
        let e = edge(100.0, 0.5, true);
        let cost = edge_cost(&e, &CostProfile::all_objectives());
        // 100*0.5 + 50*0.3 + 500*0.2
        assert!((cost - 165.0).abs() < 1e-9, "got {cost}");

        let cost = edge_cost(&e, &CostProfile::distance_and_congestion());
        assert!((cost - 85.0).abs() < 1e-9, "got {cost}");
    }

    #[test]
    fn missing_weight_defaults_to_one() {
        let profile = CostProfile::new(
            vec![Objective::Distance, Objective::Congestion],
            BTreeMap::from([(Objective::Distance, 2.0)]),
        );
        assert_eq!(edge_cost(&edge(10.0, 0.5, false), &profile), 25.0);
    }

    #[test]
    fn path_cost_sums_edges_and_reports_missing_edge() {
        let graph = Graph::from_distances(&[(1, 2, 100.0), (2, 3, 150.0)]);
        let profile = CostProfile::distance_only();
        assert_eq!(path_cost(&[1, 2, 3], &graph, &profile).unwrap(), 250.0);
        assert_eq!(path_cost(&[1], &graph, &profile).unwrap(), 0.0);
        assert_eq!(path_cost(&[], &graph, &profile).unwrap(), 0.0);

        let err = path_cost(&[1, 3], &graph, &profile).unwrap_err();
        assert!(matches!(err, Error::MissingEdge { from: 1, to: 3 }));
    }

    #[test]
    fn breakdown_total_matches_path_cost() {
        let mut graph = Graph::new();
        graph.insert_edge(1, 2, edge(100.0, 0.2, false));
        graph.insert_edge(2, 3, edge(50.0, 0.6, true));
        let profile = CostProfile::all_objectives();

        let parts = breakdown(&[1, 2, 3], &graph, &profile).unwrap();
        assert_eq!(parts.distance, 150.0);
        assert!((parts.congestion - 50.0).abs() < 1e-9);
        assert_eq!(parts.construction, 250.0);
        assert_eq!(parts.total, path_cost(&[1, 2, 3], &graph, &profile).unwrap());
        assert_eq!(path_distance(&[1, 2, 3], &graph).unwrap(), 150.0);
    }

    #[test]
    fn objectives_parse_case_insensitively() {
        assert_eq!("Distance".parse::<Objective>().unwrap(), Objective::Distance);
        assert_eq!(
            " construction ".parse::<Objective>().unwrap(),
            Objective::Construction
        );
        assert!(matches!(
            "speed".parse::<Objective>(),
            Err(Error::UnknownObjective { .. })
        ));
    }

    #[test]
    fn default_weight_profile_drops_duplicates() {
        let profile = CostProfile::with_default_weights(&[
            Objective::Congestion,
            Objective::Distance,
            Objective::Congestion,
        ]);
        assert_eq!(
            profile.objectives,
            vec![Objective::Congestion, Objective::Distance]
        );
        assert_eq!(profile.weight(Objective::Congestion), 0.3);
        assert_eq!(profile.weight(Objective::Construction), 1.0);
    }

    #[test]
    fn distance_weight_sets_the_per_meter_floor() {
        assert_eq!(CostProfile::distance_only().min_cost_per_meter(), 1.0);
        assert_eq!(CostProfile::distance_and_congestion().min_cost_per_meter(), 0.7);
        assert_eq!(CostProfile::all_objectives().min_cost_per_meter(), 0.5);
        assert_eq!(
            CostProfile::with_default_weights(&[Objective::Congestion]).min_cost_per_meter(),
            0.0
        );

        // No edge under the profile may cost less than the floor per meter.
        let profile = CostProfile::all_objectives();
        for e in [edge(100.0, 0.0, false), edge(100.0, 0.9, true)] {
            assert!(edge_cost(&e, &profile) >= profile.min_cost_per_meter() * e.distance);
        }
    }

    #[derive(Serialize, Deserialize)]
    struct Wrapped(#[serde(with = "infinite_as_null")] f64);

    #[test]
    fn infinite_costs_serialise_as_null() {
        let json = serde_json::to_string(&Wrapped(f64::INFINITY)).unwrap();
        assert_eq!(json, "null");
        let back: Wrapped = serde_json::from_str(&json).unwrap();
        assert!(back.0.is_infinite());

        let back: Wrapped = serde_json::from_str("250.5").unwrap();
        assert_eq!(back.0, 250.5);
    }
}
