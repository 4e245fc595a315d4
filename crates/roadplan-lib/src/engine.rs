//! Route planning orchestrator.
//!
//! [`RouteEngine::plan_route`] resolves both addresses, consults the cache
//! and, on a miss, fetches directions, synthesizes a graph, runs every
//! registered algorithm and writes the whole artifact back before answering
//! with the requested algorithm's result. On a hit the stored result is
//! decoded and no algorithm runs.
//!
//! Cache failures never abort a request: read errors and corrupt payloads
//! are logged and treated as misses, write errors are logged and ignored.
//! Planning for one cache key is serialised so concurrent first requests
//! share a single upstream fetch.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CachePayload, CacheStats, RouteCache};
use crate::config::EngineConfig;
use crate::cost::{
    breakdown, infinite_as_null, path_cost, path_distance, CostBreakdown, CostProfile, Objective,
};
use crate::distance::Coordinate;
use crate::error::{Error, Result};
use crate::graph::{synthesize, Graph, NodeId};
use crate::providers::{DirectionsProvider, Geocoder};
use crate::routing::{AlgorithmMetrics, AlgorithmRegistry, AlgorithmResult, RouteAlgorithm};

/// Answer to one planning request.
///
/// An unreachable destination is not an error: `success` is `false`, the
/// path is empty and the cost infinite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub success: bool,
    pub algorithm: RouteAlgorithm,
    pub start_address: String,
    pub end_address: String,
    pub start_coord: Coordinate,
    pub end_coord: Coordinate,
    /// Graph node the start address was snapped to.
    pub start_node: NodeId,
    pub end_node: NodeId,
    pub path: Vec<NodeId>,
    /// Cost under the algorithm's own profile.
    #[serde(with = "infinite_as_null")]
    pub cost: f64,
    /// Cost under the caller's objectives, when supplied.
    pub requested_cost: Option<f64>,
    /// Per-objective costs for caller objectives or a multi-objective algorithm.
    pub breakdown: Option<CostBreakdown>,
    /// Physical length of the path in meters.
    pub path_distance: Option<f64>,
    pub metrics: AlgorithmMetrics,
    pub from_cache: bool,
    /// Coordinates of the path's nodes in order.
    pub route_coordinates: Vec<Coordinate>,
}

/// Result of [`RouteEngine::compare_algorithms`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub results: Vec<PlanResult>,
    /// Algorithm with the lowest finite cost, if any succeeded.
    pub best: Option<RouteAlgorithm>,
}

/// Resolved request context shared by the hit and miss paths.
struct Request {
    key: CacheKey,
    start_coord: Coordinate,
    end_coord: Coordinate,
}

/// Orchestrates geocoding, caching, graph synthesis and search.
///
/// Collaborators are injected; the engine owns them for its lifetime.
pub struct RouteEngine<G, D, C> {
    geocoder: G,
    directions: D,
    cache: C,
    registry: AlgorithmRegistry,
    config: EngineConfig,
    in_flight: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl<G, D, C> RouteEngine<G, D, C>
where
    G: Geocoder,
    D: DirectionsProvider,
    C: RouteCache,
{
    pub fn new(geocoder: G, directions: D, cache: C, config: EngineConfig) -> Self {
        let registry = AlgorithmRegistry::new(config.astar_heuristic, config.pso.clone());
        Self {
            geocoder,
            directions,
            cache,
            registry,
            config,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn available_algorithms(&self) -> Vec<RouteAlgorithm> {
        self.registry.available()
    }

    pub fn cache_stats(&self) -> Result<CacheStats> {
        self.cache.stats()
    }

    pub fn evict_expired(&self) -> Result<usize> {
        let removed = self.cache.evict_expired()?;
        info!(removed, "cache eviction finished");
        Ok(removed)
    }

    /// Plan a route between two addresses with `algorithm`.
    ///
    /// `objectives`, when given, re-score the returned path with the default
    /// weights; the search itself always uses the algorithm's fixed profile.
    pub fn plan_route(
        &self,
        start: &str,
        end: &str,
        algorithm: RouteAlgorithm,
        objectives: Option<&[Objective]>,
    ) -> Result<PlanResult> {
        // Step 1: resolve both addresses.
        let start_coord = self.resolve(start)?;
        let end_coord = self.resolve(end)?;
        let request = Request {
            key: CacheKey::new(start, end),
            start_coord,
            end_coord,
        };

        // Step 2: serialise work per cache key.
        let slot = self.acquire_slot(&request.key);
        let outcome = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            self.plan_locked(&request, algorithm, objectives)
        };
        self.release_slot(&request.key, slot);
        outcome
    }

    /// Plan with each algorithm in turn and pick the cheapest success.
    ///
    /// An empty slice compares every registered algorithm. Only the first
    /// plan can miss the cache; the rest are served from it.
    pub fn compare_algorithms(
        &self,
        start: &str,
        end: &str,
        algorithms: &[RouteAlgorithm],
    ) -> Result<ComparisonReport> {
        let algorithms = if algorithms.is_empty() {
            self.available_algorithms()
        } else {
            algorithms.to_vec()
        };

        let mut results = Vec::with_capacity(algorithms.len());
        for algorithm in algorithms {
            results.push(self.plan_route(start, end, algorithm, None)?);
        }

        let best = results
            .iter()
            .filter(|result| result.success)
            .min_by(|a, b| a.cost.total_cmp(&b.cost))
            .map(|result| result.algorithm);

        Ok(ComparisonReport { results, best })
    }

    fn resolve(&self, address: &str) -> Result<Coordinate> {
        match self.geocoder.resolve(address) {
            Some(geocoded) => {
                debug!(address, lat = geocoded.lat, lng = geocoded.lng, "resolved address");
                Ok(geocoded.coordinate())
            }
            None => Err(Error::AddressResolution {
                address: address.to_string(),
            }),
        }
    }

    fn plan_locked(
        &self,
        request: &Request,
        algorithm: RouteAlgorithm,
        objectives: Option<&[Objective]>,
    ) -> Result<PlanResult> {
        if let Some((graph, result)) = self.from_cache(&request.key, algorithm) {
            debug!(key = %request.key, %algorithm, "cache hit");
            return self.assemble(request, &graph, result, objectives, true);
        }
        debug!(key = %request.key, %algorithm, "cache miss");

        // Step 3: fetch every route variant between the two points.
        let variants = self
            .directions
            .multi_route(request.start_coord, request.end_coord);
        if variants.is_empty() {
            return Err(Error::DirectionsUnavailable {
                start: request.key.start.clone(),
                end: request.key.end.clone(),
            });
        }

        // Step 4: build the per-request graph.
        let synthesis = synthesize(&variants)?;
        let (start_node, end_node) = snap_endpoints(&synthesis.graph, request, variants.len())?;

        // Step 5: run every algorithm so the cache holds all of them.
        let results = self.registry.run_all(&synthesis.graph, start_node, end_node);

        // Step 6: write the artifact back.
        match CachePayload::encode(request.start_coord, request.end_coord, &synthesis, &results) {
            Ok(payload) => match self.cache.store(&request.key, payload) {
                Ok(()) => info!(key = %request.key, "cached planning results"),
                Err(err) => warn!(key = %request.key, error = %err, "failed to write route cache"),
            },
            Err(err) => warn!(key = %request.key, error = %err, "failed to encode cache payload"),
        }

        let result = take_result(results, algorithm)?;
        self.assemble(request, &synthesis.graph, result, objectives, false)
    }

    /// Graph and stored result for `key`, or `None` on any miss or failure.
    fn from_cache(
        &self,
        key: &CacheKey,
        algorithm: RouteAlgorithm,
    ) -> Option<(Graph, AlgorithmResult)> {
        let entry = match self.cache.lookup(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %key, error = %err, "route cache lookup failed; recomputing");
                return None;
            }
        };

        let decoded = entry.payload.decode_graph().and_then(|graph| {
            let result = entry
                .payload
                .decode_result(algorithm)?
                .ok_or_else(|| Error::CachePayloadMissing {
                    start: key.start.clone(),
                    end: key.end.clone(),
                    field: algorithm.as_str(),
                })?;
            Ok((graph, result))
        });
        match decoded {
            Ok(hit) => Some(hit),
            Err(err) => {
                warn!(key = %key, error = %err, "unusable route cache entry; recomputing");
                None
            }
        }
    }

    fn assemble(
        &self,
        request: &Request,
        graph: &Graph,
        result: AlgorithmResult,
        objectives: Option<&[Objective]>,
        from_cache: bool,
    ) -> Result<PlanResult> {
        let success = result.is_reachable();
        let (start_node, end_node) = match (result.path.first(), result.path.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => snap_endpoints(graph, request, 0)?,
        };

        let requested_profile = objectives
            .filter(|objectives| !objectives.is_empty())
            .map(CostProfile::with_default_weights);
        let algorithm_profile = result.metrics.algorithm.cost_profile();

        let (requested_cost, cost_breakdown, distance) = if success {
            let requested_cost = requested_profile
                .as_ref()
                .map(|profile| path_cost(&result.path, graph, profile))
                .transpose()?;
            let breakdown_profile = match &requested_profile {
                Some(profile) => Some(profile),
                None if !algorithm_profile.is_single_objective() => Some(&algorithm_profile),
                None => None,
            };
            let cost_breakdown = breakdown_profile
                .map(|profile| breakdown(&result.path, graph, profile))
                .transpose()?;
            let distance = path_distance(&result.path, graph)?;
            (requested_cost, cost_breakdown, Some(distance))
        } else {
            (None, None, None)
        };

        Ok(PlanResult {
            success,
            algorithm: result.metrics.algorithm,
            start_address: request.key.start.clone(),
            end_address: request.key.end.clone(),
            start_coord: request.start_coord,
            end_coord: request.end_coord,
            start_node,
            end_node,
            route_coordinates: graph.path_coordinates(&result.path),
            path: result.path,
            cost: result.cost,
            requested_cost,
            breakdown: cost_breakdown,
            path_distance: distance,
            metrics: result.metrics,
            from_cache,
        })
    }

    fn acquire_slot(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.entry(key.clone()).or_default().clone()
    }

    fn release_slot(&self, key: &CacheKey, slot: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Handles are only cloned and dropped under the map lock, so once ours
        // is gone a count of one means the map holds the last reference.
        drop(slot);
        let idle = in_flight
            .get(key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1);
        if idle {
            in_flight.remove(key);
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn snap_endpoints(graph: &Graph, request: &Request, variants: usize) -> Result<(NodeId, NodeId)> {
    let start = graph.nearest_node(request.start_coord.lat, request.start_coord.lng);
    let end = graph.nearest_node(request.end_coord.lat, request.end_coord.lng);
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(Error::GraphSynthesis { variants }),
    }
}

fn take_result(
    mut results: BTreeMap<RouteAlgorithm, AlgorithmResult>,
    algorithm: RouteAlgorithm,
) -> Result<AlgorithmResult> {
    results
        .remove(&algorithm)
        .ok_or_else(|| Error::UnknownAlgorithm {
            name: algorithm.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryRouteCache;
    use crate::providers::{GeocodedAddress, RouteVariant};
    use crate::pso::PsoConfig;
    use crate::test_helpers::variant;

    struct StaticGeocoder;

    impl Geocoder for StaticGeocoder {
        fn resolve(&self, address: &str) -> Option<GeocodedAddress> {
            let (lat, lng) = match address.trim() {
                "north" => (27.00, 112.0),
                "south" => (27.03, 112.0),
                "island" => (40.0, 120.0),
                _ => return None,
            };
            Some(GeocodedAddress {
                lng,
                lat,
                display_name: address.to_string(),
            })
        }
    }

    struct StaticDirections;

    impl DirectionsProvider for StaticDirections {
        fn multi_route(&self, start: Coordinate, _end: Coordinate) -> Vec<RouteVariant> {
            if start.lat > 30.0 {
                return Vec::new();
            }
            vec![
                variant("direct", &[(27.00, 112.0), (27.01, 112.0), (27.03, 112.0)]),
                variant("waypoint_0", &[(27.00, 112.0), (27.02, 112.001), (27.03, 112.0)]),
            ]
        }
    }

    fn engine() -> RouteEngine<StaticGeocoder, StaticDirections, MemoryRouteCache> {
        let config = EngineConfig {
            pso: PsoConfig {
                seed: Some(17),
                ..PsoConfig::default()
            },
            ..EngineConfig::default()
        };
        RouteEngine::new(StaticGeocoder, StaticDirections, MemoryRouteCache::default(), config)
    }

    #[test]
    fn second_request_is_served_from_cache() {
        let engine = engine();
        let first = engine
            .plan_route("north", "south", RouteAlgorithm::Dijkstra, None)
            .unwrap();
        assert!(first.success);
        assert!(!first.from_cache);

        let second = engine
            .plan_route("north", "south", RouteAlgorithm::Dijkstra, None)
            .unwrap();
        assert!(second.from_cache);
        assert_eq!(second.path, first.path);
        assert_eq!(second.cost.to_bits(), first.cost.to_bits());
        assert_eq!(engine.in_flight_len(), 0);
    }

    #[test]
    fn slot_is_dropped_by_whichever_holder_releases_last() {
        let engine = engine();
        let key = CacheKey::new("north", "south");
        let first = engine.acquire_slot(&key);
        let second = engine.acquire_slot(&key);
        assert!(Arc::ptr_eq(&first, &second));

        engine.release_slot(&key, first);
        assert_eq!(engine.in_flight_len(), 1);
        engine.release_slot(&key, second);
        assert_eq!(engine.in_flight_len(), 0);
    }

    #[test]
    fn concurrent_requests_leave_no_idle_slots() {
        let engine = engine();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        engine
                            .plan_route("north", "south", RouteAlgorithm::AStar, None)
                            .unwrap();
                    }
                });
            }
        });
        assert_eq!(engine.in_flight_len(), 0);
    }

    #[test]
    fn dijkstra_result_has_no_breakdown_unless_objectives_given() {
        let engine = engine();
        let plain = engine
            .plan_route("north", "south", RouteAlgorithm::Dijkstra, None)
            .unwrap();
        assert!(plain.breakdown.is_none());
        assert!(plain.requested_cost.is_none());
        assert_eq!(plain.path_distance, Some(plain.cost));

        let scored = engine
            .plan_route(
                "north",
                "south",
                RouteAlgorithm::Dijkstra,
                Some(&[Objective::Distance, Objective::Congestion]),
            )
            .unwrap();
        let parts = scored.breakdown.expect("breakdown");
        assert_eq!(Some(parts.total), scored.requested_cost);
        assert_eq!(parts.distance, plain.cost);
    }

    #[test]
    fn multi_objective_algorithms_report_breakdown() {
        let engine = engine();
        let result = engine
            .plan_route("north", "south", RouteAlgorithm::AStar, None)
            .unwrap();
        let parts = result.breakdown.expect("breakdown");
        assert_eq!(parts.total, result.cost);
        assert_eq!(result.route_coordinates.len(), result.path.len());
    }

    #[test]
    fn failures_map_to_distinct_errors() {
        let engine = engine();
        let err = engine
            .plan_route("nowhere", "south", RouteAlgorithm::Dijkstra, None)
            .unwrap_err();
        assert!(matches!(err, Error::AddressResolution { ref address } if address == "nowhere"));

        let err = engine
            .plan_route("island", "south", RouteAlgorithm::Pso, None)
            .unwrap_err();
        assert!(matches!(err, Error::DirectionsUnavailable { .. }));
    }

    #[test]
    fn comparison_picks_lowest_cost() {
        let engine = engine();
        let report = engine.compare_algorithms("north", "south", &[]).unwrap();
        assert_eq!(report.results.len(), 3);
        assert!(!report.results[0].from_cache);
        assert!(report.results[1..].iter().all(|result| result.from_cache));

        let cheapest = report
            .results
            .iter()
            .min_by(|a, b| a.cost.total_cmp(&b.cost))
            .map(|result| result.algorithm);
        assert_eq!(report.best, cheapest);
    }
}
