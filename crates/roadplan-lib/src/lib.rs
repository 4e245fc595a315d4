//! Roadplan library entry points.
//!
//! This crate turns multi-route driving directions into a small routing
//! graph, searches it with Dijkstra, A* or particle swarm optimisation under a
//! shared multi-objective cost model, and memoises the whole artifact behind a
//! content-keyed cache. Higher-level consumers (the CLI) should only depend on
//! the items exported here instead of reimplementing behavior.

pub mod cache;
pub mod config;
pub mod cost;
pub mod distance;
pub mod engine;
pub mod error;
pub mod graph;
pub mod path;
pub mod providers;
pub mod pso;
pub mod routing;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cache::{
    CacheConfig, CacheEntry, CacheKey, CachePayload, CacheStats, Clock, ManualClock,
    MemoryRouteCache, RouteCache, SqliteRouteCache, SystemClock,
};
pub use config::{default_cache_path, EngineConfig};
pub use cost::{CostBreakdown, CostProfile, Objective};
pub use distance::Coordinate;
pub use engine::{ComparisonReport, PlanResult, RouteEngine};
pub use error::{Error, Result};
pub use graph::{synthesize, EdgeAttributes, Graph, NodeId, Synthesis, VariantSummary};
pub use path::Heuristic;
pub use providers::{
    CachingGeocoder, DirectionsProvider, FixtureProvider, GeocodedAddress, Geocoder, RouteVariant,
};
pub use pso::PsoConfig;
pub use routing::{
    AlgorithmDetails, AlgorithmMetrics, AlgorithmRegistry, AlgorithmResult, RouteAlgorithm,
    RoutePlanner,
};
