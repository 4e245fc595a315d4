//! Content-keyed cache of synthesized graphs and algorithm results.
//!
//! Entries are keyed by the normalised `(start, end)` address pair, never by
//! coordinates. A lookup older than the TTL is a miss; eviction only removes
//! entries that are both older than the TTL and below the access floor, so
//! frequently requested routes survive staleness.
//!
//! Two backends implement [`RouteCache`]: [`MemoryRouteCache`] and
//! [`SqliteRouteCache`]. Both read the time from an injectable [`Clock`].

mod memory;
mod sqlite;

pub use memory::MemoryRouteCache;
pub use sqlite::SqliteRouteCache;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::distance::Coordinate;
use crate::error::{Error, Result};
use crate::graph::{EdgeAttributes, Graph, NodeId, Synthesis};
use crate::routing::{AlgorithmResult, RouteAlgorithm};

/// Trim an address and collapse inner whitespace. Case is preserved.
pub fn normalize_address(address: &str) -> String {
    address.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ordered pair of normalised start and end addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub start: String,
    pub end: String,
}

impl CacheKey {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: normalize_address(start),
            end: normalize_address(end),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.start, self.end)
    }
}

/// Serialized artifacts of one planning run.
///
/// Graph, coordinates and results are kept as JSON text so a backend can
/// persist them verbatim; decoding happens on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachePayload {
    pub start_coord: Coordinate,
    pub end_coord: Coordinate,
    pub raw_polyline: String,
    pub total_distance: f64,
    pub estimated_duration: f64,
    /// Adjacency map as JSON.
    pub graph_data: String,
    /// Node coordinates as JSON.
    pub node_mapping: String,
    pub dijkstra_result: Option<String>,
    pub astar_result: Option<String>,
    pub pso_result: Option<String>,
}

impl CachePayload {
    /// Serialize a synthesis and the results computed over it.
    pub fn encode(
        start_coord: Coordinate,
        end_coord: Coordinate,
        synthesis: &Synthesis,
        results: &BTreeMap<RouteAlgorithm, AlgorithmResult>,
    ) -> Result<Self> {
        let encode_result = |algorithm: RouteAlgorithm| -> Result<Option<String>> {
            results
                .get(&algorithm)
                .map(serde_json::to_string)
                .transpose()
                .map_err(Error::from)
        };
        Ok(Self {
            start_coord,
            end_coord,
            raw_polyline: synthesis.raw_polyline(),
            total_distance: synthesis.total_distance(),
            estimated_duration: synthesis.total_duration(),
            graph_data: serde_json::to_string(synthesis.graph.adjacency())?,
            node_mapping: serde_json::to_string(synthesis.graph.coordinates())?,
            dijkstra_result: encode_result(RouteAlgorithm::Dijkstra)?,
            astar_result: encode_result(RouteAlgorithm::AStar)?,
            pso_result: encode_result(RouteAlgorithm::Pso)?,
        })
    }

    /// Rebuild the cached graph, validating its edges.
    pub fn decode_graph(&self) -> Result<Graph> {
        let adjacency: BTreeMap<NodeId, BTreeMap<NodeId, EdgeAttributes>> =
            serde_json::from_str(&self.graph_data)?;
        let coordinates: BTreeMap<NodeId, Coordinate> = serde_json::from_str(&self.node_mapping)?;
        Graph::from_parts(adjacency, coordinates)
    }

    pub fn result_json(&self, algorithm: RouteAlgorithm) -> Option<&str> {
        match algorithm {
            RouteAlgorithm::Dijkstra => self.dijkstra_result.as_deref(),
            RouteAlgorithm::AStar => self.astar_result.as_deref(),
            RouteAlgorithm::Pso => self.pso_result.as_deref(),
        }
    }

    /// Decode one algorithm's stored result. `Ok(None)` when absent.
    pub fn decode_result(&self, algorithm: RouteAlgorithm) -> Result<Option<AlgorithmResult>> {
        self.result_json(algorithm)
            .map(serde_json::from_str)
            .transpose()
            .map_err(Error::from)
    }
}

/// One cached route with its bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: CachePayload,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u64,
    pub cache_hit_count: u64,
}

/// Aggregate counters over every entry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: u64,
    pub total_accesses: u64,
    pub total_hits: u64,
    /// `total_hits / total_accesses`, zero when nothing was accessed.
    pub hit_rate: f64,
    pub average_accesses: f64,
    /// Creation time of the newest entry.
    pub latest_entry: Option<DateTime<Utc>>,
    /// Entries created within the TTL window.
    pub recent_entries: u64,
}

impl CacheStats {
    pub fn from_totals(total_entries: u64, total_accesses: u64, total_hits: u64) -> Self {
        let ratio = |numerator: u64, denominator: u64| {
            if denominator == 0 {
                0.0
            } else {
                numerator as f64 / denominator as f64
            }
        };
        Self {
            total_entries,
            total_accesses,
            total_hits,
            hit_rate: ratio(total_hits, total_accesses),
            average_accesses: ratio(total_accesses, total_entries),
            latest_entry: None,
            recent_entries: 0,
        }
    }

    pub fn with_recency(
        mut self,
        latest_entry: Option<DateTime<Utc>>,
        recent_entries: u64,
    ) -> Self {
        self.latest_entry = latest_entry;
        self.recent_entries = recent_entries;
        self
    }
}

/// Expiry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: TimeDelta,
    /// Entries accessed at least this often are never evicted.
    pub min_access_count: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: TimeDelta::days(7),
            min_access_count: 2,
        }
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Cache contract used by the engine.
///
/// Every counter update happens atomically with the read or write that
/// causes it.
pub trait RouteCache: Send + Sync {
    /// Fresh entry for `key`, counting the access as a hit.
    ///
    /// Entries older than the TTL are misses and are left untouched.
    fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Insert or overwrite the payload for `key`.
    ///
    /// A new entry starts at one access and zero hits. An existing entry gets
    /// the new payload, a fresh `created_at` and one more access; its hit
    /// count is kept.
    fn store(&self, key: &CacheKey, payload: CachePayload) -> Result<()>;

    /// Delete entries older than the TTL whose access count is below the
    /// floor. Returns how many were removed.
    fn evict_expired(&self) -> Result<usize>;

    fn stats(&self) -> Result<CacheStats>;
}

impl<T: RouteCache + ?Sized> RouteCache for Arc<T> {
    fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        (**self).lookup(key)
    }

    fn store(&self, key: &CacheKey, payload: CachePayload) -> Result<()> {
        (**self).store(key, payload)
    }

    fn evict_expired(&self) -> Result<usize> {
        (**self).evict_expired()
    }

    fn stats(&self) -> Result<CacheStats> {
        (**self).stats()
    }
}

impl<T: RouteCache + ?Sized> RouteCache for Box<T> {
    fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        (**self).lookup(key)
    }

    fn store(&self, key: &CacheKey, payload: CachePayload) -> Result<()> {
        (**self).store(key, payload)
    }

    fn evict_expired(&self) -> Result<usize> {
        (**self).evict_expired()
    }

    fn stats(&self) -> Result<CacheStats> {
        (**self).stats()
    }
}
