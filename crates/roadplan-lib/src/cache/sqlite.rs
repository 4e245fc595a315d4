use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::distance::Coordinate;
use crate::error::Result;

use super::{
    CacheConfig, CacheEntry, CacheKey, CachePayload, CacheStats, Clock, RouteCache, SystemClock,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS route_cache (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_address TEXT NOT NULL,
    end_address TEXT NOT NULL,
    start_lat REAL NOT NULL,
    start_lng REAL NOT NULL,
    end_lat REAL NOT NULL,
    end_lng REAL NOT NULL,
    raw_polyline TEXT NOT NULL DEFAULT '',
    total_distance REAL NOT NULL DEFAULT 0,
    estimated_duration REAL NOT NULL DEFAULT 0,
    graph_data TEXT NOT NULL,
    node_mapping TEXT NOT NULL,
    dijkstra_result TEXT,
    astar_result TEXT,
    pso_result TEXT,
    created_at INTEGER NOT NULL,
    last_accessed_at INTEGER NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 1,
    cache_hit_count INTEGER NOT NULL DEFAULT 0,
    UNIQUE (start_address, end_address)
);
CREATE INDEX IF NOT EXISTS idx_route_cache_created ON route_cache (created_at);
CREATE INDEX IF NOT EXISTS idx_route_cache_access ON route_cache (access_count DESC);
";

const SELECT_ENTRY: &str = "
SELECT start_address, end_address, start_lat, start_lng, end_lat, end_lng,
       raw_polyline, total_distance, estimated_duration, graph_data, node_mapping,
       dijkstra_result, astar_result, pso_result,
       created_at, last_accessed_at, access_count, cache_hit_count
FROM route_cache
WHERE start_address = ?1 AND end_address = ?2 AND created_at >= ?3
";

/// SQLite-backed cache. Timestamps are stored as Unix milliseconds.
///
/// The connection sits behind a mutex and every lookup runs its read and
/// counter update in one transaction, so concurrent hits never lose an
/// increment.
#[derive(Debug)]
pub struct SqliteRouteCache {
    connection: Mutex<Connection>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl SqliteRouteCache {
    /// Open (creating if needed) the cache database at `path`.
    pub fn open(path: &Path, config: CacheConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let connection = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened route cache database");
        Self::from_connection(connection, config, Arc::new(SystemClock))
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory(config: CacheConfig) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, config, Arc::new(SystemClock))
    }

    /// Wrap an existing connection, creating the schema if it is missing.
    pub fn from_connection(
        connection: Connection,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
            config,
            clock,
        })
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn cutoff_millis(&self, now: DateTime<Utc>) -> i64 {
        (now - self.config.ttl).timestamp_millis()
    }
}

impl RouteCache for SqliteRouteCache {
    fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let now = self.clock.now();
        let mut connection = self.connection();
        let tx = connection.transaction()?;

        let updated = tx.execute(
            "UPDATE route_cache
             SET access_count = access_count + 1,
                 cache_hit_count = cache_hit_count + 1,
                 last_accessed_at = ?3
             WHERE start_address = ?1 AND end_address = ?2 AND created_at >= ?4",
            params![
                key.start,
                key.end,
                now.timestamp_millis(),
                self.cutoff_millis(now)
            ],
        )?;
        if updated == 0 {
            return Ok(None);
        }

        let entry = tx
            .query_row(
                SELECT_ENTRY,
                params![key.start, key.end, self.cutoff_millis(now)],
                row_to_entry,
            )
            .optional()?;
        tx.commit()?;
        Ok(entry)
    }

    fn store(&self, key: &CacheKey, payload: CachePayload) -> Result<()> {
        let now = self.clock.now().timestamp_millis();
        self.connection().execute(
            "INSERT INTO route_cache (
                 start_address, end_address, start_lat, start_lng, end_lat, end_lng,
                 raw_polyline, total_distance, estimated_duration, graph_data, node_mapping,
                 dijkstra_result, astar_result, pso_result,
                 created_at, last_accessed_at, access_count, cache_hit_count
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15, 1, 0)
             ON CONFLICT (start_address, end_address) DO UPDATE SET
                 start_lat = excluded.start_lat,
                 start_lng = excluded.start_lng,
                 end_lat = excluded.end_lat,
                 end_lng = excluded.end_lng,
                 raw_polyline = excluded.raw_polyline,
                 total_distance = excluded.total_distance,
                 estimated_duration = excluded.estimated_duration,
                 graph_data = excluded.graph_data,
                 node_mapping = excluded.node_mapping,
                 dijkstra_result = excluded.dijkstra_result,
                 astar_result = excluded.astar_result,
                 pso_result = excluded.pso_result,
                 created_at = excluded.created_at,
                 last_accessed_at = excluded.last_accessed_at,
                 access_count = route_cache.access_count + 1",
            params![
                key.start,
                key.end,
                payload.start_coord.lat,
                payload.start_coord.lng,
                payload.end_coord.lat,
                payload.end_coord.lng,
                payload.raw_polyline,
                payload.total_distance,
                payload.estimated_duration,
                payload.graph_data,
                payload.node_mapping,
                payload.dijkstra_result,
                payload.astar_result,
                payload.pso_result,
                now,
            ],
        )?;
        tracing::info!(key = %key, "stored route cache entry");
        Ok(())
    }

    fn evict_expired(&self) -> Result<usize> {
        let cutoff = self.cutoff_millis(self.clock.now());
        let floor = i64::try_from(self.config.min_access_count).unwrap_or(i64::MAX);
        let removed = self.connection().execute(
            "DELETE FROM route_cache WHERE created_at < ?1 AND access_count < ?2",
            params![cutoff, floor],
        )?;
        if removed > 0 {
            tracing::info!(removed, "evicted expired route cache entries");
        }
        Ok(removed)
    }

    fn stats(&self) -> Result<CacheStats> {
        let cutoff = self.cutoff_millis(self.clock.now());
        let (entries, accesses, hits, latest, recent) = self.connection().query_row(
            "SELECT COUNT(*), COALESCE(SUM(access_count), 0), COALESCE(SUM(cache_hit_count), 0),
                    MAX(created_at), COALESCE(SUM(created_at >= ?1), 0)
             FROM route_cache",
            params![cutoff],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )?;
        let latest = latest
            .map(|millis| millis_to_datetime(millis, 3))
            .transpose()?;
        Ok(CacheStats::from_totals(
            entries.max(0) as u64,
            accesses.max(0) as u64,
            hits.max(0) as u64,
        )
        .with_recency(latest, recent.max(0) as u64))
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    Ok(CacheEntry {
        key: CacheKey {
            start: row.get(0)?,
            end: row.get(1)?,
        },
        payload: CachePayload {
            start_coord: Coordinate::new(row.get(2)?, row.get(3)?),
            end_coord: Coordinate::new(row.get(4)?, row.get(5)?),
            raw_polyline: row.get(6)?,
            total_distance: row.get(7)?,
            estimated_duration: row.get(8)?,
            graph_data: row.get(9)?,
            node_mapping: row.get(10)?,
            dijkstra_result: row.get(11)?,
            astar_result: row.get(12)?,
            pso_result: row.get(13)?,
        },
        created_at: millis_to_datetime(row.get(14)?, 14)?,
        last_accessed_at: millis_to_datetime(row.get(15)?, 15)?,
        access_count: row.get::<_, i64>(16)?.max(0) as u64,
        cache_hit_count: row.get::<_, i64>(17)?.max(0) as u64,
    })
}

fn millis_to_datetime(millis: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{contract, ManualClock};

    fn cache() -> (SqliteRouteCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(contract::epoch()));
        let connection = Connection::open_in_memory().expect("in-memory db");
        let cache = SqliteRouteCache::from_connection(connection, CacheConfig::default(), clock.clone())
            .expect("schema");
        (cache, clock)
    }

    #[test]
    fn store_is_idempotent_for_payload() {
        contract::store_is_idempotent_for_payload(&cache().0);
    }

    #[test]
    fn counters_track_hits_and_accesses() {
        contract::counters_track_hits_and_accesses(&cache().0);
    }

    #[test]
    fn upsert_keeps_hits_and_replaces_payload() {
        contract::upsert_keeps_hits_and_replaces_payload(&cache().0);
    }

    #[test]
    fn keys_are_normalised_and_ordered() {
        contract::keys_are_normalised_and_ordered(&cache().0);
    }

    #[test]
    fn stale_entries_miss_without_counting() {
        let (cache, clock) = cache();
        contract::stale_entries_miss_without_counting(&cache, &clock);
    }

    #[test]
    fn eviction_spares_hot_entries() {
        let (cache, clock) = cache();
        contract::eviction_spares_hot_entries(&cache, &clock);
    }

    #[test]
    fn stats_report_recency() {
        let (cache, clock) = cache();
        contract::stats_report_recency(&cache, &clock);
    }

    #[test]
    fn entries_survive_reopening_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("route_cache.db");
        let key = CacheKey::new("A", "B");
        {
            let cache = SqliteRouteCache::open(&path, CacheConfig::default()).unwrap();
            cache.store(&key, contract::payload("persisted")).unwrap();
        }
        let cache = SqliteRouteCache::open(&path, CacheConfig::default()).unwrap();
        let entry = cache.lookup(&key).unwrap().expect("persisted entry");
        assert_eq!(entry.payload, contract::payload("persisted"));
        assert_eq!((entry.access_count, entry.cache_hit_count), (2, 1));
    }
}
