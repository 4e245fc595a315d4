//! Engine configuration.
//!
//! # Environment Variables
//!
//! - `ROADPLAN_CACHE_TTL_DAYS`: cache entry lifetime in days (default: 7)
//! - `ROADPLAN_CACHE_MIN_ACCESS`: accesses that protect an entry from eviction (default: 2)
//! - `ROADPLAN_ASTAR_HEURISTIC`: `great-circle`, `planar` (default) or `grid`
//! - `ROADPLAN_PSO_POPULATION`: particles per swarm (default: 50)
//! - `ROADPLAN_PSO_ITERATIONS`: iteration cap (default: 100)
//! - `ROADPLAN_PSO_SEED`: fixed RNG seed (default: entropy)
//!
//! Values that fail to parse are logged and ignored.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::TimeDelta;
use directories::ProjectDirs;
use tracing::warn;

use crate::cache::CacheConfig;
use crate::error::{Error, Result};
use crate::path::Heuristic;
use crate::pso::PsoConfig;

/// Default filename for the SQLite route cache.
const CACHE_FILENAME: &str = "route_cache.db";

pub const ENV_CACHE_TTL_DAYS: &str = "ROADPLAN_CACHE_TTL_DAYS";
pub const ENV_CACHE_MIN_ACCESS: &str = "ROADPLAN_CACHE_MIN_ACCESS";
pub const ENV_ASTAR_HEURISTIC: &str = "ROADPLAN_ASTAR_HEURISTIC";
pub const ENV_PSO_POPULATION: &str = "ROADPLAN_PSO_POPULATION";
pub const ENV_PSO_ITERATIONS: &str = "ROADPLAN_PSO_ITERATIONS";
pub const ENV_PSO_SEED: &str = "ROADPLAN_PSO_SEED";

/// Tunables for [`RouteEngine`](crate::engine::RouteEngine).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub astar_heuristic: Heuristic,
    pub pso: PsoConfig,
}

impl EngineConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(days) = parse_var::<u32, _>(&lookup, ENV_CACHE_TTL_DAYS) {
            config.cache.ttl = TimeDelta::days(i64::from(days));
        }
        if let Some(floor) = parse_var(&lookup, ENV_CACHE_MIN_ACCESS) {
            config.cache.min_access_count = floor;
        }
        if let Some(heuristic) = parse_var(&lookup, ENV_ASTAR_HEURISTIC) {
            config.astar_heuristic = heuristic;
        }
        if let Some(population) = parse_var::<usize, _>(&lookup, ENV_PSO_POPULATION) {
            if population == 0 {
                warn!(variable = ENV_PSO_POPULATION, "population must be positive; keeping default");
            } else {
                config.pso.population_size = population;
            }
        }
        if let Some(iterations) = parse_var(&lookup, ENV_PSO_ITERATIONS) {
            config.pso.max_iterations = iterations;
        }
        if let Some(seed) = parse_var(&lookup, ENV_PSO_SEED) {
            config.pso.seed = Some(seed);
        }

        config
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(variable = name, value = %raw, error = %err, "ignoring invalid configuration value");
            None
        }
    }
}

/// Resolve the default cache location using platform-specific project directories.
pub fn default_cache_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("com", "roadplan", "roadplan").ok_or(Error::ProjectDirsUnavailable)?;
    Ok(dirs.data_dir().join(CACHE_FILENAME))
}
