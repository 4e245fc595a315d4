// Subcommand handlers. `main.rs` parses arguments and dispatches here; this
// module owns wiring the engine to fixture providers and a cache backend.

pub mod cache;
pub mod compare;
pub mod route;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use roadplan_lib::{
    default_cache_path, CacheConfig, CachingGeocoder, EngineConfig, FixtureProvider, Heuristic,
    MemoryRouteCache, RouteCache, RouteEngine, SqliteRouteCache,
};
use tracing::debug;

/// Engine assembled by the CLI.
pub type CliEngine =
    RouteEngine<CachingGeocoder<Arc<FixtureProvider>>, Arc<FixtureProvider>, Box<dyn RouteCache>>;

/// Where the route cache lives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CacheLocation {
    /// The per-user data directory.
    #[default]
    Default,
    File(PathBuf),
    /// Process-local cache, discarded on exit.
    Memory,
}

impl CacheLocation {
    pub fn from_flags(cache_db: Option<PathBuf>, memory: bool) -> Self {
        match (cache_db, memory) {
            (_, true) => CacheLocation::Memory,
            (Some(path), false) => CacheLocation::File(path),
            (None, false) => CacheLocation::Default,
        }
    }

    pub fn open(&self, config: CacheConfig) -> Result<Box<dyn RouteCache>> {
        let path = match self {
            CacheLocation::Memory => {
                debug!("using in-memory route cache");
                return Ok(Box::new(MemoryRouteCache::new(config)));
            }
            CacheLocation::File(path) => path.clone(),
            CacheLocation::Default => {
                default_cache_path().context("failed to resolve the default cache location")?
            }
        };
        debug!(path = %path.display(), "opening route cache");
        let cache = SqliteRouteCache::open(&path, config)
            .with_context(|| format!("failed to open route cache at {}", path.display()))?;
        Ok(Box::new(cache))
    }
}

/// Global options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub fixture: Option<PathBuf>,
    pub cache: CacheLocation,
    pub heuristic: Option<Heuristic>,
    pub seed: Option<u64>,
}

impl EngineOptions {
    /// Environment configuration with command-line overrides applied.
    pub fn engine_config(&self) -> EngineConfig {
        self.apply(EngineConfig::from_env())
    }

    fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(heuristic) = self.heuristic {
            config.astar_heuristic = heuristic;
        }
        if let Some(seed) = self.seed {
            config.pso.seed = Some(seed);
        }
        config
    }

    pub fn open_cache(&self) -> Result<Box<dyn RouteCache>> {
        self.cache.open(self.engine_config().cache)
    }

    pub fn build_engine(&self) -> Result<CliEngine> {
        let fixture = self
            .fixture
            .as_deref()
            .context("no directions fixture given; pass --fixture <PATH>")?;
        let provider = Arc::new(
            FixtureProvider::load(fixture)
                .with_context(|| format!("failed to load fixture {}", fixture.display()))?,
        );
        let config = self.engine_config();
        let cache = self.cache.open(config.cache)?;
        Ok(RouteEngine::new(
            CachingGeocoder::new(provider.clone()),
            provider,
            cache,
            config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_flag_wins_over_path() {
        assert_eq!(
            CacheLocation::from_flags(Some(PathBuf::from("a.db")), true),
            CacheLocation::Memory
        );
        assert_eq!(
            CacheLocation::from_flags(Some(PathBuf::from("a.db")), false),
            CacheLocation::File(PathBuf::from("a.db"))
        );
        assert_eq!(CacheLocation::from_flags(None, false), CacheLocation::Default);
    }

    #[test]
    fn flags_override_configuration() {
        let options = EngineOptions {
            heuristic: Some(Heuristic::Grid),
            seed: Some(9),
            ..EngineOptions::default()
        };
        let config = options.apply(EngineConfig::default());
        assert_eq!(config.astar_heuristic, Heuristic::Grid);
        assert_eq!(config.pso.seed, Some(9));

        let untouched = EngineOptions::default().apply(EngineConfig::default());
        assert_eq!(untouched, EngineConfig::default());
    }

    #[test]
    fn building_without_fixture_is_an_error() {
        let options = EngineOptions {
            cache: CacheLocation::Memory,
            ..EngineOptions::default()
        };
        let err = options.build_engine().err().expect("missing fixture");
        assert!(err.to_string().contains("--fixture"));
    }

    #[test]
    fn file_cache_is_created_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");
        let cache = CacheLocation::File(path.clone())
            .open(CacheConfig::default())
            .unwrap();
        assert_eq!(cache.stats().unwrap().total_entries, 0);
        assert!(path.exists());
    }
}
