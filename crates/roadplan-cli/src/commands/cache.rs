//! Cache maintenance commands.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use crate::commands::EngineOptions;
use crate::output::Renderer;

pub fn handle_cache_stats<W: Write>(
    options: &EngineOptions,
    renderer: &Renderer,
    out: &mut W,
) -> Result<()> {
    let cache = options.open_cache()?;
    let stats = cache.stats().context("failed to read cache statistics")?;
    renderer.stats(out, &stats)
}

/// Delete stale, rarely used entries.
pub fn handle_cache_evict<W: Write>(
    options: &EngineOptions,
    renderer: &Renderer,
    out: &mut W,
) -> Result<()> {
    let cache = options.open_cache()?;
    let removed = cache
        .evict_expired()
        .context("failed to evict expired cache entries")?;
    info!(removed, "cache eviction finished");
    renderer.eviction(out, removed)
}
