//! Compare command handler: plan with several algorithms and rank them.

use std::io::Write;

use anyhow::{Context, Result};
use roadplan_lib::RouteAlgorithm;
use tracing::info;

use crate::commands::EngineOptions;
use crate::output::Renderer;

#[derive(Debug, Clone)]
pub struct CompareCommandArgs {
    pub from: String,
    pub to: String,
    /// Algorithms to compare; empty compares all of them.
    pub algorithms: Vec<RouteAlgorithm>,
}

pub fn handle_compare_command<W: Write>(
    options: &EngineOptions,
    args: &CompareCommandArgs,
    renderer: &Renderer,
    out: &mut W,
) -> Result<()> {
    let engine = options.build_engine()?;
    let report = engine
        .compare_algorithms(&args.from, &args.to, &args.algorithms)
        .with_context(|| format!("failed to compare routes from {} to {}", args.from, args.to))?;
    info!(best = ?report.best, compared = report.results.len(), "comparison finished");
    renderer.comparison(out, &report)
}
