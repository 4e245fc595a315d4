//! Route command handler: plan one route between two addresses.

use std::io::Write;

use anyhow::{Context, Result};
use roadplan_lib::{Objective, RouteAlgorithm};
use tracing::info;

use crate::commands::EngineOptions;
use crate::output::Renderer;

#[derive(Debug, Clone)]
pub struct RouteCommandArgs {
    pub from: String,
    pub to: String,
    pub algorithm: RouteAlgorithm,
    /// Objectives to re-score the returned path with; empty keeps the
    /// algorithm's own profile.
    pub objectives: Vec<Objective>,
}

impl RouteCommandArgs {
    fn objectives(&self) -> Option<&[Objective]> {
        (!self.objectives.is_empty()).then_some(self.objectives.as_slice())
    }
}

pub fn handle_route_command<W: Write>(
    options: &EngineOptions,
    args: &RouteCommandArgs,
    renderer: &Renderer,
    out: &mut W,
) -> Result<()> {
    let engine = options.build_engine()?;
    let plan = engine
        .plan_route(&args.from, &args.to, args.algorithm, args.objectives())
        .with_context(|| format!("failed to plan a route from {} to {}", args.from, args.to))?;
    info!(
        algorithm = %plan.algorithm,
        success = plan.success,
        from_cache = plan.from_cache,
        "route planned"
    );
    renderer.plan(out, &plan)
}
