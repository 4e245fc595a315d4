//! Rendering of planning results, comparisons and cache statistics.
//!
//! Every renderer writes to an arbitrary [`Write`] so commands print to
//! stdout while tests capture into a buffer.

use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use roadplan_lib::{CacheStats, ComparisonReport, PlanResult, RouteAlgorithm};
use serde::Serialize;

use crate::terminal::{format_meters, format_with_separators, ColorPalette};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Pretty-printed JSON of the underlying result.
    Json,
}

/// Formats results in one [`OutputFormat`] with one palette.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    pub format: OutputFormat,
    pub palette: ColorPalette,
}

impl Renderer {
    pub fn new(format: OutputFormat, palette: ColorPalette) -> Self {
        Self { format, palette }
    }

    pub fn plan<W: Write>(&self, out: &mut W, plan: &PlanResult) -> Result<()> {
        match self.format {
            OutputFormat::Json => write_json(out, plan),
            OutputFormat::Text => self.plan_text(out, plan),
        }
    }

    pub fn comparison<W: Write>(&self, out: &mut W, report: &ComparisonReport) -> Result<()> {
        match self.format {
            OutputFormat::Json => write_json(out, report),
            OutputFormat::Text => self.comparison_text(out, report),
        }
    }

    pub fn stats<W: Write>(&self, out: &mut W, stats: &CacheStats) -> Result<()> {
        if self.format == OutputFormat::Json {
            return write_json(out, stats);
        }
        writeln!(out, "Cache entries: {}", format_with_separators(stats.total_entries))?;
        writeln!(out, "Total accesses: {}", format_with_separators(stats.total_accesses))?;
        writeln!(out, "Cache hits: {}", format_with_separators(stats.total_hits))?;
        writeln!(out, "Hit rate: {:.1}%", stats.hit_rate * 100.0)?;
        writeln!(out, "Average accesses per entry: {:.2}", stats.average_accesses)?;
        writeln!(out, "Recent entries: {}", format_with_separators(stats.recent_entries))?;
        match stats.latest_entry {
            Some(latest) => writeln!(
                out,
                "Latest entry: {}",
                latest.format("%Y-%m-%d %H:%M:%S UTC")
            )?,
            None => writeln!(out, "Latest entry: none")?,
        }
        Ok(())
    }

    pub fn eviction<W: Write>(&self, out: &mut W, removed: usize) -> Result<()> {
        match self.format {
            OutputFormat::Json => write_json(out, &serde_json::json!({ "removed": removed })),
            OutputFormat::Text => {
                writeln!(out, "Evicted {removed} expired cache entries")?;
                Ok(())
            }
        }
    }

    pub fn algorithms<W: Write>(&self, out: &mut W, algorithms: &[RouteAlgorithm]) -> Result<()> {
        if self.format == OutputFormat::Json {
            let listing: Vec<_> = algorithms
                .iter()
                .map(|algorithm| {
                    serde_json::json!({
                        "id": algorithm.as_str(),
                        "name": algorithm.display_name(),
                        "description": algorithm.description(),
                    })
                })
                .collect();
            return write_json(out, &listing);
        }
        let p = &self.palette;
        for algorithm in algorithms {
            writeln!(
                out,
                "{}{:<9}{} {}",
                p.cyan,
                algorithm.as_str(),
                p.reset,
                algorithm.description()
            )?;
        }
        Ok(())
    }

    fn plan_text<W: Write>(&self, out: &mut W, plan: &PlanResult) -> Result<()> {
        let p = &self.palette;
        writeln!(
            out,
            "{}{}{} -> {}{}{}",
            p.white_bold, plan.start_address, p.reset, p.white_bold, plan.end_address, p.reset
        )?;
        writeln!(
            out,
            "Algorithm: {}{}{} ({})",
            p.cyan,
            plan.algorithm.display_name(),
            p.reset,
            origin(plan.from_cache)
        )?;

        if !plan.success {
            writeln!(out, "{}No route between these addresses{}", p.red, p.reset)?;
            return Ok(());
        }

        writeln!(out, "Cost: {:.3}", plan.cost)?;
        if let Some(distance) = plan.path_distance {
            writeln!(out, "Distance: {}", format_meters(distance))?;
        }
        if let Some(parts) = &plan.breakdown {
            writeln!(
                out,
                "Breakdown: distance {}, congestion {:.3}, construction {:.3}, weighted total {:.3}",
                format_meters(parts.distance),
                parts.congestion,
                parts.construction,
                parts.total
            )?;
        }
        let path: Vec<String> = plan.path.iter().map(ToString::to_string).collect();
        writeln!(out, "Path ({} nodes): {}", plan.path.len(), path.join(" -> "))?;
        writeln!(
            out,
            "{}Visited {} nodes in {:.3} ms{}",
            p.gray,
            format_with_separators(plan.metrics.nodes_visited as u64),
            plan.metrics.execution_time_ms,
            p.reset
        )?;
        Ok(())
    }

    fn comparison_text<W: Write>(&self, out: &mut W, report: &ComparisonReport) -> Result<()> {
        let p = &self.palette;
        if let Some(first) = report.results.first() {
            writeln!(
                out,
                "Comparing algorithms for {}{}{} -> {}{}{}",
                p.white_bold,
                first.start_address,
                p.reset,
                p.white_bold,
                first.end_address,
                p.reset
            )?;
        }
        for plan in &report.results {
            let (cost, distance) = if plan.success {
                (
                    format!("{:.3}", plan.cost),
                    plan.path_distance.map(format_meters).unwrap_or_default(),
                )
            } else {
                ("unreachable".to_string(), "-".to_string())
            };
            writeln!(
                out,
                "  {}{:<9}{} cost {:>14}  distance {:>10}  nodes {:>3}  visited {:>7}  {}",
                p.cyan,
                plan.algorithm.as_str(),
                p.reset,
                cost,
                distance,
                plan.path.len(),
                format_with_separators(plan.metrics.nodes_visited as u64),
                origin(plan.from_cache)
            )?;
        }
        match report.best {
            Some(best) => writeln!(out, "Best: {}{}{}", p.green, best.display_name(), p.reset)?,
            None => writeln!(out, "Best: {}none, destination unreachable{}", p.red, p.reset)?,
        }
        Ok(())
    }
}

fn origin(from_cache: bool) -> &'static str {
    if from_cache {
        "cache hit"
    } else {
        "computed"
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
