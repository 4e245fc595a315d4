use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use roadplan_lib::{Heuristic, Objective, RouteAlgorithm};

use roadplan_cli::commands::cache::{handle_cache_evict, handle_cache_stats};
use roadplan_cli::commands::compare::{handle_compare_command, CompareCommandArgs};
use roadplan_cli::commands::route::{handle_route_command, RouteCommandArgs};
use roadplan_cli::commands::{CacheLocation, EngineOptions};
use roadplan_cli::logging::{init_logging, LoggingConfig};
use roadplan_cli::output::{OutputFormat, Renderer};
use roadplan_cli::terminal::ColorPalette;

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan driving routes with Dijkstra, A* and PSO")]
struct Cli {
    /// JSON fixture providing geocodes and route variants.
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// SQLite cache file (defaults to the per-user data directory).
    #[arg(long, global = true, conflicts_with = "memory_cache")]
    cache_db: Option<PathBuf>,

    /// Keep the cache in memory for this invocation only.
    #[arg(long, global = true)]
    memory_cache: bool,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// A* heuristic, overriding ROADPLAN_ASTAR_HEURISTIC.
    #[arg(long, global = true, value_enum)]
    heuristic: Option<HeuristicArg>,

    /// PSO random seed, overriding ROADPLAN_PSO_SEED.
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan a route between two addresses.
    Route {
        #[arg(long = "from")]
        from: String,
        #[arg(long = "to")]
        to: String,
        #[arg(long, value_enum, default_value_t = AlgorithmArg::Dijkstra)]
        algorithm: AlgorithmArg,
        /// Re-score the path with these objectives, comma separated.
        #[arg(long, value_delimiter = ',')]
        objectives: Vec<Objective>,
    },
    /// Plan with several algorithms and report the cheapest.
    Compare {
        #[arg(long = "from")]
        from: String,
        #[arg(long = "to")]
        to: String,
        /// Algorithms to compare, comma separated (default: all).
        #[arg(long, value_enum, value_delimiter = ',')]
        algorithms: Vec<AlgorithmArg>,
    },
    /// List the available algorithms.
    Algorithms,
    /// Inspect or maintain the route cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Show entry, access and hit counters.
    Stats,
    /// Remove expired entries that were rarely used.
    Evict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AlgorithmArg {
    Dijkstra,
    #[value(alias = "a-star", alias = "a_star")]
    Astar,
    Pso,
}

impl From<AlgorithmArg> for RouteAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Dijkstra => RouteAlgorithm::Dijkstra,
            AlgorithmArg::Astar => RouteAlgorithm::AStar,
            AlgorithmArg::Pso => RouteAlgorithm::Pso,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HeuristicArg {
    GreatCircle,
    Planar,
    Grid,
}

impl From<HeuristicArg> for Heuristic {
    fn from(arg: HeuristicArg) -> Self {
        match arg {
            HeuristicArg::GreatCircle => Heuristic::GreatCircle,
            HeuristicArg::Planar => Heuristic::Planar,
            HeuristicArg::Grid => Heuristic::Grid,
        }
    }
}

fn main() -> Result<()> {
    init_logging(&LoggingConfig::from_env());
    let cli = Cli::parse();

    let options = EngineOptions {
        fixture: cli.fixture,
        cache: CacheLocation::from_flags(cli.cache_db, cli.memory_cache),
        heuristic: cli.heuristic.map(Heuristic::from),
        seed: cli.seed,
    };
    let renderer = Renderer::new(cli.format, ColorPalette::detect());
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Route {
            from,
            to,
            algorithm,
            objectives,
        } => {
            let args = RouteCommandArgs {
                from,
                to,
                algorithm: algorithm.into(),
                objectives,
            };
            handle_route_command(&options, &args, &renderer, &mut out)?;
        }
        Command::Compare {
            from,
            to,
            algorithms,
        } => {
            let args = CompareCommandArgs {
                from,
                to,
                algorithms: algorithms.into_iter().map(RouteAlgorithm::from).collect(),
            };
            handle_compare_command(&options, &args, &renderer, &mut out)?;
        }
        Command::Algorithms => renderer.algorithms(&mut out, &RouteAlgorithm::ALL)?,
        Command::Cache { action } => match action {
            CacheAction::Stats => handle_cache_stats(&options, &renderer, &mut out)?,
            CacheAction::Evict => handle_cache_evict(&options, &renderer, &mut out)?,
        },
    }

    out.flush()?;
    Ok(())
}
