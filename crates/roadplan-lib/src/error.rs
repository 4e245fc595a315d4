use std::path::PathBuf;

use thiserror::Error;

use crate::graph::NodeId;

/// Convenient result alias for the route planning library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The geocoder could not resolve an address to a coordinate.
    #[error("could not resolve address '{address}'; check the spelling or be more specific")]
    AddressResolution { address: String },

    /// The directions provider returned no usable route variant.
    #[error("no driving directions available between {start} and {end}; try again later")]
    DirectionsUnavailable { start: String, end: String },

    /// No edge could be produced from the route variants.
    #[error("could not build a routing graph from {variants} route variant(s)")]
    GraphSynthesis { variants: usize },

    /// A path references an edge that the graph does not contain.
    ///
    /// This indicates a mismatch between the graph and the algorithm that
    /// produced the path and is never retried.
    #[error("path edge {from} -> {to} is missing from the graph")]
    MissingEdge { from: NodeId, to: NodeId },

    /// An edge references a node that the graph does not contain.
    #[error("graph edge {from} -> {to} references an unknown node")]
    MalformedGraph { from: NodeId, to: NodeId },

    /// Raised when an algorithm identifier is not recognised.
    #[error("unknown algorithm '{name}'; expected one of dijkstra, astar, pso")]
    UnknownAlgorithm { name: String },

    /// Raised when an objective name is not recognised.
    #[error("unknown objective '{name}'; expected one of distance, congestion, construction")]
    UnknownObjective { name: String },

    /// Raised when a heuristic name is not recognised.
    #[error("unknown heuristic '{name}'; expected one of great-circle, planar, grid")]
    UnknownHeuristic { name: String },

    /// No suitable project directories could be resolved for this platform.
    #[error("failed to resolve project directories for the route cache")]
    ProjectDirsUnavailable,

    /// Raised when a fixture file could not be parsed.
    #[error("failed to load fixture {}: {message}", path.display())]
    FixtureLoad { path: PathBuf, message: String },

    /// A cache entry is missing a payload column it should always carry.
    #[error("cache entry for {start} -> {end} has no {field} payload")]
    CachePayloadMissing {
        start: String,
        end: String,
        field: &'static str,
    },

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for JSON (de)serialisation errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
