//! Command-line front end for the roadplan route planning engine.
//!
//! The binary wires [`roadplan_lib::RouteEngine`] to JSON fixture providers
//! and a SQLite or in-memory cache; this library holds the command handlers,
//! renderers and logging setup so they can be tested directly.

pub mod commands;
pub mod logging;
pub mod output;
pub mod terminal;

#[cfg(test)]
pub(crate) mod test_helpers;
