//! Transport layers for keepgoing: the HTTP API, the MCP server, and the
//! sync client used for remote mode. Domain logic lives in `keepgoing-core`.

pub mod api;
pub mod client;
pub mod mcp;

// Re-export the core so binaries and tests reach everything through one crate
pub use keepgoing_core::{db, error, models, streak, validate, week, Database, Error};
