//! Core library for keepgoing.
//!
//! This crate provides the habit domain model and database operations,
//! independent of any transport layer (HTTP, MCP, CLI).
//!
//! # Usage
//!
//! ```no_run
//! use keepgoing_core::db::Database;
//! use keepgoing_core::models::*;
//!
//! let db = Database::open_default()?;
//! db.migrate()?;
//!
//! let habits = db.all_habits()?;
//! # Ok::<(), keepgoing_core::Error>(())
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod streak;
pub mod validate;
pub mod week;

// Re-export commonly used types at crate root
pub use db::Database;
pub use error::{Error, Result};
