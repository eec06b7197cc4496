//! # Migrator
//!
//! Moves creators and requests from the exchange subgraph into the new
//! exchange contract, then reads them back to confirm.
//!
//! ## Modules
//!
//! - [`config`]: environment configuration and dependency wiring
//! - [`runner`]: runs migration and verification passes, retries failed windows
//! - [`errors`]: error types for the binary

pub mod config;
pub mod errors;
pub mod runner;

pub use config::{Dependencies, MigratorConfig, Mode};
pub use errors::MigratorError;
pub use runner::{RunSettings, RunSummary, Runner};
