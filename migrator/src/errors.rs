//! Error types for the migrator binary.
use migration_pipeline::{DestinationError, MigrationError, VerifyError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigratorError {
    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Destination could not be set up.
    #[error("Destination error: {0}")]
    DestinationError(#[from] DestinationError),

    /// A migration run was aborted.
    #[error("Migration error: {0}")]
    MigrationError(#[from] MigrationError),

    /// The source snapshot for verification could not be taken.
    #[error("Verification error: {0}")]
    VerifyError(#[from] VerifyError),

    /// The run finished but left work undone.
    #[error("Run incomplete: {failed_windows} failed windows, {unverified} unverified records")]
    Incomplete {
        failed_windows: usize,
        unverified: usize,
    },
}

impl MigratorError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
