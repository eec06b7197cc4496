//! Configuration and dependency initialization.
mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::{
    ContentBackend, DestinationSettings, MigratorConfig, Mode, PinataSettings,
    DEFAULT_BATCH_SIZE, DEFAULT_PINATA_API_URL,
};
