//! Migrator entry point.

use std::env;

use dotenv::dotenv;
use migrator::{Dependencies, MigratorConfig, MigratorError};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("migrator=info,migration_pipeline=info"));

    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();
    }

    info!(
        service_name = "migrator",
        service_version = env!("CARGO_PKG_VERSION"),
        json,
        "Tracing initialized"
    );
}

#[tokio::main]
async fn main() -> Result<(), MigratorError> {
    dotenv().ok();
    init_tracing();

    let config = match MigratorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e);
        }
    };

    let deps = match Dependencies::new(&config) {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let summary = match deps.runner.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Migration aborted");
            return Err(e);
        }
    };

    summary.log();

    if summary.is_complete() {
        info!("Migration completed successfully");
        Ok(())
    } else {
        Err(MigratorError::Incomplete {
            failed_windows: summary.failed_windows(),
            unverified: summary.unverified(),
        })
    }
}
