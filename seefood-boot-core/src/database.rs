//! Database connection pool construction.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info};

use crate::config::DatabaseConfig;
use crate::{Error, Result};

/// Build the connection pool once the readiness probe has passed.
///
/// The probe only proves the TCP port is open; authentication and database
/// selection can still fail here, which is fatal to the sequence.
pub async fn init_database(config: &DatabaseConfig) -> Result<PgPool> {
    info!("Connecting to database");

    let pool: PgPool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .connect(&config.url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {e}");
            Error::Database(e)
        })?;

    info!("Database connected");

    Ok(pool)
}
