//! Connection pool for staging writes.
//!
//! A run holds one connection from its first page to its last, so the pool
//! stays small and keeps no warm spares.

use std::time::Duration;

use sqlx_core::pool::PoolOptions;
use sqlx_core::query_as::query_as;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{info, instrument};
use url::Url;

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result};

/// Stand-in for database URLs that cannot be parsed well enough to mask.
const UNPARSEABLE_URL: &str = "<unparseable database url>";

/// Pool options derived from `config`.
pub fn pool_options(config: &PostgresConfig) -> Result<PoolOptions<Postgres>> {
    if config.pool_size == 0 {
        return Err(PostgresError::config("pool_size must be > 0"));
    }

    Ok(PoolOptions::<Postgres>::new()
        .max_connections(config.pool_size)
        .min_connections(0)
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .idle_timeout(config.idle_timeout_ms.map(Duration::from_millis)))
}

/// Opens the pool and checks that the server answers.
#[instrument(skip(config), fields(url = %mask_password(&config.url)))]
pub async fn connect_pool(config: &PostgresConfig) -> Result<PgPool> {
    let pool = pool_options(config)?.connect(&config.url).await?;

    let (database, version): (String, String) =
        query_as("SELECT current_database()::text, current_setting('server_version')")
            .fetch_one(&pool)
            .await?;

    info!(
        database = %database,
        server_version = %version,
        pool_size = config.pool_size,
        "Connected to staging database"
    );
    Ok(pool)
}

/// Replaces the password of a database URL with `****` for logs and errors.
pub fn mask_password(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return UNPARSEABLE_URL.to_string();
    };
    if parsed.password().is_none() {
        return url.to_string();
    }
    match parsed.set_password(Some("****")) {
        Ok(()) => parsed.to_string(),
        Err(()) => UNPARSEABLE_URL.to_string(),
    }
}
