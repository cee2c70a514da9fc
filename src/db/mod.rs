//! Metric store access.
//!
//! [`MetricsStore`] is the seam between the pipeline and the database.
//! [`PostgresMetricsStore`] holds one connection and one read-only
//! transaction for the whole run; each tenant scope is a savepoint inside it.

mod error;
pub mod postgres;
pub mod repos;

#[cfg(test)]
pub mod tests;

pub use error::{DbError, DbResult};
pub use postgres::PostgresMetricsStore;
pub use repos::*;

use crate::config::DatabaseConfig;

/// Open the metric store described by `config`.
pub async fn connect(config: &DatabaseConfig) -> DbResult<PostgresMetricsStore> {
    tracing::info!(
        connect_timeout_secs = config.connect_timeout_secs,
        statement_timeout_secs = config.statement_timeout_secs,
        "Connecting to metric store"
    );
    let store = PostgresMetricsStore::connect(config).await?;
    tracing::info!("Metric store connected");
    Ok(store)
}
