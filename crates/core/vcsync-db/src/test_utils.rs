//! Test utilities for database connections
//!
//! Ephemeral PostgreSQL instances may not be ready to accept connections
//! immediately after startup; these helpers retry the initial connection
//! with exponential backoff.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

use crate::{Error, SyncDb};

/// Connect to a [`SyncDb`] with retry logic to handle startup timing issues
///
/// Retries when receiving error code 57P03 (database starting up). Designed
/// for tests using pgtemp where PostgreSQL may not be immediately ready.
pub async fn connect_with_retry(url: &str, pool_size: u32) -> Result<SyncDb, Error> {
    (|| SyncDb::connect(url, pool_size))
        .retry(retry_policy())
        .when(is_database_starting_up)
        .notify(|err, dur| {
            warn!(
                error = %err,
                "Database still starting up during test connection. Retrying in {:.1}s",
                dur.as_secs_f32()
            );
        })
        .await
}

/// Retry policy optimized for test environments
///
/// Faster initial retries and more attempts than a production policy, since
/// the ephemeral database is expected to come up within milliseconds.
fn retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_millis(100))
        .with_max_times(20)
}

fn is_database_starting_up(err: &Error) -> bool {
    matches!(
        err,
        Error::Connection(sqlx::Error::Database(db_err))
        if db_err.code().is_some_and(|code| code == "57P03")
    )
}
