//! Worker liveness tracking
//!
//! Each worker process periodically upserts a single heartbeat row keyed by
//! its identity. The row is the externally visible liveness signal: the API
//! layer's health read path surfaces the most recent heartbeat, and a worker
//! whose `last_seen` falls outside the active interval is considered dead.
//! Publishing a heartbeat has no effect on job state.

use std::time::Duration;

use sqlx::types::{
    JsonValue,
    chrono::{DateTime, Utc},
};

pub(crate) mod sql;
mod worker_id;

pub use self::worker_id::{InvalidWorkerIdError, WorkerId};
use crate::Error;

/// Represents a worker heartbeat row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkerHeartbeat {
    /// Identity of the worker that published the heartbeat
    pub worker_id: WorkerId,

    /// When the worker was last seen polling
    pub last_seen: DateTime<Utc>,

    /// Small status payload (e.g. `{"status": "idle"}`)
    pub payload: JsonValue,

    pub updated_at: DateTime<Utc>,
}

/// Publish a heartbeat for the given worker
///
/// Idempotent upsert keyed by worker identity; the most recent write wins.
/// Called once per worker loop iteration, independent of whether a job was
/// leased.
#[tracing::instrument(skip(exe, payload), err)]
pub async fn publish_heartbeat<'c, E>(
    exe: E,
    worker_id: &WorkerId,
    payload: &JsonValue,
) -> Result<(), Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::upsert(exe, worker_id, payload)
        .await
        .map_err(Error::Database)
}

/// Get the most recent heartbeat across all workers
///
/// Read path for the operator health endpoint.
#[tracing::instrument(skip(exe), err)]
pub async fn latest_heartbeat<'c, E>(exe: E) -> Result<Option<WorkerHeartbeat>, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::latest(exe).await.map_err(Error::Database)
}

/// Get the heartbeat row for a specific worker
#[tracing::instrument(skip(exe), err)]
pub async fn get_heartbeat<'c, E>(
    exe: E,
    worker_id: &WorkerId,
) -> Result<Option<WorkerHeartbeat>, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::get_by_id(exe, worker_id).await.map_err(Error::Database)
}

/// List active workers
///
/// A worker is active if its `last_seen` timestamp is within the given
/// `interval` from the current time.
#[tracing::instrument(skip(exe), err)]
pub async fn list_active<'c, E>(exe: E, interval: Duration) -> Result<Vec<WorkerId>, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::list_active(exe, interval)
        .await
        .map_err(Error::Database)
}
