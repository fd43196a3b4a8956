//! Internal SQL operations for the `worker_heartbeats` table

use std::time::Duration;

use sqlx::{Executor, Postgres, types::JsonValue};

use super::{WorkerHeartbeat, WorkerId};

/// Upsert the heartbeat row for a worker
///
/// One row per worker identity; on conflict the most recent write wins.
pub async fn upsert<'c, E>(
    exe: E,
    worker_id: &WorkerId,
    payload: &JsonValue,
) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        INSERT INTO worker_heartbeats (worker_id, last_seen, payload, updated_at)
        VALUES ($1, now(), $2, now())
        ON CONFLICT (worker_id)
        DO UPDATE SET last_seen = EXCLUDED.last_seen,
                      payload = EXCLUDED.payload,
                      updated_at = EXCLUDED.updated_at
    "#};
    sqlx::query(query)
        .bind(worker_id)
        .bind(payload)
        .execute(exe)
        .await?;
    Ok(())
}

/// Get the most recent heartbeat across all workers
pub async fn latest<'c, E>(exe: E) -> Result<Option<WorkerHeartbeat>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT worker_id, last_seen, payload, updated_at
        FROM worker_heartbeats
        ORDER BY last_seen DESC
        LIMIT 1
    "#};
    sqlx::query_as(query).fetch_optional(exe).await
}

/// Get the heartbeat row for a specific worker
pub async fn get_by_id<'c, E>(
    exe: E,
    worker_id: &WorkerId,
) -> Result<Option<WorkerHeartbeat>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT worker_id, last_seen, payload, updated_at
        FROM worker_heartbeats
        WHERE worker_id = $1
    "#};
    sqlx::query_as(query)
        .bind(worker_id)
        .fetch_optional(exe)
        .await
}

/// List workers whose heartbeat is within the given interval
pub async fn list_active<'c, E>(exe: E, interval: Duration) -> Result<Vec<WorkerId>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT worker_id
        FROM worker_heartbeats
        WHERE last_seen > now() - make_interval(secs => $1)
    "#};
    sqlx::query_scalar(query)
        .bind(interval.as_secs_f64())
        .fetch_all(exe)
        .await
}
