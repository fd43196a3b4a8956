//! Internal SQL operations for the `job_events` table

use sqlx::{Executor, Postgres, types::JsonValue};

use super::{EventLevel, JobEvent};
use crate::{job_steps::StepId, jobs::JobId};

/// Append a new event to the job event log
pub async fn insert<'c, E>(
    exe: E,
    job_id: JobId,
    step_id: Option<StepId>,
    level: EventLevel,
    message: &str,
    data: Option<JsonValue>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        INSERT INTO job_events (job_id, step_id, timestamp, level, message, data, created_at)
        VALUES ($1, $2, now(), $3, $4, $5, now())
    "#};
    sqlx::query(query)
        .bind(job_id)
        .bind(step_id)
        .bind(level)
        .bind(message)
        .bind(data)
        .execute(exe)
        .await?;
    Ok(())
}

/// List events for a job, newest first
pub async fn list_for_job<'c, E>(
    exe: E,
    job_id: JobId,
    limit: i64,
) -> Result<Vec<JobEvent>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT id, job_id, step_id, timestamp, level, message, data, created_at
        FROM job_events
        WHERE job_id = $1
        ORDER BY timestamp DESC, id DESC
        LIMIT $2
    "#};
    sqlx::query_as(query)
        .bind(job_id)
        .bind(limit)
        .fetch_all(exe)
        .await
}
