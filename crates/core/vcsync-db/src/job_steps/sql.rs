//! Internal SQL operations for the `job_steps` table

use sqlx::{Executor, Postgres};

use super::{JobStep, StepId, StepStatus};
use crate::jobs::JobId;

/// Insert the initial step (sequence 1, running) for a job
pub async fn insert_initial<'c, E>(exe: E, job_id: JobId, name: &str) -> Result<StepId, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        INSERT INTO job_steps (job_id, sequence, name, status, started_at, created_at)
        VALUES ($1, 1, $2, 'running', now(), now())
        RETURNING id
    "#};
    sqlx::query_scalar(query)
        .bind(job_id)
        .bind(name)
        .fetch_one(exe)
        .await
}

/// Drive a step to a terminal status
///
/// The `completed_at IS NULL` guard makes the terminal stamp a one-shot: a
/// step that has already finished is left untouched.
pub async fn finish<'c, E>(
    exe: E,
    id: StepId,
    status: StepStatus,
    error: Option<&str>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        UPDATE job_steps
        SET status = $2, completed_at = now(), error = $3
        WHERE id = $1 AND completed_at IS NULL
    "#};
    sqlx::query(query)
        .bind(id)
        .bind(status)
        .bind(error)
        .execute(exe)
        .await?;
    Ok(())
}

/// List all steps for a job, ordered by sequence
pub async fn list_for_job<'c, E>(exe: E, job_id: JobId) -> Result<Vec<JobStep>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT id, job_id, sequence, name, status, started_at, completed_at, error, created_at
        FROM job_steps
        WHERE job_id = $1
        ORDER BY sequence ASC
    "#};
    sqlx::query_as(query).bind(job_id).fetch_all(exe).await
}
