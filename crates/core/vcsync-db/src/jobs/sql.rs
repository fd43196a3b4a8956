//! Internal SQL operations for the `jobs` table

use sqlx::{Executor, Postgres};

use super::{Job, JobId, JobStatus, JobStatusUpdateError, NewJob};

/// Insert a new job with the API layer's fixed defaults
///
/// The job starts as `pending` with zero progress and step counters.
pub async fn insert<'c, E>(exe: E, job: &NewJob<'_>) -> Result<JobId, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        INSERT INTO jobs (
            job_type, name, description, status, priority, site_id,
            target_type, target_ids, progress, current_step, total_steps,
            external_task_ids, created_at, updated_at
        )
        VALUES ($1, $2, $3, 'pending', 0, $4, $5, $6, 0, 0, 0, '{}', now(), now())
        RETURNING id
    "#};
    sqlx::query_scalar(query)
        .bind(job.job_type)
        .bind(job.name)
        .bind(job.description)
        .bind(job.site_id)
        .bind(job.target_type)
        .bind(job.target_ids)
        .fetch_one(exe)
        .await
}

/// Candidate row returned by the lease query
#[derive(Debug, sqlx::FromRow)]
pub struct EligibleJob {
    pub id: JobId,
    pub job_type: String,
    pub target_ids: Vec<String>,
}

/// Select the oldest leasable job, claiming its row lock
///
/// `FOR UPDATE SKIP LOCKED` makes concurrently-racing workers skip rows
/// already claimed by another transaction instead of blocking on them, so a
/// worker never waits behind another worker's lock. The row lock is held
/// until the surrounding transaction commits or aborts.
pub async fn select_next_eligible<'c, E>(exe: E) -> Result<Option<EligibleJob>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT id, job_type, target_ids
        FROM jobs
        WHERE status = ANY($1)
        ORDER BY created_at ASC, id ASC
        FOR UPDATE SKIP LOCKED
        LIMIT 1
    "#};
    sqlx::query_as(query)
        .bind(JobStatus::leasable_statuses())
        .fetch_optional(exe)
        .await
}

/// Flip a claimed job to `running`, stamping `started_at` if unset
pub async fn mark_leased<'c, E>(exe: E, id: JobId) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        UPDATE jobs
        SET status = 'running', started_at = COALESCE(started_at, now()), updated_at = now()
        WHERE id = $1
    "#};
    sqlx::query(query).bind(id).execute(exe).await?;
    Ok(())
}

/// Update the status of a job with multiple possible expected original states
///
/// This function will only update the job status if the job exists and currently has
/// one of the expected original statuses. If the job doesn't exist, returns
/// [`JobStatusUpdateError::NotFound`]. If the job exists but has a different status
/// than any of the expected ones, returns [`JobStatusUpdateError::StateConflict`].
///
/// Terminal transitions additionally stamp `completed_at`, and a transition
/// to `completed` forces `progress` to 100.
pub async fn update_status_if_any_state<'c, E>(
    exe: E,
    id: JobId,
    expected_statuses: &[JobStatus],
    new_status: JobStatus,
) -> Result<(), JobStatusUpdateError>
where
    E: Executor<'c, Database = Postgres>,
{
    /// Internal structure to hold the result of the update operation
    #[derive(Debug, sqlx::FromRow)]
    struct UpdateResult {
        updated_id: Option<JobId>,
        original_status: Option<JobStatus>,
    }

    let query = indoc::indoc! {r#"
        WITH target_job AS (
            SELECT id, status
            FROM jobs
            WHERE id = $1
        ),
        target_job_update AS (
            UPDATE jobs
            SET status = $3,
                updated_at = now(),
                completed_at = CASE
                    WHEN $3 IN ('completed', 'failed') THEN now()
                    ELSE completed_at
                END,
                progress = CASE WHEN $3 = 'completed' THEN 100 ELSE progress END
            WHERE id = $1 AND status = ANY($2)
            RETURNING id
        )
        SELECT
            target_job_update.id AS updated_id,
            target_job.status AS original_status
        FROM target_job
        LEFT JOIN target_job_update ON target_job.id = target_job_update.id
    "#};

    let result: Option<UpdateResult> = sqlx::query_as(query)
        .bind(id)
        .bind(expected_statuses)
        .bind(new_status)
        .fetch_optional(exe)
        .await
        .map_err(JobStatusUpdateError::Database)?;

    match result {
        Some(UpdateResult {
            updated_id: Some(_),
            ..
        }) => Ok(()),
        Some(UpdateResult {
            updated_id: None,
            original_status: Some(status),
        }) => Err(JobStatusUpdateError::StateConflict {
            expected: expected_statuses.to_vec(),
            actual: status,
        }),
        _ => Err(JobStatusUpdateError::NotFound),
    }
}

/// Advance a job's progress percentage
///
/// `GREATEST` keeps progress monotonically non-decreasing within a run even
/// if updates are applied out of order.
pub async fn update_progress<'c, E>(exe: E, id: JobId, progress: i32) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        UPDATE jobs
        SET progress = GREATEST(progress, $2), updated_at = now()
        WHERE id = $1
    "#};
    sqlx::query(query).bind(id).bind(progress).execute(exe).await?;
    Ok(())
}

/// Get a job by its ID
pub async fn get_by_id<'c, E>(exe: E, id: JobId) -> Result<Option<Job>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT id, job_type, name, description, status, priority, site_id,
               target_type, target_ids, progress, current_step, total_steps,
               external_task_ids, created_at, started_at, completed_at, updated_at
        FROM jobs
        WHERE id = $1
    "#};
    sqlx::query_as(query).bind(id).fetch_optional(exe).await
}

/// List jobs, newest first
pub async fn list<'c, E>(exe: E, limit: i64) -> Result<Vec<Job>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT id, job_type, name, description, status, priority, site_id,
               target_type, target_ids, progress, current_step, total_steps,
               external_task_ids, created_at, started_at, completed_at, updated_at
        FROM jobs
        ORDER BY created_at DESC
        LIMIT $1
    "#};
    sqlx::query_as(query).bind(limit).fetch_all(exe).await
}

/// Count jobs that are waiting to be leased
pub async fn queue_depth<'c, E>(exe: E) -> Result<i64, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT COUNT(*)
        FROM jobs
        WHERE status = ANY($1)
    "#};
    sqlx::query_scalar(query)
        .bind(JobStatus::leasable_statuses())
        .fetch_one(exe)
        .await
}
