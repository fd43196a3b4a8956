//! Job queue operations
//!
//! This module provides the job queue shared by the API layer (producer) and
//! the worker processes (consumers). Workers claim pending jobs with an
//! atomic lease: the oldest eligible row is selected under
//! `FOR UPDATE SKIP LOCKED`, flipped to `running`, given its initial step,
//! and stamped with a "leased" audit event — all in one transaction.
//! Concurrent lease attempts against the same row are serialized by the row
//! lock, so exactly one worker ever observes a given job as leasable.

use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

mod job_id;
mod job_status;
pub(crate) mod sql;

pub use self::{job_id::JobId, job_status::JobStatus};
use crate::{
    Error, SyncDb,
    job_events::{self, EventLevel},
    job_steps::{self, StepId},
    workers::WorkerId,
};

/// Job type tag handled by the inventory sync task
pub const INVENTORY_SYNC_JOB_TYPE: &str = "inventory_sync";

/// Step name recorded when a worker leases a job
pub const LEASE_STEP_NAME: &str = "Lease and queue job";

/// Fields required to submit a new job
///
/// Everything else (status, progress, counters, timestamps) is filled in
/// with the queue defaults by the insert.
#[derive(Debug, Clone)]
pub struct NewJob<'a> {
    pub job_type: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub site_id: Option<Uuid>,
    pub target_type: &'a str,
    pub target_ids: &'a [String],
}

/// Submit a new job to the queue
///
/// The worker never creates its own jobs; this is the insert performed by
/// the API layer (and by tests standing in for it).
#[tracing::instrument(skip(exe), err)]
pub async fn create<'c, E>(exe: E, job: NewJob<'_>) -> Result<JobId, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::insert(exe, &job).await.map_err(Error::Database)
}

/// Submit an inventory sync job for a single vCenter
#[tracing::instrument(skip(exe), err)]
pub async fn create_inventory_sync_job<'c, E>(
    exe: E,
    vcenter_id: Uuid,
    vcenter_name: &str,
    site_id: Option<Uuid>,
) -> Result<JobId, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    let name = format!("Inventory sync: {vcenter_name}");
    let target_ids = [vcenter_id.to_string()];
    create(
        exe,
        NewJob {
            job_type: INVENTORY_SYNC_JOB_TYPE,
            name: &name,
            description: "Triggered via API",
            site_id,
            target_type: "vcenter",
            target_ids: &target_ids,
        },
    )
    .await
}

/// A job claimed by a worker, ready for dispatch
#[derive(Debug, Clone)]
pub struct LeasedJob {
    /// ID of the leased job
    pub job_id: JobId,
    /// ID of the initial "lease and queue" step created by the lease
    pub step_id: StepId,
    /// Declared job type, used by the dispatcher to select a handler
    pub job_type: String,
    /// Opaque target identifiers (for inventory sync: a single vCenter id)
    pub target_ids: Vec<String>,
}

/// Atomically claim the oldest leasable job for the given worker
///
/// Performs in a single transaction:
///
///  1. Selects the oldest `pending`/`scheduled` job, skipping rows locked by
///     other workers (`FOR UPDATE SKIP LOCKED`)
///  2. Flips the job to `running`, stamping `started_at` if unset
///  3. Inserts the initial job step (sequence 1, `running`)
///  4. Appends a "leased by worker" info event
///
/// All four effects commit together or not at all. Returns `None` if no
/// eligible job exists.
#[tracing::instrument(skip(db), err)]
pub async fn lease_next(db: &SyncDb, worker_id: &WorkerId) -> Result<Option<LeasedJob>, Error> {
    let mut tx = db.begin().await?;

    let Some(candidate) = sql::select_next_eligible(&mut *tx)
        .await
        .map_err(Error::Database)?
    else {
        // Nothing leasable; dropping the transaction rolls it back.
        return Ok(None);
    };

    sql::mark_leased(&mut *tx, candidate.id)
        .await
        .map_err(Error::Database)?;

    let step_id = job_steps::insert_initial(&mut *tx, candidate.id, LEASE_STEP_NAME).await?;

    job_events::record(
        &mut *tx,
        candidate.id,
        Some(step_id),
        EventLevel::Info,
        "Job leased by worker",
        Some(serde_json::json!({ "worker_id": worker_id.as_str() })),
    )
    .await?;

    tx.commit().await.map_err(Error::Database)?;

    Ok(Some(LeasedJob {
        job_id: candidate.id,
        step_id,
        job_type: candidate.job_type,
        target_ids: candidate.target_ids,
    }))
}

/// Advance a job's progress percentage (monotonically non-decreasing)
#[tracing::instrument(skip(exe), err)]
pub async fn update_progress<'c, E>(exe: E, id: JobId, progress: i32) -> Result<(), Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::update_progress(exe, id, progress)
        .await
        .map_err(Error::Database)
}

/// Conditionally marks a job as `completed` only if it's currently `running`
///
/// The transition also forces `progress` to 100 and stamps `completed_at`.
#[tracing::instrument(skip(exe), err)]
pub async fn mark_completed<'c, E>(exe: E, id: JobId) -> Result<(), Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::update_status_if_any_state(exe, id, &[JobStatus::Running], JobStatus::Completed)
        .await
        .map_err(Error::JobStatusUpdate)
}

/// Conditionally marks a job as `failed` from any non-terminal state
///
/// Jobs can fail before execution starts (unsupported type, missing target)
/// or during execution, so all non-terminal states are accepted.
#[tracing::instrument(skip(exe), err)]
pub async fn mark_failed<'c, E>(exe: E, id: JobId) -> Result<(), Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::update_status_if_any_state(
        exe,
        id,
        &[JobStatus::Pending, JobStatus::Scheduled, JobStatus::Running],
        JobStatus::Failed,
    )
    .await
    .map_err(Error::JobStatusUpdate)
}

/// Returns the job with the given ID
#[tracing::instrument(skip(exe), err)]
pub async fn get_by_id<'c, E>(exe: E, id: JobId) -> Result<Option<Job>, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::get_by_id(exe, id).await.map_err(Error::Database)
}

/// List jobs, newest first
#[tracing::instrument(skip(exe), err)]
pub async fn list<'c, E>(exe: E, limit: i64) -> Result<Vec<Job>, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::list(exe, limit).await.map_err(Error::Database)
}

/// Count jobs whose status is `pending` or `scheduled`
///
/// This is the queue-depth figure exposed on the operator health read path.
#[tracing::instrument(skip(exe), err)]
pub async fn queue_depth<'c, E>(exe: E) -> Result<i64, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::queue_depth(exe).await.map_err(Error::Database)
}

/// Error type for conditional job status updates
#[derive(Debug, thiserror::Error)]
pub enum JobStatusUpdateError {
    #[error("Job not found")]
    NotFound,

    #[error("Job state conflict: expected one of {expected:?}, but found {actual}")]
    StateConflict {
        expected: Vec<JobStatus>,
        actual: JobStatus,
    },

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

/// Represents a job row with its full metadata
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Job {
    /// Unique identifier for the job
    pub id: JobId,

    /// Declared job type, mapped to a handler by the worker dispatcher
    pub job_type: String,

    /// Human-readable job name
    pub name: String,

    /// Free-form description
    pub description: String,

    /// Current lifecycle status
    pub status: JobStatus,

    /// Scheduling priority (unused by the FIFO lease; kept for the API layer)
    pub priority: i32,

    /// Owning site, if any
    pub site_id: Option<Uuid>,

    /// Kind of entity the target ids refer to (e.g. "vcenter")
    pub target_type: String,

    /// Opaque target identifiers
    pub target_ids: Vec<String>,

    /// Progress percentage, 0-100, non-decreasing within a run
    pub progress: i32,

    /// Step counters maintained for the API layer
    pub current_step: i32,
    pub total_steps: i32,

    /// External task references (unused by the worker)
    pub external_task_ids: Vec<String>,

    /// Lifecycle timestamps
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
