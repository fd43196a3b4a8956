//! Job dispatch
//!
//! Maps a leased job's declared type to a handler from a fixed registry.
//! Unknown types fail immediately: the job and its lease step are marked
//! failed and an error event is appended, with no partial execution. The
//! dispatcher never retries a failed handler; a retry only happens if the
//! job is re-submitted as pending by the API layer.

use vcsync_db::{
    LeasedJob, SyncDb,
    job_events::{self, EventLevel},
    job_steps, jobs,
};

use crate::{Config, Error, tasks};

/// Dispatch a leased job to its handler.
///
/// The handler has exclusive responsibility for driving the job to a
/// terminal state. A handler failure is contained: it is recorded against
/// the job and `Ok` is returned so the worker loop keeps polling. Only
/// storage failures while recording an outcome propagate.
pub async fn dispatch(db: &SyncDb, config: &Config, job: &LeasedJob) -> Result<(), Error> {
    match job.job_type.as_str() {
        jobs::INVENTORY_SYNC_JOB_TYPE => tasks::inventory_sync::run(db, config, job).await,
        unsupported => {
            tracing::warn!(
                job_id = %job.job_id,
                job_type = %unsupported,
                "no handler registered for job type"
            );
            fail_job(db, job, &format!("Unsupported job type {unsupported}")).await
        }
    }
}

/// Mark a leased job and its step as failed with the captured error text.
///
/// The step update, job transition and error event commit together, so a
/// failed job is always queryable with a consistent terminal state and a
/// complete audit trail.
pub(crate) async fn fail_job(db: &SyncDb, job: &LeasedJob, error: &str) -> Result<(), Error> {
    let mut tx = db.begin().await.map_err(Error::OutcomeRecording)?;

    job_steps::mark_failed(&mut *tx, job.step_id, error)
        .await
        .map_err(Error::OutcomeRecording)?;
    jobs::mark_failed(&mut *tx, job.job_id)
        .await
        .map_err(Error::OutcomeRecording)?;
    job_events::record(
        &mut *tx,
        job.job_id,
        Some(job.step_id),
        EventLevel::Error,
        error,
        None,
    )
    .await
    .map_err(Error::OutcomeRecording)?;

    tx.commit()
        .await
        .map_err(|err| Error::OutcomeRecording(vcsync_db::Error::Database(err)))?;

    Ok(())
}
