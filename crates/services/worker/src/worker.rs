//! Worker poll loop
//!
//! Drives the poll-lease-execute-sleep cycle. The loop has two states:
//! running and draining. Every iteration publishes a heartbeat, attempts one
//! lease, dispatches if a job was claimed, then waits up to the heartbeat
//! interval for the shutdown token. Once the token is cancelled the wait
//! returns immediately and the loop condition exits without leasing again —
//! a job dispatched in the current iteration always runs to its terminal
//! state first.

use tokio_util::sync::CancellationToken;
use vcsync_db::{SyncDb, jobs, workers};

use crate::{Config, Error, dispatch};

/// A single worker process's poll loop.
pub struct Worker {
    db: SyncDb,
    config: Config,
}

impl Worker {
    /// Create a new worker instance
    pub fn new(db: SyncDb, config: Config) -> Self {
        Self { db, config }
    }

    /// Run the worker loop until the shutdown token is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error only on unrecovered storage failures during
    /// heartbeat, lease, or outcome recording. Task failures are contained
    /// per job and never abort the loop. The process is expected to be
    /// restarted by external supervision after a fatal error.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), Error> {
        tracing::info!(
            worker_id = %self.config.worker_id,
            interval_secs = self.config.heartbeat_interval.as_secs(),
            "worker loop started"
        );

        while !shutdown.is_cancelled() {
            workers::publish_heartbeat(
                &*self.db.pool,
                &self.config.worker_id,
                &self.config.heartbeat_payload(),
            )
            .await
            .map_err(Error::Heartbeat)?;

            let leased = jobs::lease_next(&self.db, &self.config.worker_id)
                .await
                .map_err(Error::Lease)?;

            if let Some(job) = leased {
                tracing::info!(
                    worker_id = %self.config.worker_id,
                    job_id = %job.job_id,
                    job_type = %job.job_type,
                    "job leased"
                );
                dispatch::dispatch(&self.db, &self.config, &job).await?;
            }

            // The loop's only suspension point between jobs: wake early on
            // shutdown, otherwise poll again after the heartbeat interval.
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(self.config.heartbeat_interval) => {}
            }
        }

        tracing::info!(worker_id = %self.config.worker_id, "worker drained, exiting");
        Ok(())
    }
}
