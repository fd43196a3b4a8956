//! Error types for the worker service
//!
//! Each variant wraps the underlying [`vcsync_db::Error`] with the loop
//! phase that raised it, so a fatal worker error names the operation that
//! failed (heartbeat, lease, or outcome recording).

/// Fatal errors that abort the worker loop.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Publishing the worker heartbeat failed.
    #[error("Error publishing worker heartbeat: {0}")]
    Heartbeat(vcsync_db::Error),

    /// Leasing the next job failed.
    #[error("Error leasing next job: {0}")]
    Lease(vcsync_db::Error),

    /// Recording a job outcome failed.
    #[error("Error recording job outcome: {0}")]
    OutcomeRecording(vcsync_db::Error),
}
