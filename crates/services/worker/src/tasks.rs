//! Task handlers
//!
//! One module per job type. Handlers report their outcome as an explicit
//! [`TaskError`] result instead of unwinding; the dispatcher records
//! contained failures against the job.

pub mod inventory_sync;

/// Failure of a task handler, contained to the job that raised it.
///
/// The error text is captured verbatim as the step's error and in the
/// failure event.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The job carried no target identifier.
    #[error("Missing vcenter target id")]
    MissingTarget,

    /// The target identifier is not a valid vCenter UUID.
    #[error("Invalid vcenter target id '{id}': {source}")]
    InvalidTarget {
        id: String,
        #[source]
        source: uuid::Error,
    },

    /// A storage operation failed mid-task.
    #[error(transparent)]
    Database(#[from] vcsync_db::Error),
}
