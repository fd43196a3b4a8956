//! Worker service for executing queued synchronization jobs.
//!
//! Each worker process runs an independent poll-lease-execute-sleep loop
//! against the shared sync database. Workers do not talk to each other; all
//! coordination goes through the database's atomic skip-on-contention lease,
//! so at most one worker ever runs a given job. A failing job is contained
//! to that job — the step and job are marked failed with the captured error
//! and the loop keeps polling. Shutdown is a drain: on SIGTERM/SIGINT the
//! loop finishes the job it is running (if any) and exits without leasing a
//! new one.

pub mod config;
pub mod dispatch;
mod error;
pub mod shutdown;
pub mod tasks;
mod worker;

pub use self::{config::Config, error::Error, shutdown::install_shutdown_handler, worker::Worker};
