//! Storage layer for the vcsync job queue and vCenter inventory tables.
//!
//! All coordination between worker processes happens through this crate:
//! jobs are claimed with an atomic skip-on-contention lease, liveness is
//! published as heartbeat upserts, and every state transition leaves an
//! append-only audit event. The API layer consumes the read paths (queue
//! depth, latest heartbeat, job listings) without any side effects.

use sqlx::Postgres;
use tracing::instrument;

mod config;
mod db;
mod error;
pub mod inventory;
pub mod job_events;
pub mod job_steps;
pub mod jobs;
#[cfg(feature = "temp-db")]
pub mod temp;
pub mod test_utils;
pub mod workers;

pub use self::{
    config::{DEFAULT_POOL_MAX_CONNECTIONS, PoolConfig},
    db::{ConnError, ConnPool},
    error::Error,
    jobs::{Job, JobId, JobStatus, JobStatusUpdateError, LeasedJob},
    workers::{InvalidWorkerIdError, WorkerHeartbeat, WorkerId},
};

/// Default pool size for the sync DB.
pub const DEFAULT_POOL_SIZE: u32 = DEFAULT_POOL_MAX_CONNECTIONS;

/// Connection pool to the sync DB. Clones will refer to the same instance.
#[derive(Clone, Debug)]
pub struct SyncDb {
    pub pool: ConnPool,
}

impl SyncDb {
    /// Sets up a connection pool to the sync DB
    ///
    /// Runs migrations if necessary.
    #[instrument(skip_all, err)]
    pub async fn connect(url: &str, pool_size: u32) -> Result<Self, Error> {
        Self::connect_with_config(url, &PoolConfig::with_size(pool_size), true).await
    }

    /// Sets up a connection pool to the sync DB with configurable migration behavior
    ///
    /// Runs migrations only if `auto_migrate` is true.
    #[instrument(skip_all, err)]
    pub async fn connect_with_config(
        url: &str,
        config: &PoolConfig,
        auto_migrate: bool,
    ) -> Result<Self, Error> {
        let pool = ConnPool::connect(url, config).await?;
        if auto_migrate {
            pool.run_migrations().await?;
        }
        Ok(Self { pool })
    }

    /// Begins a new database transaction
    ///
    /// The transaction rolls back automatically when dropped unless
    /// explicitly committed.
    #[instrument(skip(self), err)]
    pub async fn begin(&self) -> Result<sqlx::Transaction<'static, Postgres>, Error> {
        self.pool.begin().await.map_err(Error::Database)
    }

    pub fn default_pool_size() -> u32 {
        DEFAULT_POOL_SIZE
    }
}
