//! Temporary sync DB for test suites
//!
//! Wraps an ephemeral PostgreSQL instance; the database is deleted when the
//! value is dropped.

use pgtemp::PgTempDB;

use crate::{Error, SyncDb, test_utils};

/// Temporary sync DB backed by an ephemeral PostgreSQL instance
pub struct TempSyncDb {
    /// Inner sync DB handle
    inner: SyncDb,

    /// Temporary database handle; dropping it deletes the database.
    _temp_db: PgTempDB,
}

impl TempSyncDb {
    /// Create a new temporary sync DB and run migrations on it
    pub async fn new() -> Result<Self, Error> {
        let temp_db = PgTempDB::new();
        let inner =
            test_utils::connect_with_retry(&temp_db.connection_uri(), SyncDb::default_pool_size())
                .await?;
        Ok(Self {
            inner,
            _temp_db: temp_db,
        })
    }
}

impl std::ops::Deref for TempSyncDb {
    type Target = SyncDb;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
