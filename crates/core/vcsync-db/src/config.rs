//! Connection pool configuration for the sync database.

use std::time::Duration;

/// Default maximum number of connections in the pool.
///
/// A pool of 10 connections is sufficient for a single worker process: every
/// operation borrows a connection for one unit of work and returns it.
pub const DEFAULT_POOL_MAX_CONNECTIONS: u32 = 10;

/// Default minimum number of connections to keep alive in the pool.
///
/// Keeping a floor of ready connections avoids connection establishment
/// latency on the hot poll path.
pub const DEFAULT_POOL_MIN_CONNECTIONS: u32 = 1;

/// Default acquire timeout when checking out a connection.
///
/// Requests that cannot acquire a connection within this window fail fast
/// rather than queuing indefinitely.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to keep alive in the pool.
    pub min_connections: u32,
    /// Maximum time to wait for a connection from the pool before failing.
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    /// Creates a `PoolConfig` with the given pool size and default timeouts.
    pub fn with_size(size: u32) -> Self {
        Self {
            max_connections: size,
            ..Self::default()
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_POOL_MAX_CONNECTIONS,
            min_connections: DEFAULT_POOL_MIN_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}
