//! Worker service configuration
//!
//! Built once at process start (from CLI/environment in the daemon binary)
//! and threaded through the worker by parameter; there is no ambient global
//! configuration state.

use std::time::Duration;

use serde_json::json;
use vcsync_db::{InvalidWorkerIdError, WorkerId};

/// Default interval between poll iterations (and heartbeats).
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Default simulated latency between sync phases.
///
/// Stands in for the round-trips a real vCenter client would make. Tests
/// inject [`Duration::ZERO`].
pub const DEFAULT_PHASE_DELAY: Duration = Duration::from_secs(1);

/// Worker identity used when neither `WORKER_ID` nor the host name is usable.
pub const FALLBACK_WORKER_ID: &str = "worker-1";

/// Configuration for a worker process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity of this worker; keys the heartbeat row and lease events.
    pub worker_id: WorkerId,

    /// How long the loop waits between poll iterations, and how often the
    /// heartbeat row is refreshed.
    pub heartbeat_interval: Duration,

    /// Simulated external-API latency between inventory sync phases.
    pub phase_delay: Duration,
}

impl Config {
    /// Create a config with the default intervals for the given worker.
    pub fn new(worker_id: WorkerId) -> Self {
        Self {
            worker_id,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            phase_delay: DEFAULT_PHASE_DELAY,
        }
    }

    /// The small status payload stored with each heartbeat.
    pub fn heartbeat_payload(&self) -> serde_json::Value {
        json!({ "status": "idle" })
    }
}

/// Resolve the worker identity.
///
/// Falls back from an explicit value (CLI flag or `WORKER_ID`) to the host
/// name, then to [`FALLBACK_WORKER_ID`].
pub fn resolve_worker_id(explicit: Option<String>) -> Result<WorkerId, InvalidWorkerIdError> {
    if let Some(id) = explicit {
        return id.try_into();
    }

    let host = hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok());

    match host {
        Some(name) if name.parse::<WorkerId>().is_ok() => name.try_into(),
        _ => FALLBACK_WORKER_ID.parse(),
    }
}
