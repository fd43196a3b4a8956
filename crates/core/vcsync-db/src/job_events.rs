//! Job event log operations for the append-only audit table
//!
//! Every notable moment in a job's life (leased, phase synced, completed,
//! failed) is appended as an immutable event referencing the job and
//! optionally the step it belongs to. Events are never updated or deleted;
//! ordering is by timestamp. The audit trail is part of the
//! failure-handling guarantee, so a storage error here propagates to the
//! caller instead of being swallowed.

use sqlx::types::{
    JsonValue,
    chrono::{DateTime, Utc},
};

pub(crate) mod sql;

use crate::{Error, job_steps::StepId, jobs::JobId};

/// Severity level of a job event
///
/// Stored as a `TEXT` column; unrecognized values decode as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventLevel {
    Info,
    Warning,
    Error,
    /// Unrecognized database value.
    Unknown,
}

impl EventLevel {
    /// Convert the [`EventLevel`] to a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for EventLevel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("info") => Ok(Self::Info),
            s if s.eq_ignore_ascii_case("warning") => Ok(Self::Warning),
            s if s.eq_ignore_ascii_case("error") => Ok(Self::Error),
            _ => Ok(Self::Unknown),
        }
    }
}

impl std::fmt::Display for EventLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl sqlx::Type<sqlx::Postgres> for EventLevel {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("TEXT")
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for EventLevel {
    fn decode(
        value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let value: &str = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
        // Since FromStr::Err is Infallible, unwrap is safe.
        Ok(value.parse().unwrap())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for EventLevel {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        sqlx::Encode::<sqlx::Postgres>::encode_by_ref(&self.as_str(), buf)
    }
}

/// Represents a job event row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobEvent {
    /// Unique identifier for the event
    pub id: i64,

    /// Owning job
    pub job_id: JobId,

    /// Step the event belongs to, if any
    pub step_id: Option<StepId>,

    /// Event timestamp; events are ordered by this column
    pub timestamp: DateTime<Utc>,

    /// Severity level
    pub level: EventLevel,

    /// Human-readable message
    pub message: String,

    /// Optional structured payload
    pub data: Option<JsonValue>,

    pub created_at: DateTime<Utc>,
}

/// Append an event to a job's audit trail
#[tracing::instrument(skip(exe, data), err)]
pub async fn record<'c, E>(
    exe: E,
    job_id: JobId,
    step_id: Option<StepId>,
    level: EventLevel,
    message: &str,
    data: Option<JsonValue>,
) -> Result<(), Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::insert(exe, job_id, step_id, level, message, data)
        .await
        .map_err(Error::Database)
}

/// List events for a job, newest first
#[tracing::instrument(skip(exe), err)]
pub async fn list_for_job<'c, E>(
    exe: E,
    job_id: JobId,
    limit: i64,
) -> Result<Vec<JobEvent>, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::list_for_job(exe, job_id, limit)
        .await
        .map_err(Error::Database)
}
