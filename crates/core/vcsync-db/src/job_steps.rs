//! Job step tracking
//!
//! Each job carries an ordered list of steps. The worker currently records a
//! single step per job (sequence 1, the lease step) and drives it to
//! `completed` or `failed` together with the job. A step's completion or
//! failure timestamp is stamped at most once.

use sqlx::types::chrono::{DateTime, Utc};

pub(crate) mod sql;

use crate::{Error, jobs::JobId};

/// A unique identifier for a job step
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    sqlx::Type,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct StepId(i64);

impl StepId {
    /// Convert the [`StepId`] to an `i64`
    pub fn to_i64(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents the current status of a job step
///
/// Stored as a `TEXT` column; unrecognized values decode as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepStatus {
    /// The step is being executed.
    Running,

    /// The step finished successfully. Terminal.
    Completed,

    /// The step failed; the `error` column carries the captured text. Terminal.
    Failed,

    /// Unrecognized database value.
    Unknown,
}

impl StepStatus {
    /// Convert the [`StepStatus`] to a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for StepStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("running") => Ok(Self::Running),
            s if s.eq_ignore_ascii_case("completed") => Ok(Self::Completed),
            s if s.eq_ignore_ascii_case("failed") => Ok(Self::Failed),
            _ => Ok(Self::Unknown),
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl sqlx::Type<sqlx::Postgres> for StepStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("TEXT")
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for StepStatus {
    fn decode(
        value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let value: &str = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
        // Since FromStr::Err is Infallible, unwrap is safe.
        Ok(value.parse().unwrap())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for StepStatus {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        sqlx::Encode::<sqlx::Postgres>::encode_by_ref(&self.as_str(), buf)
    }
}

/// Represents a job step row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobStep {
    /// Unique identifier for the step
    pub id: StepId,

    /// Owning job
    pub job_id: JobId,

    /// Position within the job's step list (1-based)
    pub sequence: i32,

    /// Human-readable step name
    pub name: String,

    /// Current step status
    pub status: StepStatus,

    /// Lifecycle timestamps; `completed_at` is set at most once
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Captured error text for failed steps
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Insert the initial step for a freshly leased job
///
/// The step starts at sequence 1 in the `running` state with `started_at`
/// stamped to now.
#[tracing::instrument(skip(exe), err)]
pub async fn insert_initial<'c, E>(exe: E, job_id: JobId, name: &str) -> Result<StepId, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::insert_initial(exe, job_id, name)
        .await
        .map_err(Error::Database)
}

/// Mark a step as completed, stamping `completed_at` once
#[tracing::instrument(skip(exe), err)]
pub async fn mark_completed<'c, E>(exe: E, id: StepId) -> Result<(), Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::finish(exe, id, StepStatus::Completed, None)
        .await
        .map_err(Error::Database)
}

/// Mark a step as failed with the captured error text
#[tracing::instrument(skip(exe), err)]
pub async fn mark_failed<'c, E>(exe: E, id: StepId, error: &str) -> Result<(), Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::finish(exe, id, StepStatus::Failed, Some(error))
        .await
        .map_err(Error::Database)
}

/// List all steps for a job, ordered by sequence
#[tracing::instrument(skip(exe), err)]
pub async fn list_for_job<'c, E>(exe: E, job_id: JobId) -> Result<Vec<JobStep>, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::list_for_job(exe, job_id).await.map_err(Error::Database)
}
