//! Worker identity new-type
//!
//! A validated wrapper around the worker process identity string used to key
//! heartbeat rows and stamp lease events. Validation happens once at
//! construction; database values are trusted as already valid.

/// A validated worker identity.
///
/// A valid worker ID must:
/// - **Start** with a letter (`a-z`, `A-Z`)
/// - **Contain** only alphanumeric characters, underscores (`_`), hyphens (`-`), and dots (`.`)
/// - **Not be empty**
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(String);

impl WorkerId {
    /// Returns the worker ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the [`WorkerId`] and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Validates that a worker ID follows the required format.
fn validate_worker_id(id: &str) -> Result<(), InvalidWorkerIdError> {
    if id.is_empty() {
        return Err(InvalidWorkerIdError {
            id: id.to_string(),
            reason: "empty string".into(),
        });
    }

    if let Some(first) = id.chars().next() {
        if !first.is_alphabetic() {
            return Err(InvalidWorkerIdError {
                id: id.to_string(),
                reason: "must start with a letter".into(),
            });
        }
    }

    if let Some(c) = id
        .chars()
        .find(|c| !c.is_alphanumeric() && *c != '_' && *c != '-' && *c != '.')
    {
        return Err(InvalidWorkerIdError {
            id: id.to_string(),
            reason: format!("invalid character '{c}'"),
        });
    }

    Ok(())
}

impl std::str::FromStr for WorkerId {
    type Err = InvalidWorkerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_worker_id(s)?;
        Ok(WorkerId(s.to_string()))
    }
}

impl TryFrom<String> for WorkerId {
    type Error = InvalidWorkerIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_worker_id(&value)?;
        Ok(WorkerId(value))
    }
}

impl AsRef<str> for WorkerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for WorkerId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq<&str> for WorkerId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<WorkerId> for &str {
    fn eq(&self, other: &WorkerId) -> bool {
        *self == other.0
    }
}

impl sqlx::Type<sqlx::Postgres> for WorkerId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for WorkerId {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'_, sqlx::Postgres>>::encode_by_ref(&self.0.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for WorkerId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values were validated before insertion; trust them here.
        Ok(WorkerId(s))
    }
}

impl serde::Serialize for WorkerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for WorkerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.try_into().map_err(serde::de::Error::custom)
    }
}

/// Error returned when a worker ID is invalid.
#[derive(Debug, thiserror::Error)]
#[error("Invalid worker ID '{id}': {reason}")]
pub struct InvalidWorkerIdError {
    id: String,
    reason: String,
}
