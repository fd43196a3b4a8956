//! vCenter inventory current-state tables
//!
//! Holds the latest observed payload for every cluster, host and VM, keyed
//! by `(vcenter_id, moid)`. Upserts are content-addressed: each payload is
//! hashed with a stable, key-order-independent digest and the hash is stored
//! alongside the payload for change-detection consumers. The upsert always
//! overwrites payload, hash and observed-at on conflict; nothing currently
//! skips the write when the hash is unchanged.

use sqlx::types::{
    JsonValue,
    chrono::{DateTime, Utc},
};
use uuid::Uuid;

mod content_hash;
pub(crate) mod sql;

pub use self::content_hash::content_hash;
use crate::Error;

/// A cluster observed during an inventory sync
#[derive(Debug, Clone)]
pub struct ClusterObservation {
    /// Machine object id within the owning vCenter
    pub moid: String,
    /// Full payload blob
    pub payload: JsonValue,
}

/// A host observed during an inventory sync
#[derive(Debug, Clone)]
pub struct HostObservation {
    pub moid: String,
    /// Parent cluster reference
    pub cluster_moid: String,
    pub payload: JsonValue,
}

/// A VM observed during an inventory sync
#[derive(Debug, Clone)]
pub struct VmObservation {
    pub moid: String,
    /// Parent host reference
    pub host_moid: String,
    /// Stable VM instance UUID
    pub uuid: Uuid,
    pub payload: JsonValue,
}

/// A stored cluster record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClusterRow {
    pub vcenter_id: Uuid,
    pub moid: String,
    pub payload_json: JsonValue,
    pub payload_hash: String,
    pub observed_at: DateTime<Utc>,
}

/// A stored host record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HostRow {
    pub vcenter_id: Uuid,
    pub moid: String,
    pub cluster_moid: Option<String>,
    pub payload_json: JsonValue,
    pub payload_hash: String,
    pub observed_at: DateTime<Utc>,
}

/// A stored VM record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VmRow {
    pub vcenter_id: Uuid,
    pub moid: String,
    pub host_moid: Option<String>,
    pub uuid: Option<Uuid>,
    pub payload_json: JsonValue,
    pub payload_hash: String,
    pub observed_at: DateTime<Utc>,
}

/// Upsert a batch of cluster observations for a vCenter
#[tracing::instrument(skip(exe, records), err)]
pub async fn upsert_clusters<'c, E>(
    exe: E,
    vcenter_id: Uuid,
    records: &[ClusterObservation],
) -> Result<(), Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    let moids: Vec<String> = records.iter().map(|r| r.moid.clone()).collect();
    let payloads: Vec<JsonValue> = records.iter().map(|r| r.payload.clone()).collect();
    let hashes: Vec<String> = records.iter().map(|r| content_hash(&r.payload)).collect();

    sql::upsert_clusters(exe, vcenter_id, &moids, &payloads, &hashes)
        .await
        .map_err(Error::Database)
}

/// Upsert a batch of host observations for a vCenter
#[tracing::instrument(skip(exe, records), err)]
pub async fn upsert_hosts<'c, E>(
    exe: E,
    vcenter_id: Uuid,
    records: &[HostObservation],
) -> Result<(), Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    let moids: Vec<String> = records.iter().map(|r| r.moid.clone()).collect();
    let cluster_moids: Vec<String> = records.iter().map(|r| r.cluster_moid.clone()).collect();
    let payloads: Vec<JsonValue> = records.iter().map(|r| r.payload.clone()).collect();
    let hashes: Vec<String> = records.iter().map(|r| content_hash(&r.payload)).collect();

    sql::upsert_hosts(exe, vcenter_id, &moids, &cluster_moids, &payloads, &hashes)
        .await
        .map_err(Error::Database)
}

/// Upsert a batch of VM observations for a vCenter
#[tracing::instrument(skip(exe, records), err)]
pub async fn upsert_vms<'c, E>(
    exe: E,
    vcenter_id: Uuid,
    records: &[VmObservation],
) -> Result<(), Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    let moids: Vec<String> = records.iter().map(|r| r.moid.clone()).collect();
    let host_moids: Vec<String> = records.iter().map(|r| r.host_moid.clone()).collect();
    let uuids: Vec<Uuid> = records.iter().map(|r| r.uuid).collect();
    let payloads: Vec<JsonValue> = records.iter().map(|r| r.payload.clone()).collect();
    let hashes: Vec<String> = records.iter().map(|r| content_hash(&r.payload)).collect();

    sql::upsert_vms(
        exe, vcenter_id, &moids, &host_moids, &uuids, &payloads, &hashes,
    )
    .await
    .map_err(Error::Database)
}

/// Get a cluster record by its (vcenter, moid) key
#[tracing::instrument(skip(exe), err)]
pub async fn get_cluster<'c, E>(
    exe: E,
    vcenter_id: Uuid,
    moid: &str,
) -> Result<Option<ClusterRow>, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::get_cluster(exe, vcenter_id, moid)
        .await
        .map_err(Error::Database)
}

/// List host records for a vCenter
#[tracing::instrument(skip(exe), err)]
pub async fn list_hosts<'c, E>(exe: E, vcenter_id: Uuid) -> Result<Vec<HostRow>, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::list_hosts(exe, vcenter_id).await.map_err(Error::Database)
}

/// List VM records, optionally scoped to one vCenter
///
/// Read path for the API layer's VM listing.
#[tracing::instrument(skip(exe), err)]
pub async fn list_vms<'c, E>(
    exe: E,
    vcenter_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<VmRow>, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::list_vms(exe, vcenter_id, limit, offset)
        .await
        .map_err(Error::Database)
}

/// Count cluster records for a vCenter
#[tracing::instrument(skip(exe), err)]
pub async fn count_clusters<'c, E>(exe: E, vcenter_id: Uuid) -> Result<i64, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::count_clusters(exe, vcenter_id)
        .await
        .map_err(Error::Database)
}

/// Count host records for a vCenter
#[tracing::instrument(skip(exe), err)]
pub async fn count_hosts<'c, E>(exe: E, vcenter_id: Uuid) -> Result<i64, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::count_hosts(exe, vcenter_id)
        .await
        .map_err(Error::Database)
}

/// Count VM records for a vCenter
#[tracing::instrument(skip(exe), err)]
pub async fn count_vms<'c, E>(exe: E, vcenter_id: Uuid) -> Result<i64, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    sql::count_vms(exe, vcenter_id)
        .await
        .map_err(Error::Database)
}
