//! Internal SQL operations for the vCenter inventory current-state tables

use sqlx::{Executor, Postgres, types::JsonValue};
use uuid::Uuid;

use super::{ClusterRow, HostRow, VmRow};

/// Batch-upsert cluster records for a vCenter
///
/// One statement per batch via `UNNEST`. On conflict the payload, hash and
/// observed-at are always overwritten, so re-syncing an unchanged inventory
/// refreshes `observed_at` without creating duplicate rows.
pub async fn upsert_clusters<'c, E>(
    exe: E,
    vcenter_id: Uuid,
    moids: &[String],
    payloads: &[JsonValue],
    hashes: &[String],
) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        INSERT INTO vcenter_clusters_current (vcenter_id, moid, payload_json, payload_hash, observed_at)
        SELECT $1, r.moid, r.payload, r.hash, now()
        FROM UNNEST($2::text[], $3::jsonb[], $4::text[]) AS r(moid, payload, hash)
        ON CONFLICT (vcenter_id, moid)
        DO UPDATE SET payload_json = EXCLUDED.payload_json,
                      payload_hash = EXCLUDED.payload_hash,
                      observed_at = EXCLUDED.observed_at
    "#};
    sqlx::query(query)
        .bind(vcenter_id)
        .bind(moids)
        .bind(payloads)
        .bind(hashes)
        .execute(exe)
        .await?;
    Ok(())
}

/// Batch-upsert host records for a vCenter
///
/// The parent cluster reference is overwritten on conflict together with the
/// payload, so a host that moved between clusters is re-parented.
pub async fn upsert_hosts<'c, E>(
    exe: E,
    vcenter_id: Uuid,
    moids: &[String],
    cluster_moids: &[String],
    payloads: &[JsonValue],
    hashes: &[String],
) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        INSERT INTO vcenter_hosts_current (vcenter_id, moid, cluster_moid, payload_json, payload_hash, observed_at)
        SELECT $1, r.moid, r.cluster_moid, r.payload, r.hash, now()
        FROM UNNEST($2::text[], $3::text[], $4::jsonb[], $5::text[]) AS r(moid, cluster_moid, payload, hash)
        ON CONFLICT (vcenter_id, moid)
        DO UPDATE SET payload_json = EXCLUDED.payload_json,
                      payload_hash = EXCLUDED.payload_hash,
                      observed_at = EXCLUDED.observed_at,
                      cluster_moid = EXCLUDED.cluster_moid
    "#};
    sqlx::query(query)
        .bind(vcenter_id)
        .bind(moids)
        .bind(cluster_moids)
        .bind(payloads)
        .bind(hashes)
        .execute(exe)
        .await?;
    Ok(())
}

/// Batch-upsert VM records for a vCenter
pub async fn upsert_vms<'c, E>(
    exe: E,
    vcenter_id: Uuid,
    moids: &[String],
    host_moids: &[String],
    uuids: &[Uuid],
    payloads: &[JsonValue],
    hashes: &[String],
) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        INSERT INTO vcenter_vms_current (vcenter_id, moid, host_moid, uuid, payload_json, payload_hash, observed_at)
        SELECT $1, r.moid, r.host_moid, r.uuid, r.payload, r.hash, now()
        FROM UNNEST($2::text[], $3::text[], $4::uuid[], $5::jsonb[], $6::text[])
            AS r(moid, host_moid, uuid, payload, hash)
        ON CONFLICT (vcenter_id, moid)
        DO UPDATE SET payload_json = EXCLUDED.payload_json,
                      payload_hash = EXCLUDED.payload_hash,
                      observed_at = EXCLUDED.observed_at,
                      host_moid = EXCLUDED.host_moid,
                      uuid = EXCLUDED.uuid
    "#};
    sqlx::query(query)
        .bind(vcenter_id)
        .bind(moids)
        .bind(host_moids)
        .bind(uuids)
        .bind(payloads)
        .bind(hashes)
        .execute(exe)
        .await?;
    Ok(())
}

/// Get a cluster record by its (vcenter, moid) key
pub async fn get_cluster<'c, E>(
    exe: E,
    vcenter_id: Uuid,
    moid: &str,
) -> Result<Option<ClusterRow>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT vcenter_id, moid, payload_json, payload_hash, observed_at
        FROM vcenter_clusters_current
        WHERE vcenter_id = $1 AND moid = $2
    "#};
    sqlx::query_as(query)
        .bind(vcenter_id)
        .bind(moid)
        .fetch_optional(exe)
        .await
}

/// List host records for a vCenter
pub async fn list_hosts<'c, E>(exe: E, vcenter_id: Uuid) -> Result<Vec<HostRow>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT vcenter_id, moid, cluster_moid, payload_json, payload_hash, observed_at
        FROM vcenter_hosts_current
        WHERE vcenter_id = $1
        ORDER BY moid ASC
    "#};
    sqlx::query_as(query).bind(vcenter_id).fetch_all(exe).await
}

/// List VM records, optionally scoped to one vCenter, newest observation first
pub async fn list_vms<'c, E>(
    exe: E,
    vcenter_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<VmRow>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT vcenter_id, moid, host_moid, uuid, payload_json, payload_hash, observed_at
        FROM vcenter_vms_current
        WHERE $1::uuid IS NULL OR vcenter_id = $1
        ORDER BY observed_at DESC
        LIMIT $2 OFFSET $3
    "#};
    sqlx::query_as(query)
        .bind(vcenter_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(exe)
        .await
}

/// Count rows in one inventory table scoped to a vCenter
macro_rules! count_fn {
    ($name:ident, $table:literal) => {
        pub async fn $name<'c, E>(exe: E, vcenter_id: Uuid) -> Result<i64, sqlx::Error>
        where
            E: Executor<'c, Database = Postgres>,
        {
            let query = concat!("SELECT COUNT(*) FROM ", $table, " WHERE vcenter_id = $1");
            sqlx::query_scalar(query).bind(vcenter_id).fetch_one(exe).await
        }
    };
}

count_fn!(count_clusters, "vcenter_clusters_current");
count_fn!(count_hosts, "vcenter_hosts_current");
count_fn!(count_vms, "vcenter_vms_current");
