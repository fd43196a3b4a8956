//! DB integration tests for the content-addressed inventory upserts

use std::time::Duration;

use pgtemp::PgTempDB;
use serde_json::json;
use uuid::Uuid;
use vcsync_db::{
    SyncDb,
    inventory::{self, ClusterObservation, HostObservation, VmObservation, content_hash},
    test_utils,
};

async fn connect(temp_db: &PgTempDB) -> SyncDb {
    test_utils::connect_with_retry(&temp_db.connection_uri(), SyncDb::default_pool_size())
        .await
        .expect("Failed to connect to sync db")
}

fn cluster(moid: &str) -> ClusterObservation {
    ClusterObservation {
        moid: moid.to_string(),
        payload: json!({ "moid": moid, "name": "Cluster-1", "drs_enabled": true }),
    }
}

#[tokio::test]
async fn reapplying_unchanged_payload_keeps_hash_and_advances_observed_at() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;
    let vcenter_id = Uuid::new_v4();
    let record = cluster("domain-c1");

    //* When
    inventory::upsert_clusters(&*db.pool, vcenter_id, &[record.clone()])
        .await
        .expect("Failed to upsert clusters");

    let first = inventory::get_cluster(&*db.pool, vcenter_id, "domain-c1")
        .await
        .expect("Failed to get cluster")
        .expect("Cluster not found");

    tokio::time::sleep(Duration::from_millis(50)).await;

    inventory::upsert_clusters(&*db.pool, vcenter_id, &[record.clone()])
        .await
        .expect("Failed to re-upsert clusters");

    let second = inventory::get_cluster(&*db.pool, vcenter_id, "domain-c1")
        .await
        .expect("Failed to get cluster")
        .expect("Cluster not found");

    //* Then
    assert_eq!(first.payload_hash, second.payload_hash);
    assert_eq!(first.payload_json, second.payload_json);
    assert!(
        second.observed_at > first.observed_at,
        "observed_at must advance on every sync"
    );

    let count = inventory::count_clusters(&*db.pool, vcenter_id)
        .await
        .expect("Failed to count clusters");
    assert_eq!(count, 1, "No duplicate row for the same (vcenter, moid)");
}

#[tokio::test]
async fn changed_payload_overwrites_hash() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;
    let vcenter_id = Uuid::new_v4();

    inventory::upsert_clusters(&*db.pool, vcenter_id, &[cluster("domain-c1")])
        .await
        .expect("Failed to upsert clusters");

    //* When
    let changed = ClusterObservation {
        moid: "domain-c1".to_string(),
        payload: json!({ "moid": "domain-c1", "name": "Cluster-1", "drs_enabled": false }),
    };
    inventory::upsert_clusters(&*db.pool, vcenter_id, &[changed.clone()])
        .await
        .expect("Failed to upsert changed cluster");

    let row = inventory::get_cluster(&*db.pool, vcenter_id, "domain-c1")
        .await
        .expect("Failed to get cluster")
        .expect("Cluster not found");

    //* Then
    assert_eq!(row.payload_hash, content_hash(&changed.payload));
    assert_eq!(row.payload_json, changed.payload);
}

#[tokio::test]
async fn hosts_and_vms_keep_parent_references() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;
    let vcenter_id = Uuid::new_v4();

    //* When
    inventory::upsert_hosts(
        &*db.pool,
        vcenter_id,
        &[HostObservation {
            moid: "host-1".to_string(),
            cluster_moid: "domain-c1".to_string(),
            payload: json!({ "moid": "host-1", "cluster_moid": "domain-c1" }),
        }],
    )
    .await
    .expect("Failed to upsert hosts");

    let vm_uuid = Uuid::new_v4();
    inventory::upsert_vms(
        &*db.pool,
        vcenter_id,
        &[VmObservation {
            moid: "vm-1".to_string(),
            host_moid: "host-1".to_string(),
            uuid: vm_uuid,
            payload: json!({ "moid": "vm-1", "host_moid": "host-1" }),
        }],
    )
    .await
    .expect("Failed to upsert vms");

    //* Then
    let hosts = inventory::list_hosts(&*db.pool, vcenter_id)
        .await
        .expect("Failed to list hosts");
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].cluster_moid.as_deref(), Some("domain-c1"));

    let vms = inventory::list_vms(&*db.pool, Some(vcenter_id), 10, 0)
        .await
        .expect("Failed to list vms");
    assert_eq!(vms.len(), 1);
    assert_eq!(vms[0].host_moid.as_deref(), Some("host-1"));
    assert_eq!(vms[0].uuid, Some(vm_uuid));
}

#[tokio::test]
async fn vm_listing_is_scoped_to_the_requested_vcenter() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;
    let vcenter_a = Uuid::new_v4();
    let vcenter_b = Uuid::new_v4();

    for (vcenter_id, moid) in [(vcenter_a, "vm-a"), (vcenter_b, "vm-b")] {
        inventory::upsert_vms(
            &*db.pool,
            vcenter_id,
            &[VmObservation {
                moid: moid.to_string(),
                host_moid: "host-1".to_string(),
                uuid: Uuid::new_v4(),
                payload: json!({ "moid": moid }),
            }],
        )
        .await
        .expect("Failed to upsert vms");
    }

    //* When
    let scoped = inventory::list_vms(&*db.pool, Some(vcenter_a), 10, 0)
        .await
        .expect("Failed to list vms");
    let all = inventory::list_vms(&*db.pool, None, 10, 0)
        .await
        .expect("Failed to list vms");

    //* Then
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].moid, "vm-a");
    assert_eq!(all.len(), 2);
}
