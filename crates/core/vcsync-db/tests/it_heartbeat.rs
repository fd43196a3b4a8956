//! DB integration tests for worker heartbeat tracking

use std::time::Duration;

use pgtemp::PgTempDB;
use serde_json::json;
use vcsync_db::{SyncDb, WorkerId, test_utils, workers};

async fn connect(temp_db: &PgTempDB) -> SyncDb {
    test_utils::connect_with_retry(&temp_db.connection_uri(), SyncDb::default_pool_size())
        .await
        .expect("Failed to connect to sync db")
}

#[tokio::test]
async fn publish_heartbeat_upserts_a_single_row() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;

    let worker_id: WorkerId = "hb-worker".parse().expect("Invalid worker ID");
    let payload = json!({ "status": "idle" });

    //* When
    workers::publish_heartbeat(&*db.pool, &worker_id, &payload)
        .await
        .expect("Failed to publish first heartbeat");

    let first = workers::get_heartbeat(&*db.pool, &worker_id)
        .await
        .expect("Failed to get heartbeat")
        .expect("Heartbeat not found");

    tokio::time::sleep(Duration::from_millis(50)).await;

    workers::publish_heartbeat(&*db.pool, &worker_id, &payload)
        .await
        .expect("Failed to publish second heartbeat");

    let second = workers::get_heartbeat(&*db.pool, &worker_id)
        .await
        .expect("Failed to get heartbeat")
        .expect("Heartbeat not found");

    //* Then
    assert_eq!(second.worker_id, worker_id);
    assert!(
        second.last_seen > first.last_seen,
        "Most recent write must win"
    );
    assert_eq!(second.payload, payload);
}

#[tokio::test]
async fn latest_heartbeat_returns_most_recent_worker() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;

    let older: WorkerId = "worker-old".parse().expect("Invalid worker ID");
    let newer: WorkerId = "worker-new".parse().expect("Invalid worker ID");
    let payload = json!({ "status": "idle" });

    //* When
    workers::publish_heartbeat(&*db.pool, &older, &payload)
        .await
        .expect("Failed to publish heartbeat");
    tokio::time::sleep(Duration::from_millis(50)).await;
    workers::publish_heartbeat(&*db.pool, &newer, &payload)
        .await
        .expect("Failed to publish heartbeat");

    let latest = workers::latest_heartbeat(&*db.pool)
        .await
        .expect("Failed to get latest heartbeat")
        .expect("Expected a heartbeat row");

    //* Then
    assert_eq!(latest.worker_id, newer);
}

#[tokio::test]
async fn detect_inactive_worker() {
    //* Given
    const ACTIVE_INTERVAL: Duration = Duration::from_secs(1);

    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;

    let worker_id: WorkerId = "short-lived".parse().expect("Invalid worker ID");
    workers::publish_heartbeat(&*db.pool, &worker_id, &json!({ "status": "idle" }))
        .await
        .expect("Failed to publish heartbeat");

    //* When
    let active_before = workers::list_active(&*db.pool, ACTIVE_INTERVAL)
        .await
        .expect("Failed to list active workers");

    // Sleep for 2 ACTIVE_INTERVAL to ensure the worker is considered inactive
    tokio::time::sleep(2 * ACTIVE_INTERVAL).await;

    let active_after = workers::list_active(&*db.pool, ACTIVE_INTERVAL)
        .await
        .expect("Failed to list active workers");

    //* Then
    assert!(active_before.contains(&worker_id));
    assert!(
        !active_after.contains(&worker_id),
        "The worker should be inactive"
    );
}
