//! Integration tests for the worker dispatch pipeline and poll loop

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use vcsync_db::{
    JobStatus, WorkerId, inventory,
    job_steps::{self, StepStatus},
    jobs::{self, NewJob},
    temp::TempSyncDb,
    workers,
};
use vcsync_worker::{Config, Worker, dispatch};

fn test_config(worker_id: &str) -> Config {
    let worker_id: WorkerId = worker_id.parse().expect("Invalid worker ID");
    Config {
        heartbeat_interval: Duration::from_millis(50),
        phase_delay: Duration::ZERO,
        ..Config::new(worker_id)
    }
}

async fn temp_db() -> TempSyncDb {
    TempSyncDb::new().await.expect("Failed to set up temp db")
}

#[tokio::test]
async fn inventory_sync_job_runs_to_completion() {
    //* Given
    let db = temp_db().await;
    let config = test_config("sync-worker-e2e");
    let vcenter_id = Uuid::new_v4();

    let job_id = jobs::create_inventory_sync_job(&*db.pool, vcenter_id, "vc-east-1", None)
        .await
        .expect("Failed to create job");

    //* When
    let leased = jobs::lease_next(&db, &config.worker_id)
        .await
        .expect("Failed to lease job")
        .expect("Expected an eligible job");
    assert_eq!(leased.job_id, job_id);

    dispatch::dispatch(&db, &config, &leased)
        .await
        .expect("Dispatch failed");

    //* Then
    let job = jobs::get_by_id(&*db.pool, job_id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert!(job.completed_at.is_some());

    let steps = job_steps::list_for_job(&*db.pool, job_id)
        .await
        .expect("Failed to list steps");
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].status, StepStatus::Completed);
    assert!(steps[0].completed_at.is_some());
    assert!(steps[0].error.is_none());

    // The audit trail covers the full lifecycle, oldest last
    let events = vcsync_db::job_events::list_for_job(&*db.pool, job_id, 20)
        .await
        .expect("Failed to list events");
    let messages: Vec<&str> = events.iter().rev().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        [
            "Job leased by worker",
            "Starting vCenter inventory sync",
            "Clusters synced",
            "Hosts synced",
            "VMs synced",
            "vCenter inventory sync completed",
        ]
    );

    // All three inventory tiers were written for this vCenter
    let clusters = inventory::count_clusters(&*db.pool, vcenter_id)
        .await
        .expect("Failed to count clusters");
    let hosts = inventory::count_hosts(&*db.pool, vcenter_id)
        .await
        .expect("Failed to count hosts");
    let vms = inventory::count_vms(&*db.pool, vcenter_id)
        .await
        .expect("Failed to count vms");
    assert!(clusters > 0);
    assert!(hosts > 0);
    assert!(vms > 0);
}

#[tokio::test]
async fn resyncing_the_same_vcenter_is_idempotent() {
    //* Given
    let db = temp_db().await;
    let config = test_config("sync-worker-resync");
    let vcenter_id = Uuid::new_v4();

    //* When
    let mut counts = Vec::new();
    for _ in 0..2 {
        jobs::create_inventory_sync_job(&*db.pool, vcenter_id, "vc-east-1", None)
            .await
            .expect("Failed to create job");
        let leased = jobs::lease_next(&db, &config.worker_id)
            .await
            .expect("Failed to lease job")
            .expect("Expected an eligible job");
        dispatch::dispatch(&db, &config, &leased)
            .await
            .expect("Dispatch failed");

        let vms = inventory::count_vms(&*db.pool, vcenter_id)
            .await
            .expect("Failed to count vms");
        counts.push(vms);
    }

    //* Then
    // The simulated fleet is derived from the vCenter id, so a second sync
    // upserts the same rows instead of accumulating duplicates.
    assert_eq!(counts[0], counts[1]);
}

#[tokio::test]
async fn unsupported_job_type_fails_with_no_partial_execution() {
    //* Given
    let db = temp_db().await;
    let config = test_config("sync-worker-unsupported");
    let vcenter_id = Uuid::new_v4();
    let target_ids = [vcenter_id.to_string()];

    let job_id = jobs::create(
        &*db.pool,
        NewJob {
            job_type: "firmware_update",
            name: "Firmware update",
            description: "",
            site_id: None,
            target_type: "vcenter",
            target_ids: &target_ids,
        },
    )
    .await
    .expect("Failed to create job");

    //* When
    let leased = jobs::lease_next(&db, &config.worker_id)
        .await
        .expect("Failed to lease job")
        .expect("Expected an eligible job");
    dispatch::dispatch(&db, &config, &leased)
        .await
        .expect("Dispatch failed");

    //* Then
    let job = jobs::get_by_id(&*db.pool, job_id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.progress, 0);

    let steps = job_steps::list_for_job(&*db.pool, job_id)
        .await
        .expect("Failed to list steps");
    assert_eq!(steps[0].status, StepStatus::Failed);
    assert_eq!(
        steps[0].error.as_deref(),
        Some("Unsupported job type firmware_update")
    );

    // No inventory writes happened
    let vms = inventory::count_vms(&*db.pool, vcenter_id)
        .await
        .expect("Failed to count vms");
    assert_eq!(vms, 0);
}

#[tokio::test]
async fn missing_target_fails_the_job_before_any_work() {
    //* Given
    let db = temp_db().await;
    let config = test_config("sync-worker-notarget");

    let job_id = jobs::create(
        &*db.pool,
        NewJob {
            job_type: jobs::INVENTORY_SYNC_JOB_TYPE,
            name: "Inventory sync: nowhere",
            description: "",
            site_id: None,
            target_type: "vcenter",
            target_ids: &[],
        },
    )
    .await
    .expect("Failed to create job");

    //* When
    let leased = jobs::lease_next(&db, &config.worker_id)
        .await
        .expect("Failed to lease job")
        .expect("Expected an eligible job");
    dispatch::dispatch(&db, &config, &leased)
        .await
        .expect("Dispatch failed");

    //* Then
    let job = jobs::get_by_id(&*db.pool, job_id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.progress, 0, "No progress advancement before failure");

    let steps = job_steps::list_for_job(&*db.pool, job_id)
        .await
        .expect("Failed to list steps");
    assert_eq!(steps[0].status, StepStatus::Failed);
    assert_eq!(steps[0].error.as_deref(), Some("Missing vcenter target id"));
}

#[tokio::test]
async fn malformed_target_fails_the_job() {
    //* Given
    let db = temp_db().await;
    let config = test_config("sync-worker-badtarget");
    let target_ids = ["not-a-uuid".to_string()];

    let job_id = jobs::create(
        &*db.pool,
        NewJob {
            job_type: jobs::INVENTORY_SYNC_JOB_TYPE,
            name: "Inventory sync: bad target",
            description: "",
            site_id: None,
            target_type: "vcenter",
            target_ids: &target_ids,
        },
    )
    .await
    .expect("Failed to create job");

    //* When
    let leased = jobs::lease_next(&db, &config.worker_id)
        .await
        .expect("Failed to lease job")
        .expect("Expected an eligible job");
    dispatch::dispatch(&db, &config, &leased)
        .await
        .expect("Dispatch failed");

    //* Then
    let job = jobs::get_by_id(&*db.pool, job_id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(job.status, JobStatus::Failed);

    let steps = job_steps::list_for_job(&*db.pool, job_id)
        .await
        .expect("Failed to list steps");
    let error = steps[0].error.as_deref().expect("Step error not captured");
    assert!(error.starts_with("Invalid vcenter target id 'not-a-uuid'"));
}

#[tokio::test]
async fn worker_loop_processes_jobs_and_drains_on_shutdown() {
    //* Given
    let db = temp_db().await;
    let config = test_config("sync-worker-loop");
    let worker_id = config.worker_id.clone();
    let vcenter_id = Uuid::new_v4();

    let job_id = jobs::create_inventory_sync_job(&*db.pool, vcenter_id, "vc-loop", None)
        .await
        .expect("Failed to create job");

    //* When
    let shutdown = CancellationToken::new();
    let worker = Worker::new((*db).clone(), config);
    let handle = tokio::spawn(worker.run(shutdown.clone()));

    // Wait for the worker to drive the job to a terminal state, sampling
    // the reported progress along the way
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    let mut observed_progress = Vec::new();
    loop {
        let job = jobs::get_by_id(&*db.pool, job_id)
            .await
            .expect("Failed to get job")
            .expect("Job not found");
        observed_progress.push(job.progress);
        if job.status.is_terminal() {
            assert_eq!(job.status, JobStatus::Completed);
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "Job did not reach a terminal state in time"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Progress only ever moves forward and ends at exactly 100
    assert!(observed_progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(observed_progress.last(), Some(&100));

    shutdown.cancel();
    handle
        .await
        .expect("Worker task panicked")
        .expect("Worker loop failed");

    //* Then
    // The worker published its liveness while polling
    let heartbeat = workers::get_heartbeat(&*db.pool, &worker_id)
        .await
        .expect("Failed to get heartbeat")
        .expect("Heartbeat not found");
    assert_eq!(heartbeat.payload, serde_json::json!({ "status": "idle" }));

    // No new job is leased after the shutdown signal
    let late_job_id = jobs::create_inventory_sync_job(&*db.pool, Uuid::new_v4(), "vc-late", None)
        .await
        .expect("Failed to create late job");
    tokio::time::sleep(Duration::from_millis(200)).await;

    let late_job = jobs::get_by_id(&*db.pool, late_job_id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(late_job.status, JobStatus::Pending);
}
