//! DB integration tests for the job queue and lease path

use pgtemp::PgTempDB;
use uuid::Uuid;
use vcsync_db::{
    Error, JobStatus, JobStatusUpdateError, SyncDb, WorkerId, job_steps, jobs, test_utils,
};

async fn connect(temp_db: &PgTempDB) -> SyncDb {
    test_utils::connect_with_retry(&temp_db.connection_uri(), SyncDb::default_pool_size())
        .await
        .expect("Failed to connect to sync db")
}

fn worker_id() -> WorkerId {
    "test-worker-id".parse().expect("Invalid worker ID")
}

#[tokio::test]
async fn created_job_has_pending_defaults() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;
    let vcenter_id = Uuid::new_v4();

    //* When
    let job_id = jobs::create_inventory_sync_job(&*db.pool, vcenter_id, "vc-east-1", None)
        .await
        .expect("Failed to create job");

    let job = jobs::get_by_id(&*db.pool, job_id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");

    //* Then
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.job_type, jobs::INVENTORY_SYNC_JOB_TYPE);
    assert_eq!(job.priority, 0);
    assert_eq!(job.progress, 0);
    assert_eq!(job.target_type, "vcenter");
    assert_eq!(job.target_ids, [vcenter_id.to_string()]);
    assert!(job.started_at.is_none());
    assert!(job.completed_at.is_none());
}

#[tokio::test]
async fn lease_claims_oldest_job_and_records_step_and_event() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;

    let first_job_id = jobs::create_inventory_sync_job(&*db.pool, Uuid::new_v4(), "vc-a", None)
        .await
        .expect("Failed to create first job");
    let _second_job_id = jobs::create_inventory_sync_job(&*db.pool, Uuid::new_v4(), "vc-b", None)
        .await
        .expect("Failed to create second job");

    //* When
    let leased = jobs::lease_next(&db, &worker_id())
        .await
        .expect("Failed to lease job")
        .expect("Expected an eligible job");

    //* Then
    // FIFO: the oldest job is claimed first
    assert_eq!(leased.job_id, first_job_id);
    assert_eq!(leased.job_type, jobs::INVENTORY_SYNC_JOB_TYPE);
    assert_eq!(leased.target_ids.len(), 1);

    let job = jobs::get_by_id(&*db.pool, leased.job_id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(job.status, JobStatus::Running);
    assert!(job.started_at.is_some());

    let steps = job_steps::list_for_job(&*db.pool, leased.job_id)
        .await
        .expect("Failed to list steps");
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].id, leased.step_id);
    assert_eq!(steps[0].sequence, 1);
    assert_eq!(steps[0].status, job_steps::StepStatus::Running);
    assert_eq!(steps[0].name, jobs::LEASE_STEP_NAME);

    let events = vcsync_db::job_events::list_for_job(&*db.pool, leased.job_id, 10)
        .await
        .expect("Failed to list events");
    assert!(
        events.iter().any(|e| e.message == "Job leased by worker"),
        "Lease event not recorded"
    );
}

#[tokio::test]
async fn lease_returns_none_when_queue_is_empty() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;

    //* When
    let leased = jobs::lease_next(&db, &worker_id())
        .await
        .expect("Failed to run lease");

    //* Then
    assert!(leased.is_none());
}

#[tokio::test]
async fn exactly_one_concurrent_lease_wins() {
    //* Given
    const ATTEMPTS: usize = 8;

    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;

    jobs::create_inventory_sync_job(&*db.pool, Uuid::new_v4(), "vc-contended", None)
        .await
        .expect("Failed to create job");

    //* When
    let mut handles = Vec::new();
    for i in 0..ATTEMPTS {
        let db = db.clone();
        let worker: WorkerId = format!("racer-{i}").parse().expect("Invalid worker ID");
        handles.push(tokio::spawn(
            async move { jobs::lease_next(&db, &worker).await },
        ));
    }

    let mut winners = 0;
    for handle in handles {
        let result = handle
            .await
            .expect("Lease task panicked")
            .expect("Lease attempt failed");
        if result.is_some() {
            winners += 1;
        }
    }

    //* Then
    assert_eq!(winners, 1, "Exactly one lease attempt must win");
}

#[tokio::test]
async fn status_transitions_are_monotonic() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;

    let job_id = jobs::create_inventory_sync_job(&*db.pool, Uuid::new_v4(), "vc-mono", None)
        .await
        .expect("Failed to create job");

    //* When
    // Completing a job that was never leased must be rejected
    let premature = jobs::mark_completed(&*db.pool, job_id).await;

    //* Then
    assert!(matches!(
        premature,
        Err(Error::JobStatusUpdate(JobStatusUpdateError::StateConflict {
            actual: JobStatus::Pending,
            ..
        }))
    ));

    // pending -> running -> completed is the happy path
    jobs::lease_next(&db, &worker_id())
        .await
        .expect("Failed to lease job")
        .expect("Expected an eligible job");
    jobs::mark_completed(&*db.pool, job_id)
        .await
        .expect("Failed to complete running job");

    // Terminal states never move backwards
    let reversal = jobs::mark_failed(&*db.pool, job_id).await;
    assert!(matches!(
        reversal,
        Err(Error::JobStatusUpdate(JobStatusUpdateError::StateConflict {
            actual: JobStatus::Completed,
            ..
        }))
    ));

    let job = jobs::get_by_id(&*db.pool, job_id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn progress_never_decreases() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;

    let job_id = jobs::create_inventory_sync_job(&*db.pool, Uuid::new_v4(), "vc-progress", None)
        .await
        .expect("Failed to create job");
    jobs::lease_next(&db, &worker_id())
        .await
        .expect("Failed to lease job")
        .expect("Expected an eligible job");

    //* When
    jobs::update_progress(&*db.pool, job_id, 60)
        .await
        .expect("Failed to update progress");
    jobs::update_progress(&*db.pool, job_id, 25)
        .await
        .expect("Failed to update progress");

    //* Then
    let job = jobs::get_by_id(&*db.pool, job_id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(job.progress, 60, "Progress must be non-decreasing");
}

#[tokio::test]
async fn queue_depth_counts_only_leasable_jobs() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = connect(&temp_db).await;

    jobs::create_inventory_sync_job(&*db.pool, Uuid::new_v4(), "vc-1", None)
        .await
        .expect("Failed to create job 1");
    jobs::create_inventory_sync_job(&*db.pool, Uuid::new_v4(), "vc-2", None)
        .await
        .expect("Failed to create job 2");

    //* When
    let depth_before = jobs::queue_depth(&*db.pool)
        .await
        .expect("Failed to get queue depth");

    jobs::lease_next(&db, &worker_id())
        .await
        .expect("Failed to lease job")
        .expect("Expected an eligible job");

    let depth_after = jobs::queue_depth(&*db.pool)
        .await
        .expect("Failed to get queue depth");

    //* Then
    assert_eq!(depth_before, 2);
    assert_eq!(depth_after, 1, "Leased jobs are no longer queued");
}
