//! vCenter inventory sync task
//!
//! Performs a three-tier hierarchical sync (clusters -> hosts -> VMs) for a
//! single vCenter, with content-hash-aware upserts and staged progress
//! reporting. Each phase commits its upserts, its audit event and its
//! progress advance together; a delay between phases stands in for the
//! round-trips a real vCenter client would make.
//!
//! The inventory itself is simulated: the shape (hierarchy, moids, payload
//! fields) matches what a real collector would produce, generated
//! deterministically from the vCenter id so repeated syncs observe the same
//! fleet.

use rand::{Rng as _, SeedableRng as _, rngs::StdRng};
use serde_json::json;
use uuid::Uuid;
use vcsync_db::{
    LeasedJob, SyncDb,
    inventory::{self, ClusterObservation, HostObservation, VmObservation},
    job_events::{self, EventLevel},
    job_steps, jobs,
};

use super::TaskError;
use crate::{Config, Error, dispatch};

/// Progress milestones reported after each phase.
pub const CLUSTERS_SYNCED_PROGRESS: i32 = 25;
pub const HOSTS_SYNCED_PROGRESS: i32 = 60;
pub const VMS_SYNCED_PROGRESS: i32 = 90;

/// Run the inventory sync for a leased job.
///
/// Any failure inside the sync is contained: the step and job are marked
/// failed with the captured error text plus an error event, and the worker
/// loop keeps running.
pub async fn run(db: &SyncDb, config: &Config, job: &LeasedJob) -> Result<(), Error> {
    match sync_inventory(db, config, job).await {
        Ok(()) => {
            tracing::info!(job_id = %job.job_id, "vCenter inventory sync completed");
            Ok(())
        }
        Err(err) => {
            tracing::error!(job_id = %job.job_id, error = %err, "vCenter inventory sync failed");
            dispatch::fail_job(db, job, &err.to_string()).await
        }
    }
}

async fn sync_inventory(db: &SyncDb, config: &Config, job: &LeasedJob) -> Result<(), TaskError> {
    let vcenter_id = parse_target(&job.target_ids)?;
    let observed = simulate_inventory(vcenter_id);

    // Phase 1 — clusters
    {
        let mut tx = db.begin().await?;
        job_events::record(
            &mut *tx,
            job.job_id,
            Some(job.step_id),
            EventLevel::Info,
            "Starting vCenter inventory sync",
            Some(json!({ "vcenter_id": vcenter_id })),
        )
        .await?;
        inventory::upsert_clusters(&mut *tx, vcenter_id, &observed.clusters).await?;
        job_events::record(
            &mut *tx,
            job.job_id,
            Some(job.step_id),
            EventLevel::Info,
            "Clusters synced",
            Some(json!({ "count": observed.clusters.len() })),
        )
        .await?;
        jobs::update_progress(&mut *tx, job.job_id, CLUSTERS_SYNCED_PROGRESS).await?;
        tx.commit().await.map_err(vcsync_db::Error::Database)?;
    }
    tokio::time::sleep(config.phase_delay).await;

    // Phase 2 — hosts
    {
        let mut tx = db.begin().await?;
        inventory::upsert_hosts(&mut *tx, vcenter_id, &observed.hosts).await?;
        job_events::record(
            &mut *tx,
            job.job_id,
            Some(job.step_id),
            EventLevel::Info,
            "Hosts synced",
            Some(json!({ "count": observed.hosts.len() })),
        )
        .await?;
        jobs::update_progress(&mut *tx, job.job_id, HOSTS_SYNCED_PROGRESS).await?;
        tx.commit().await.map_err(vcsync_db::Error::Database)?;
    }
    tokio::time::sleep(config.phase_delay).await;

    // Phase 3 — VMs
    {
        let mut tx = db.begin().await?;
        inventory::upsert_vms(&mut *tx, vcenter_id, &observed.vms).await?;
        job_events::record(
            &mut *tx,
            job.job_id,
            Some(job.step_id),
            EventLevel::Info,
            "VMs synced",
            Some(json!({ "count": observed.vms.len() })),
        )
        .await?;
        jobs::update_progress(&mut *tx, job.job_id, VMS_SYNCED_PROGRESS).await?;
        tx.commit().await.map_err(vcsync_db::Error::Database)?;
    }
    tokio::time::sleep(config.phase_delay).await;

    // Finalize — step completed, job completed (progress 100), completion event
    {
        let mut tx = db.begin().await?;
        job_steps::mark_completed(&mut *tx, job.step_id).await?;
        jobs::mark_completed(&mut *tx, job.job_id).await?;
        job_events::record(
            &mut *tx,
            job.job_id,
            Some(job.step_id),
            EventLevel::Info,
            "vCenter inventory sync completed",
            Some(json!({ "vcenter_id": vcenter_id })),
        )
        .await?;
        tx.commit().await.map_err(vcsync_db::Error::Database)?;
    }

    Ok(())
}

/// Extract and validate the vCenter id from the job's target list.
fn parse_target(target_ids: &[String]) -> Result<Uuid, TaskError> {
    let Some(raw) = target_ids.first() else {
        return Err(TaskError::MissingTarget);
    };
    Uuid::parse_str(raw).map_err(|source| TaskError::InvalidTarget {
        id: raw.clone(),
        source,
    })
}

/// A simulated vCenter inventory snapshot.
struct SimulatedInventory {
    clusters: Vec<ClusterObservation>,
    hosts: Vec<HostObservation>,
    vms: Vec<VmObservation>,
}

/// Build the simulated inventory for a vCenter.
///
/// Seeded from the vCenter id, so every sync of the same vCenter observes
/// the same fleet and re-upserts identical payloads.
fn simulate_inventory(vcenter_id: Uuid) -> SimulatedInventory {
    let mut rng = StdRng::seed_from_u64(u128::from_le_bytes(*vcenter_id.as_bytes()) as u64);

    let cluster_count = rng.gen_range(2..=4);
    let host_count = rng.gen_range(3..=6);
    let vm_count = rng.gen_range(5..=15);

    let clusters: Vec<ClusterObservation> = (0..cluster_count)
        .map(|idx| {
            let moid = format!("domain-c{}", idx + 1);
            let payload = json!({
                "name": format!("Cluster-{}", idx + 1),
                "moid": &moid,
                "cpu_usage_percent": rng.gen_range(20..=80),
                "memory_usage_percent": rng.gen_range(20..=80),
                "drs_enabled": true,
                "ha_enabled": rng.gen_bool(0.5),
            });
            ClusterObservation { moid, payload }
        })
        .collect();

    let hosts: Vec<HostObservation> = (0..host_count)
        .map(|idx| {
            let moid = format!("host-{}", idx + 1);
            let cluster_moid = clusters[rng.gen_range(0..clusters.len())].moid.clone();
            let payload = json!({
                "name": format!("esxi-{}.example.local", idx + 1),
                "moid": &moid,
                "cluster_moid": &cluster_moid,
                "model": "PowerEdge R750",
                "version": "8.0.0",
                "power_state": "on",
            });
            HostObservation {
                moid,
                cluster_moid,
                payload,
            }
        })
        .collect();

    let vms: Vec<VmObservation> = (0..vm_count)
        .map(|idx| {
            let moid = format!("vm-{}", idx + 1);
            let host_moid = hosts[rng.gen_range(0..hosts.len())].moid.clone();
            let uuid = Uuid::from_u128(vcenter_id.as_u128().wrapping_add(idx as u128));
            let power_state = ["poweredOn", "poweredOff", "suspended"][rng.gen_range(0..3)];
            let memory_mb = [2048, 4096, 8192, 16384][rng.gen_range(0..4)];
            let payload = json!({
                "name": format!("vm-{:03}.example.local", idx + 1),
                "moid": &moid,
                "host_moid": &host_moid,
                "uuid": uuid,
                "power_state": power_state,
                "vcpu": rng.gen_range(1..=16),
                "memory_mb": memory_mb,
            });
            VmObservation {
                moid,
                host_moid,
                uuid,
                payload,
            }
        })
        .collect();

    SimulatedInventory {
        clusters,
        hosts,
        vms,
    }
}
