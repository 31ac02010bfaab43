// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §4.E Worker Registry — thin wrapper over `db::workers` plus the liveness
//! sweeper background task. Task-spawning pattern grounded in the teacher's
//! `LifecycleManager::start`/`run_cleanup_task` (periodic `tokio::time::interval`
//! loop over a cloned `Arc` handle).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::db::{self, DbPool};
use crate::domain::{Worker, WorkerStatus};
use crate::errors::StoreError;

pub use db::workers::{HeartbeatUpdate, WorkerCreate, WorkerFilter};

pub struct WorkerRegistry {
    pool: DbPool,
    sweep_interval_secs: u64,
    liveness_timeout_secs: i64,
}

impl WorkerRegistry {
    pub fn new(pool: DbPool, sweep_interval_secs: u64, liveness_timeout_secs: i64) -> Self {
        Self { pool, sweep_interval_secs, liveness_timeout_secs }
    }

    pub async fn register(&self, spec: WorkerCreate) -> Result<Worker, StoreError> {
        db::workers::register(&self.pool, spec).await
    }

    pub async fn get(&self, id: uuid::Uuid) -> Result<Option<Worker>, StoreError> {
        db::workers::get(&self.pool, id).await
    }

    pub async fn list(&self, filter: WorkerFilter) -> Result<Vec<Worker>, StoreError> {
        db::workers::list(&self.pool, filter).await
    }

    /// §4.E Heartbeat — updates status/telemetry/`last_heartbeat` only.
    pub async fn heartbeat(&self, id: uuid::Uuid, update: HeartbeatUpdate) -> Result<Option<Worker>, StoreError> {
        db::workers::heartbeat(&self.pool, id, update).await
    }

    pub async fn delete(&self, id: uuid::Uuid, force: bool) -> Result<bool, StoreError> {
        db::workers::delete(&self.pool, id, force).await
    }

    /// Spawns the periodic liveness sweep as a detached background task.
    pub fn spawn_liveness_sweeper(self: Arc<Self>) {
        tokio::spawn(async move {
            self.run_liveness_sweep().await;
        });
    }

    async fn run_liveness_sweep(&self) {
        let mut ticker = interval(Duration::from_secs(self.sweep_interval_secs));
        loop {
            ticker.tick().await;
            debug!("running worker liveness sweep");

            match db::workers::sweep_offline(&self.pool, self.liveness_timeout_secs).await {
                Ok(offline) if !offline.is_empty() => {
                    info!("marked {} workers OFFLINE after {}s of silence", offline.len(), self.liveness_timeout_secs);
                }
                Ok(_) => {}
                Err(e) => warn!("liveness sweep failed: {}", e),
            }
        }
    }
}

/// §9 Open Question: DRAINING is represented as ONLINE with the worker's own
/// reported `current_load` pinned at `capacity` by the worker agent itself
/// (§4.H), so `WorkerStatus::Stopping` maps to an ineligible-for-claim state
/// without a dedicated DB column.
pub fn is_eligible_for_claim(worker: &Worker) -> bool {
    worker.status.is_claimable() && worker.has_spare_capacity()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_worker(status: WorkerStatus, capacity: i32, current_load: i32) -> Worker {
        Worker {
            id: Uuid::nil(),
            name: "w1".into(),
            work_pool_id: Uuid::nil(),
            status,
            capacity,
            current_load,
            cpu_percent: None,
            memory_usage_mb: None,
            disk_usage_mb: None,
            ip_address: None,
            last_heartbeat: None,
            provider_type: Default::default(),
            provider_id: None,
            provider_details: serde_json::json!({}),
            api_key: "key".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn offline_worker_is_not_claim_eligible() {
        assert!(!is_eligible_for_claim(&sample_worker(WorkerStatus::Offline, 5, 0)));
    }

    #[test]
    fn full_worker_is_not_claim_eligible() {
        assert!(!is_eligible_for_claim(&sample_worker(WorkerStatus::Online, 2, 2)));
    }

    #[test]
    fn online_worker_with_spare_capacity_is_eligible() {
        assert!(is_eligible_for_claim(&sample_worker(WorkerStatus::Online, 5, 1)));
    }
}
