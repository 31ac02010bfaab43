// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::enums::{ProviderType, WorkerStatus};

/// A process that polls a work pool and runs sessions on its host backend (§3 Worker).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: Uuid,
    pub name: String,
    pub work_pool_id: Uuid,
    pub status: WorkerStatus,

    pub capacity: i32,
    pub current_load: i32,

    pub cpu_percent: Option<f64>,
    pub memory_usage_mb: Option<f64>,
    pub disk_usage_mb: Option<f64>,

    pub ip_address: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,

    pub provider_type: ProviderType,
    pub provider_id: Option<String>,
    pub provider_details: JsonValue,

    pub api_key: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Worker {
    /// I1: `0 <= current_load <= capacity`.
    pub fn has_spare_capacity(&self) -> bool {
        self.current_load < self.capacity
    }

    /// §4.G step 1.
    pub fn is_claim_eligible(&self) -> bool {
        self.status.is_claimable() && self.has_spare_capacity()
    }
}
