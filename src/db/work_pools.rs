// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! CRUD for the WorkPool entity (§3, §4.D). Defaults are stored as nullable
//! columns; `scheduler::apply_pool_defaults` is the only place that merges
//! them onto a session.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use super::pool::DbPool;
use crate::domain::{
    Browser, BrowserVersion, OperatingSystem, Proxy, ProviderType, ResourceLimits, Screen, WorkPool, WorkPoolStatus,
};
use crate::errors::StoreError;

#[derive(Debug, FromRow)]
struct DbWorkPool {
    id: Uuid,
    name: String,
    provider_type: String,
    status: String,

    default_browser: Option<String>,
    default_version: Option<String>,
    default_headless: Option<bool>,
    default_operating_system: Option<String>,
    default_screen: Option<JsonValue>,
    default_proxy: Option<JsonValue>,
    default_resource_limits: Option<JsonValue>,
    default_environment: Option<JsonValue>,

    min_workers: i32,
    max_workers: i32,
    max_sessions_per_worker: i32,

    provider_config: JsonValue,
    description: Option<String>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DbWorkPool> for WorkPool {
    type Error = StoreError;

    fn try_from(row: DbWorkPool) -> Result<Self, Self::Error> {
        Ok(WorkPool {
            id: row.id,
            name: row.name,
            provider_type: ProviderType::from_str(&row.provider_type).map_err(StoreError::Validation)?,
            status: WorkPoolStatus::from_str(&row.status).map_err(StoreError::Validation)?,
            default_browser: row
                .default_browser
                .map(|b| Browser::from_str(&b))
                .transpose()
                .map_err(StoreError::Validation)?,
            default_version: row
                .default_version
                .map(|v| BrowserVersion::from_str(&v))
                .transpose()
                .map_err(StoreError::Validation)?,
            default_headless: row.default_headless,
            default_operating_system: row
                .default_operating_system
                .map(|o| OperatingSystem::from_str(&o))
                .transpose()
                .map_err(StoreError::Validation)?,
            default_screen: row
                .default_screen
                .map(serde_json::from_value::<Screen>)
                .transpose()
                .map_err(|e| StoreError::QueryFailed(e.to_string()))?,
            default_proxy: row
                .default_proxy
                .map(serde_json::from_value::<Proxy>)
                .transpose()
                .map_err(|e| StoreError::QueryFailed(e.to_string()))?,
            default_resource_limits: row
                .default_resource_limits
                .map(serde_json::from_value::<ResourceLimits>)
                .transpose()
                .map_err(|e| StoreError::QueryFailed(e.to_string()))?,
            default_environment: row
                .default_environment
                .map(serde_json::from_value::<HashMap<String, String>>)
                .transpose()
                .map_err(|e| StoreError::QueryFailed(e.to_string()))?,
            min_workers: row.min_workers,
            max_workers: row.max_workers,
            max_sessions_per_worker: row.max_sessions_per_worker,
            provider_config: row.provider_config,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkPoolCreate {
    pub name: String,
    pub provider_type: ProviderType,
    pub default_browser: Option<Browser>,
    pub default_version: Option<BrowserVersion>,
    pub default_headless: Option<bool>,
    pub default_operating_system: Option<OperatingSystem>,
    pub default_screen: Option<Screen>,
    pub default_proxy: Option<Proxy>,
    pub default_resource_limits: Option<ResourceLimits>,
    pub default_environment: Option<HashMap<String, String>>,
    pub min_workers: i32,
    pub max_workers: i32,
    pub max_sessions_per_worker: i32,
    pub provider_config: JsonValue,
    pub description: Option<String>,
}

impl WorkPoolCreate {
    /// §4.D validation: `min_workers <= max_workers`, both non-negative.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.min_workers < 0 || self.max_workers < 0 {
            return Err(StoreError::Validation("worker bounds must be non-negative".into()));
        }
        if self.min_workers > self.max_workers {
            return Err(StoreError::Validation("min_workers must not exceed max_workers".into()));
        }
        if self.max_sessions_per_worker < 1 {
            return Err(StoreError::Validation("max_sessions_per_worker must be at least 1".into()));
        }
        Ok(())
    }
}

pub async fn create(pool: &DbPool, spec: WorkPoolCreate) -> Result<WorkPool, StoreError> {
    spec.validate()?;

    let row = sqlx::query_as::<_, DbWorkPool>(
        r#"
        INSERT INTO work_pools
            (name, provider_type, default_browser, default_version, default_headless,
             default_operating_system, default_screen, default_proxy, default_resource_limits,
             default_environment, min_workers, max_workers, max_sessions_per_worker,
             provider_config, description)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING *
        "#,
    )
    .bind(&spec.name)
    .bind(spec.provider_type.to_string())
    .bind(spec.default_browser.map(|b| b.to_string()))
    .bind(spec.default_version.map(|v| v.to_string()))
    .bind(spec.default_headless)
    .bind(spec.default_operating_system.map(|o| o.to_string()))
    .bind(spec.default_screen.as_ref().map(|s| serde_json::to_value(s).unwrap()))
    .bind(spec.default_proxy.as_ref().map(|p| serde_json::to_value(p).unwrap()))
    .bind(
        spec.default_resource_limits
            .as_ref()
            .map(|r| serde_json::to_value(r).unwrap()),
    )
    .bind(
        spec.default_environment
            .as_ref()
            .map(|e| serde_json::to_value(e).unwrap()),
    )
    .bind(spec.min_workers)
    .bind(spec.max_workers)
    .bind(spec.max_sessions_per_worker)
    .bind(spec.provider_config)
    .bind(spec.description)
    .fetch_one(pool)
    .await?;

    row.try_into()
}

pub async fn get(pool: &DbPool, id: Uuid) -> Result<Option<WorkPool>, StoreError> {
    let row = sqlx::query_as::<_, DbWorkPool>("SELECT * FROM work_pools WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(WorkPool::try_from).transpose()
}

pub async fn get_by_name(pool: &DbPool, name: &str) -> Result<Option<WorkPool>, StoreError> {
    let row = sqlx::query_as::<_, DbWorkPool>("SELECT * FROM work_pools WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    row.map(WorkPool::try_from).transpose()
}

pub async fn list(pool: &DbPool) -> Result<Vec<WorkPool>, StoreError> {
    let rows = sqlx::query_as::<_, DbWorkPool>("SELECT * FROM work_pools ORDER BY created_at ASC")
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(WorkPool::try_from).collect()
}

/// §6 `PUT /workerpools/pools/{id}` — full-representation replace, the same
/// shape `create` accepts plus `status` (a pool's status is administratively
/// settable per §4's lifecycle, not just via the dedicated placement path).
#[derive(Debug, Clone)]
pub struct WorkPoolUpdate {
    pub name: String,
    pub provider_type: ProviderType,
    pub status: WorkPoolStatus,
    pub default_browser: Option<Browser>,
    pub default_version: Option<BrowserVersion>,
    pub default_headless: Option<bool>,
    pub default_operating_system: Option<OperatingSystem>,
    pub default_screen: Option<Screen>,
    pub default_proxy: Option<Proxy>,
    pub default_resource_limits: Option<ResourceLimits>,
    pub default_environment: Option<HashMap<String, String>>,
    pub min_workers: i32,
    pub max_workers: i32,
    pub max_sessions_per_worker: i32,
    pub provider_config: JsonValue,
    pub description: Option<String>,
}

impl WorkPoolUpdate {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.min_workers < 0 || self.max_workers < 0 {
            return Err(StoreError::Validation("worker bounds must be non-negative".into()));
        }
        if self.min_workers > self.max_workers {
            return Err(StoreError::Validation("min_workers must not exceed max_workers".into()));
        }
        if self.max_sessions_per_worker < 1 {
            return Err(StoreError::Validation("max_sessions_per_worker must be at least 1".into()));
        }
        Ok(())
    }
}

pub async fn update(pool: &DbPool, id: Uuid, spec: WorkPoolUpdate) -> Result<Option<WorkPool>, StoreError> {
    spec.validate()?;

    let row = sqlx::query_as::<_, DbWorkPool>(
        r#"
        UPDATE work_pools
        SET name = $1, provider_type = $2, status = $3, default_browser = $4,
            default_version = $5, default_headless = $6, default_operating_system = $7,
            default_screen = $8, default_proxy = $9, default_resource_limits = $10,
            default_environment = $11, min_workers = $12, max_workers = $13,
            max_sessions_per_worker = $14, provider_config = $15, description = $16,
            updated_at = NOW()
        WHERE id = $17
        RETURNING *
        "#,
    )
    .bind(&spec.name)
    .bind(spec.provider_type.to_string())
    .bind(spec.status.to_string())
    .bind(spec.default_browser.map(|b| b.to_string()))
    .bind(spec.default_version.map(|v| v.to_string()))
    .bind(spec.default_headless)
    .bind(spec.default_operating_system.map(|o| o.to_string()))
    .bind(spec.default_screen.as_ref().map(|s| serde_json::to_value(s).unwrap()))
    .bind(spec.default_proxy.as_ref().map(|p| serde_json::to_value(p).unwrap()))
    .bind(
        spec.default_resource_limits
            .as_ref()
            .map(|r| serde_json::to_value(r).unwrap()),
    )
    .bind(
        spec.default_environment
            .as_ref()
            .map(|e| serde_json::to_value(e).unwrap()),
    )
    .bind(spec.min_workers)
    .bind(spec.max_workers)
    .bind(spec.max_sessions_per_worker)
    .bind(spec.provider_config)
    .bind(spec.description)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(WorkPool::try_from).transpose()
}

/// §4.D delete: refused while the pool still has workers or non-terminal
/// sessions, unless `force` is set, mirroring the worker/session delete rule.
pub async fn delete(pool: &DbPool, id: Uuid, force: bool) -> Result<bool, StoreError> {
    if get(pool, id).await?.is_none() {
        return Ok(false);
    }

    if !force {
        let (worker_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM workers WHERE work_pool_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
        let active_sessions = super::sessions::count_active_in_pool(pool, id).await?;
        if worker_count > 0 || active_sessions > 0 {
            return Err(StoreError::Conflict(format!(
                "work pool {} has {} workers and {} active sessions; pass force=true to remove anyway",
                id, worker_count, active_sessions
            )));
        }
    }

    sqlx::query("DELETE FROM work_pools WHERE id = $1").bind(id).execute(pool).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_min_greater_than_max() {
        let spec = WorkPoolCreate { min_workers: 5, max_workers: 2, max_sessions_per_worker: 1, ..Default::default() };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_sessions_per_worker() {
        let spec = WorkPoolCreate { max_sessions_per_worker: 0, ..Default::default() };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn validate_accepts_sane_bounds() {
        let spec = WorkPoolCreate { min_workers: 0, max_workers: 10, max_sessions_per_worker: 5, ..Default::default() };
        assert!(spec.validate().is_ok());
    }
}
