// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! CRUD for the Worker entity, heartbeat ingestion, and the liveness sweep
//! (§4.E). `current_load` is mutated only from `claim::claim_session` and
//! `decrement_load` here — heartbeat touches status/telemetry only, never
//! load, per §5's "key separation".

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use super::pool::DbPool;
use crate::domain::{ProviderType, Worker, WorkerStatus};
use crate::errors::StoreError;

#[derive(Debug, FromRow)]
struct DbWorker {
    id: Uuid,
    name: String,
    work_pool_id: Uuid,
    status: String,
    capacity: i32,
    current_load: i32,
    cpu_percent: Option<f64>,
    memory_usage_mb: Option<f64>,
    disk_usage_mb: Option<f64>,
    ip_address: Option<String>,
    last_heartbeat: Option<DateTime<Utc>>,
    provider_type: String,
    provider_id: Option<String>,
    provider_details: JsonValue,
    api_key: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DbWorker> for Worker {
    type Error = StoreError;

    fn try_from(row: DbWorker) -> Result<Self, Self::Error> {
        Ok(Worker {
            id: row.id,
            name: row.name,
            work_pool_id: row.work_pool_id,
            status: WorkerStatus::from_str(&row.status).map_err(StoreError::Validation)?,
            capacity: row.capacity,
            current_load: row.current_load,
            cpu_percent: row.cpu_percent,
            memory_usage_mb: row.memory_usage_mb,
            disk_usage_mb: row.disk_usage_mb,
            ip_address: row.ip_address,
            last_heartbeat: row.last_heartbeat,
            provider_type: ProviderType::from_str(&row.provider_type).map_err(StoreError::Validation)?,
            provider_id: row.provider_id,
            provider_details: row.provider_details,
            api_key: row.api_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct WorkerCreate {
    pub name: String,
    pub work_pool_id: Uuid,
    pub capacity: i32,
    pub provider_type: ProviderType,
    pub api_key: Option<String>,
}

/// §6 POST /workerpools/workers — `api_key` generated if absent (32 random
/// bytes, hex-encoded to keep it URL- and shell-safe without another crate).
fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub async fn register(pool: &DbPool, spec: WorkerCreate) -> Result<Worker, StoreError> {
    let api_key = spec.api_key.unwrap_or_else(generate_api_key);

    let row = sqlx::query_as::<_, DbWorker>(
        r#"
        INSERT INTO workers (name, work_pool_id, capacity, provider_type, api_key)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&spec.name)
    .bind(spec.work_pool_id)
    .bind(spec.capacity)
    .bind(spec.provider_type.to_string())
    .bind(&api_key)
    .fetch_one(pool)
    .await?;

    row.try_into()
}

pub async fn get(pool: &DbPool, id: Uuid) -> Result<Option<Worker>, StoreError> {
    let row = sqlx::query_as::<_, DbWorker>("SELECT * FROM workers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(Worker::try_from).transpose()
}

pub async fn get_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
) -> Result<Option<Worker>, StoreError> {
    let row = sqlx::query_as::<_, DbWorker>("SELECT * FROM workers WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    row.map(Worker::try_from).transpose()
}

#[derive(Debug, Clone, Default)]
pub struct WorkerFilter {
    pub work_pool_id: Option<Uuid>,
    pub status: Option<WorkerStatus>,
}

pub async fn list(pool: &DbPool, filter: WorkerFilter) -> Result<Vec<Worker>, StoreError> {
    let rows = sqlx::query_as::<_, DbWorker>(
        r#"
        SELECT * FROM workers
        WHERE ($1::UUID IS NULL OR work_pool_id = $1)
          AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY created_at ASC
        "#,
    )
    .bind(filter.work_pool_id)
    .bind(filter.status.map(|s| s.to_string()))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Worker::try_from).collect()
}

/// Workers with spare capacity in the given pool, used for §4.F scoring.
pub async fn count_available_in_pool(pool: &DbPool, work_pool_id: Uuid) -> Result<i64, StoreError> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM workers
        WHERE work_pool_id = $1
          AND status IN ('online', 'busy')
          AND current_load < capacity
        "#,
    )
    .bind(work_pool_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

#[derive(Debug, Clone)]
pub struct HeartbeatUpdate {
    pub status: WorkerStatus,
    pub current_load: i32,
    pub cpu_percent: Option<f64>,
    pub memory_usage_mb: Option<f64>,
    pub disk_usage_mb: Option<f64>,
    pub ip_address: Option<String>,
}

/// §4.E Heartbeat — updates status/telemetry/`last_heartbeat`, never `current_load`
/// directly as a scheduling decision (the reported value is the worker's own
/// count, accepted as-is; it is never incremented/decremented here).
pub async fn heartbeat(pool: &DbPool, id: Uuid, update: HeartbeatUpdate) -> Result<Option<Worker>, StoreError> {
    let row = sqlx::query_as::<_, DbWorker>(
        r#"
        UPDATE workers
        SET status = $1, current_load = $2, cpu_percent = $3, memory_usage_mb = $4,
            disk_usage_mb = $5, ip_address = $6, last_heartbeat = NOW(), updated_at = NOW()
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(update.status.to_string())
    .bind(update.current_load)
    .bind(update.cpu_percent)
    .bind(update.memory_usage_mb)
    .bind(update.disk_usage_mb)
    .bind(update.ip_address)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(Worker::try_from).transpose()
}

/// §4.B step 3 / §4.F `OnTerminalStatus` — bounded decrement inside the caller's transaction.
pub async fn decrement_load(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, worker_id: Uuid) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE workers SET current_load = GREATEST(current_load - 1, 0), updated_at = NOW() WHERE id = $1",
    )
    .bind(worker_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// §4.G step 5 — increment inside the claim transaction.
pub async fn increment_load(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, worker_id: Uuid) -> Result<(), StoreError> {
    sqlx::query("UPDATE workers SET current_load = current_load + 1, updated_at = NOW() WHERE id = $1")
        .bind(worker_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// §4.E liveness sweep: workers silent for >= `timeout_secs` go OFFLINE.
/// Returns the ids that were flipped this sweep (P7).
pub async fn sweep_offline(pool: &DbPool, timeout_secs: i64) -> Result<Vec<Uuid>, StoreError> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE workers
        SET status = 'offline', updated_at = NOW()
        WHERE status != 'offline'
          AND last_heartbeat IS NOT NULL
          AND last_heartbeat < NOW() - ($1 || ' seconds')::INTERVAL
        RETURNING id
        "#,
    )
    .bind(timeout_secs.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn delete(pool: &DbPool, id: Uuid, force: bool) -> Result<bool, StoreError> {
    let Some(worker) = get(pool, id).await? else {
        return Ok(false);
    };
    if worker.current_load > 0 && !force {
        return Err(StoreError::Conflict(format!(
            "worker {} has {} active sessions; pass force=true to remove anyway",
            id, worker.current_load
        )));
    }
    sqlx::query("DELETE FROM workers WHERE id = $1").bind(id).execute(pool).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_api_key_is_long_and_url_safe() {
        let key = generate_api_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_api_keys_are_distinct() {
        assert_ne!(generate_api_key(), generate_api_key());
    }
}
