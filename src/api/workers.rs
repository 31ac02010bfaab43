// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §6 `/api/v1/workerpools/workers` — worker registration, heartbeat, claim,
//! and the per-worker/per-pool metrics read paths, backed by
//! `registry::WorkerRegistry` (§4.E), `claim::claim_session` (§4.G), and
//! `metrics_aggregate` (§4.I).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;
use crate::claim;
use crate::db::audit::{self, AuditContext, EventType};
use crate::domain::{ProviderType, Worker, WorkerStatus};
use crate::errors::ClaimError;
use crate::metrics_aggregate::{self, Interval, MetricsBucket, Scope};
use crate::registry::{HeartbeatUpdate, WorkerCreate, WorkerFilter};

#[derive(Debug, Deserialize)]
pub struct WorkerRegisterRequest {
    pub name: String,
    pub work_pool_id: Uuid,
    pub capacity: i32,
    #[serde(default)]
    pub provider_type: ProviderType,
}

impl From<WorkerRegisterRequest> for WorkerCreate {
    fn from(req: WorkerRegisterRequest) -> Self {
        WorkerCreate { name: req.name, work_pool_id: req.work_pool_id, capacity: req.capacity, provider_type: req.provider_type, api_key: None }
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<WorkerRegisterRequest>,
) -> Result<(StatusCode, Json<Worker>), ApiError> {
    let worker = state.workers.register(body.into()).await?;

    let ctx = AuditContext { worker_id: Some(worker.id), work_pool_id: Some(worker.work_pool_id), ..Default::default() };
    if let Err(e) = audit::log(&state.db, "api", EventType::WorkerRegistered, None, ctx).await {
        tracing::warn!("failed to write audit log for worker {}: {}", worker.id, e);
    }

    Ok((StatusCode::CREATED, Json(worker)))
}

#[derive(Debug, Deserialize, Default)]
pub struct WorkerListQuery {
    pub work_pool_id: Option<Uuid>,
    pub status: Option<WorkerStatus>,
}

pub async fn list(State(state): State<AppState>, Query(q): Query<WorkerListQuery>) -> Result<Json<Vec<Worker>>, ApiError> {
    let filter = WorkerFilter { work_pool_id: q.work_pool_id, status: q.status };
    let workers = state.workers.list(filter).await?;
    Ok(Json(workers))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Worker>, ApiError> {
    let worker = state.workers.get(id).await?.ok_or_else(|| ApiError::NotFound(format!("worker {}", id)))?;
    Ok(Json(worker))
}

#[derive(Debug, Deserialize, Default)]
pub struct WorkerDeleteQuery {
    #[serde(default)]
    pub force: bool,
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<WorkerDeleteQuery>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.workers.delete(id, q.force).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("worker {}", id)));
    }

    let ctx = AuditContext { worker_id: Some(id), ..Default::default() };
    if let Err(e) = audit::log(&state.db, "api", EventType::WorkerOffline, None, ctx).await {
        tracing::warn!("failed to write audit log for worker {}: {}", id, e);
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub status: WorkerStatus,
    pub current_load: i32,
    pub cpu_percent: Option<f64>,
    pub memory_usage_mb: Option<f64>,
    pub disk_usage_mb: Option<f64>,
    pub ip_address: Option<String>,
}

impl From<HeartbeatRequest> for HeartbeatUpdate {
    fn from(req: HeartbeatRequest) -> Self {
        HeartbeatUpdate {
            status: req.status,
            current_load: req.current_load,
            cpu_percent: req.cpu_percent,
            memory_usage_mb: req.memory_usage_mb,
            disk_usage_mb: req.disk_usage_mb,
            ip_address: req.ip_address,
        }
    }
}

pub async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<HeartbeatRequest>,
) -> Result<Json<Worker>, ApiError> {
    let worker = state.workers.heartbeat(id, body.into()).await?.ok_or_else(|| ApiError::NotFound(format!("worker {}", id)))?;
    Ok(Json(worker))
}

/// §4.G: a claim outcome is never an HTTP error except for a missing worker
/// (404) — `WorkerNotActive`/`WorkerAtCapacity`/`NoPendingSessions` and the
/// empty-pool case all come back as `200 {"claimed": false, "reason": ...}`.
pub async fn claim_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = claim::claim_session(&state.db, id).await;

    let body = match outcome {
        Ok(Some(session)) => {
            let ctx = AuditContext { session_id: Some(session.id), worker_id: Some(id), work_pool_id: session.work_pool_id, ..Default::default() };
            if let Err(e) = audit::log(&state.db, "api", EventType::SessionClaimed, None, ctx).await {
                tracing::warn!("failed to write audit log for session {}: {}", session.id, e);
            }
            serde_json::json!({ "claimed": true, "session": session })
        }
        Ok(None) => serde_json::json!({ "claimed": false, "reason": "no pending sessions" }),
        Err(ClaimError::WorkerNotActive) => serde_json::json!({ "claimed": false, "reason": "worker not active" }),
        Err(ClaimError::WorkerAtCapacity) => serde_json::json!({ "claimed": false, "reason": "worker at capacity" }),
        Err(ClaimError::NoPendingSessions) => serde_json::json!({ "claimed": false, "reason": "no pending sessions" }),
        Err(ClaimError::Store(e)) => return Err(e.into()),
    };

    Ok(Json(body))
}

#[derive(Debug, Deserialize, Default)]
pub struct MetricsQuery {
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default = "default_interval")]
    pub interval: String,
}

fn default_interval() -> String {
    "1h".to_string()
}

pub async fn worker_metrics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<MetricsQuery>,
) -> Result<Json<Vec<MetricsBucket>>, ApiError> {
    state.workers.get(id).await?.ok_or_else(|| ApiError::NotFound(format!("worker {}", id)))?;
    let interval: Interval = q.interval.parse().map_err(ApiError::Validation)?;
    let buckets = metrics_aggregate::aggregate(&state.db, Scope::Worker(id), interval, q.since).await?;
    Ok(Json(buckets))
}

#[derive(Debug, Deserialize, Default)]
pub struct WorkPoolMetricsQuery {
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default)]
    pub include_worker_breakdown: bool,
}

#[derive(Debug, Serialize)]
pub struct WorkPoolMetricsResponse {
    pub pool: Vec<MetricsBucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_worker: Option<Vec<(Uuid, Vec<MetricsBucket>)>>,
}

pub async fn work_pool_metrics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<WorkPoolMetricsQuery>,
) -> Result<Json<WorkPoolMetricsResponse>, ApiError> {
    use crate::db;

    db::work_pools::get(&state.db, id).await?.ok_or_else(|| ApiError::NotFound(format!("work pool {}", id)))?;
    let interval: Interval = q.interval.parse().map_err(ApiError::Validation)?;
    let pool_buckets = metrics_aggregate::aggregate(&state.db, Scope::Pool(id), interval, q.since).await?;

    let per_worker = if q.include_worker_breakdown {
        let workers = state.workers.list(WorkerFilter { work_pool_id: Some(id), status: None }).await?;
        let mut breakdown = Vec::with_capacity(workers.len());
        for worker in workers {
            let buckets = metrics_aggregate::aggregate(&state.db, Scope::Worker(worker.id), interval, q.since).await?;
            breakdown.push((worker.id, buckets));
        }
        Some(breakdown)
    } else {
        None
    };

    Ok(Json(WorkPoolMetricsResponse { pool: pool_buckets, per_worker }))
}
