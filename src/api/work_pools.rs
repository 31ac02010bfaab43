// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §6 `/api/v1/workerpools/pools` — WorkPool CRUD (§4.D), generalizing the
//! teacher's single-provider pool concept into the provider-agnostic store.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;
use crate::db;
use crate::db::audit::{self, AuditContext, EventType};
use crate::domain::{Browser, BrowserVersion, OperatingSystem, Proxy, ProviderType, ResourceLimits, Screen, WorkPool, WorkPoolStatus};

#[derive(Debug, Deserialize)]
pub struct WorkPoolCreateRequest {
    pub name: String,
    #[serde(default)]
    pub provider_type: ProviderType,
    pub default_browser: Option<Browser>,
    pub default_version: Option<BrowserVersion>,
    pub default_headless: Option<bool>,
    pub default_operating_system: Option<OperatingSystem>,
    pub default_screen: Option<Screen>,
    pub default_proxy: Option<Proxy>,
    pub default_resource_limits: Option<ResourceLimits>,
    #[serde(default)]
    pub default_environment: Option<HashMap<String, String>>,
    #[serde(default)]
    pub min_workers: i32,
    #[serde(default = "default_max_workers")]
    pub max_workers: i32,
    #[serde(default = "default_max_sessions_per_worker")]
    pub max_sessions_per_worker: i32,
    #[serde(default)]
    pub provider_config: JsonValue,
    pub description: Option<String>,
}

fn default_max_workers() -> i32 {
    10
}

fn default_max_sessions_per_worker() -> i32 {
    1
}

impl From<WorkPoolCreateRequest> for db::work_pools::WorkPoolCreate {
    fn from(req: WorkPoolCreateRequest) -> Self {
        db::work_pools::WorkPoolCreate {
            name: req.name,
            provider_type: req.provider_type,
            default_browser: req.default_browser,
            default_version: req.default_version,
            default_headless: req.default_headless,
            default_operating_system: req.default_operating_system,
            default_screen: req.default_screen,
            default_proxy: req.default_proxy,
            default_resource_limits: req.default_resource_limits,
            default_environment: req.default_environment,
            min_workers: req.min_workers,
            max_workers: req.max_workers,
            max_sessions_per_worker: req.max_sessions_per_worker,
            provider_config: req.provider_config,
            description: req.description,
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<WorkPoolCreateRequest>,
) -> Result<(StatusCode, Json<WorkPool>), ApiError> {
    let spec: db::work_pools::WorkPoolCreate = body.into();
    let pool = db::work_pools::create(&state.db, spec).await?;

    let ctx = AuditContext { work_pool_id: Some(pool.id), ..Default::default() };
    if let Err(e) = audit::log(&state.db, "api", EventType::WorkPoolCreated, None, ctx).await {
        tracing::warn!("failed to write audit log for work pool {}: {}", pool.id, e);
    }

    Ok((StatusCode::CREATED, Json(pool)))
}

#[derive(Debug, Deserialize, Default)]
pub struct WorkPoolListQuery {
    #[serde(default)]
    pub status: Option<WorkPoolStatus>,
}

pub async fn list(State(state): State<AppState>, Query(q): Query<WorkPoolListQuery>) -> Result<Json<Vec<WorkPool>>, ApiError> {
    let pools = db::work_pools::list(&state.db).await?;
    let pools = match q.status {
        Some(status) => pools.into_iter().filter(|p| p.status == status).collect(),
        None => pools,
    };
    Ok(Json(pools))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<WorkPool>, ApiError> {
    let pool = db::work_pools::get(&state.db, id).await?.ok_or_else(|| ApiError::NotFound(format!("work pool {}", id)))?;
    Ok(Json(pool))
}

/// §6 `PUT /workerpools/pools/{id}` — full-representation replace; `status`
/// is administratively settable here (ACTIVE/PAUSED/MAINTENANCE/ERROR, §3).
#[derive(Debug, Deserialize)]
pub struct WorkPoolUpdateRequest {
    pub name: String,
    #[serde(default)]
    pub provider_type: ProviderType,
    pub status: WorkPoolStatus,
    pub default_browser: Option<Browser>,
    pub default_version: Option<BrowserVersion>,
    pub default_headless: Option<bool>,
    pub default_operating_system: Option<OperatingSystem>,
    pub default_screen: Option<Screen>,
    pub default_proxy: Option<Proxy>,
    pub default_resource_limits: Option<ResourceLimits>,
    #[serde(default)]
    pub default_environment: Option<HashMap<String, String>>,
    #[serde(default)]
    pub min_workers: i32,
    #[serde(default = "default_max_workers")]
    pub max_workers: i32,
    #[serde(default = "default_max_sessions_per_worker")]
    pub max_sessions_per_worker: i32,
    #[serde(default)]
    pub provider_config: JsonValue,
    pub description: Option<String>,
}

impl From<WorkPoolUpdateRequest> for db::work_pools::WorkPoolUpdate {
    fn from(req: WorkPoolUpdateRequest) -> Self {
        db::work_pools::WorkPoolUpdate {
            name: req.name,
            provider_type: req.provider_type,
            status: req.status,
            default_browser: req.default_browser,
            default_version: req.default_version,
            default_headless: req.default_headless,
            default_operating_system: req.default_operating_system,
            default_screen: req.default_screen,
            default_proxy: req.default_proxy,
            default_resource_limits: req.default_resource_limits,
            default_environment: req.default_environment,
            min_workers: req.min_workers,
            max_workers: req.max_workers,
            max_sessions_per_worker: req.max_sessions_per_worker,
            provider_config: req.provider_config,
            description: req.description,
        }
    }
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<WorkPoolUpdateRequest>,
) -> Result<Json<WorkPool>, ApiError> {
    let spec: db::work_pools::WorkPoolUpdate = body.into();
    let pool = db::work_pools::update(&state.db, id, spec)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("work pool {}", id)))?;
    Ok(Json(pool))
}

#[derive(Debug, Deserialize, Default)]
pub struct DeleteQuery {
    #[serde(default)]
    pub force: bool,
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<DeleteQuery>,
) -> Result<StatusCode, ApiError> {
    let deleted = db::work_pools::delete(&state.db, id, q.force).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("work pool {}", id)));
    }

    let ctx = AuditContext { work_pool_id: Some(id), ..Default::default() };
    if let Err(e) = audit::log(&state.db, "api", EventType::WorkPoolDeleted, None, ctx).await {
        tracing::warn!("failed to write audit log for work pool {}: {}", id, e);
    }

    Ok(StatusCode::NO_CONTENT)
}
