// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §6 `/api/v1/sessions` — Session CRUD plus `refresh`, backed by
//! `db::sessions` (§4.C) and `scheduler::place` (§4.F), generalizing the
//! teacher's `create_session`/`get_session`/`list_sessions` handler trio.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;
use crate::db;
use crate::db::audit::{self, AuditContext, EventType};
use crate::domain::{Browser, BrowserVersion, OperatingSystem, Proxy, ResourceLimits, Screen, Session, SessionEvent, SessionMetrics, SessionStatus};
use crate::scheduler;

#[derive(Debug, Deserialize, Default)]
pub struct SessionCreateRequest {
    pub browser: Option<Browser>,
    pub version: Option<BrowserVersion>,
    pub operating_system: Option<OperatingSystem>,
    pub headless: Option<bool>,
    pub screen: Option<Screen>,
    pub proxy: Option<Proxy>,
    pub resource_limits: Option<ResourceLimits>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    /// Explicit placement request (§4.F `Place(session, requested_pool_id?)`).
    pub work_pool_id: Option<Uuid>,
}

impl From<SessionCreateRequest> for db::sessions::SessionCreate {
    fn from(req: SessionCreateRequest) -> Self {
        db::sessions::SessionCreate {
            browser: req.browser,
            version: req.version,
            operating_system: req.operating_system,
            headless: req.headless,
            screen: req.screen,
            proxy: req.proxy,
            resource_limits: req.resource_limits,
            environment: req.environment,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionDetails {
    #[serde(flatten)]
    pub session: Session,
    pub placed: bool,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<SessionCreateRequest>,
) -> Result<(StatusCode, Json<SessionDetails>), ApiError> {
    let requested_pool_id = body.work_pool_id;
    let spec: db::sessions::SessionCreate = body.into();
    let session = db::sessions::create(&state.db, spec).await?;

    // §6 data flow: client -> SessionStore (create) -> Scheduler.Place.
    // A pool-less placement attempt is not an error (S.-unplaced sessions
    // stay PENDING for a later attempt); only a malformed request or an
    // explicitly requested inactive/missing pool surfaces as an error.
    let placed = match scheduler::place(&state.db, session.id, requested_pool_id).await {
        Ok(placed) => placed,
        Err(e) if requested_pool_id.is_some() => return Err(e.into()),
        Err(_) => false,
    };

    let session = db::sessions::get(&state.db, session.id)
        .await?
        .ok_or_else(|| ApiError::Internal("session vanished immediately after creation".into()))?;

    let ctx = AuditContext { session_id: Some(session.id), work_pool_id: session.work_pool_id, ..Default::default() };
    if let Err(e) = audit::log(&state.db, "api", EventType::SessionCreated, None, ctx).await {
        tracing::warn!("failed to write audit log for session {}: {}", session.id, e);
    }

    Ok((StatusCode::CREATED, Json(SessionDetails { session, placed })))
}

#[derive(Debug, Deserialize, Default)]
pub struct SessionListQuery {
    pub status: Option<SessionStatus>,
    pub work_pool_id: Option<Uuid>,
    pub worker_id: Option<Uuid>,
    #[serde(default)]
    pub offset: i64,
    pub limit: Option<i64>,
}

pub async fn list(State(state): State<AppState>, Query(q): Query<SessionListQuery>) -> Result<Json<Vec<Session>>, ApiError> {
    let filter = db::sessions::SessionFilter { status: q.status, work_pool_id: q.work_pool_id, worker_id: q.worker_id };
    let sessions = db::sessions::list(&state.db, filter, q.offset, q.limit.unwrap_or(100)).await?;
    Ok(Json(sessions))
}

#[derive(Debug, Deserialize, Default)]
pub struct SessionGetQuery {
    #[serde(default)]
    pub include_events: bool,
    #[serde(default)]
    pub include_metrics: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionWithRelations {
    #[serde(flatten)]
    pub session: Session,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<SessionEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<SessionMetrics>>,
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<SessionGetQuery>,
) -> Result<Json<SessionWithRelations>, ApiError> {
    let session = db::sessions::get(&state.db, id).await?.ok_or_else(|| ApiError::NotFound(format!("session {}", id)))?;

    let events = if q.include_events { Some(db::events::list(&state.db, id).await?) } else { None };
    let metrics = if q.include_metrics { Some(db::metrics::list(&state.db, id, None, 1000).await?) } else { None };

    Ok(Json(SessionWithRelations { session, events, metrics }))
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
    let deleted = db::sessions::delete(&state.db, id, q.force).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("session {}", id)));
    }

    let ctx = AuditContext { session_id: Some(id), ..Default::default() };
    if let Err(e) = audit::log(&state.db, "api", EventType::SessionTerminated, None, ctx).await {
        tracing::warn!("failed to write audit log for session {}: {}", id, e);
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn refresh(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Session>, ApiError> {
    let session = db::sessions::refresh(&state.db, id).await?.ok_or_else(|| ApiError::NotFound(format!("session {}", id)))?;
    Ok(Json(session))
}
