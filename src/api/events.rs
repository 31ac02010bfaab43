// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §6 `/api/v1/events` — append session lifecycle events and apply the §4.B
//! status transition through `db::events::apply_session_event`.

use chrono::{DateTime, Utc};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;
use crate::db;
use crate::domain::{SessionEvent, SessionEventType};

#[derive(Debug, Deserialize)]
pub struct SessionEventCreate {
    pub session_id: Uuid,
    pub event: SessionEventType,
    pub data: Option<JsonValue>,
}

/// §6 POST /api/v1/events/ — 201 even when the event doesn't advance status
/// (S3: a late, rank-regressing event is still recorded, just a no-op on
/// `sessions.status`).
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<SessionEventCreate>,
) -> Result<(StatusCode, Json<SessionEvent>), ApiError> {
    let (event, _status) = db::events::apply_session_event(&state.db, body.session_id, body.event, body.data).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Debug, Deserialize, Default)]
pub struct EventListQuery {
    pub session_id: Option<Uuid>,
    pub event_type: Option<SessionEventType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub offset: i64,
    pub limit: Option<i64>,
}

pub async fn list(State(state): State<AppState>, Query(q): Query<EventListQuery>) -> Result<Json<Vec<SessionEvent>>, ApiError> {
    let filter = db::events::EventFilter { session_id: q.session_id, event_type: q.event_type, since: q.since, until: q.until };
    let events = db::events::list_filtered(&state.db, filter, q.offset, q.limit.unwrap_or(100)).await?;
    Ok(Json(events))
}
