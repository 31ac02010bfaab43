// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §6 `/api/v1/metrics` — session metrics ingestion and the §4.I aggregator's
//! per-session read path (raw series without `interval`, bucketed rollup with it).

use chrono::{DateTime, Utc};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;
use crate::db;
use crate::domain::SessionMetrics;
use crate::metrics_aggregate::{self, Interval};

#[derive(Debug, Deserialize)]
pub struct SessionMetricsCreate {
    pub session_id: Uuid,
    pub cpu_percent: Option<f64>,
    pub memory_mb: Option<f64>,
    pub network_rx_bytes: Option<i64>,
    pub network_tx_bytes: Option<i64>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<SessionMetricsCreate>,
) -> Result<(StatusCode, Json<SessionMetrics>), ApiError> {
    let sample = db::metrics::MetricsSample {
        cpu_percent: body.cpu_percent,
        memory_mb: body.memory_mb,
        network_rx_bytes: body.network_rx_bytes,
        network_tx_bytes: body.network_tx_bytes,
    };
    let recorded = db::metrics::record(&state.db, body.session_id, sample).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

#[derive(Debug, Deserialize, Default)]
pub struct SessionMetricsQuery {
    pub since: Option<DateTime<Utc>>,
    pub interval: Option<String>,
    pub limit: Option<i64>,
}

/// §4.I: without `interval`, raw rows ordered by timestamp ascending;
/// with it, time-bucketed rollups scoped to this one session's worker
/// (there is no narrower scope than "this session" in the aggregator, so
/// the session's own metrics rows are aggregated directly rather than routed
/// through the worker/pool `Scope` — see `workers::worker_metrics` for that).
pub async fn session_metrics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<SessionMetricsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match q.interval {
        None => {
            let rows = db::metrics::list(&state.db, id, q.since, q.limit.unwrap_or(1000)).await?;
            Ok(Json(serde_json::to_value(rows).unwrap()))
        }
        Some(raw_interval) => {
            let interval: Interval = raw_interval.parse().map_err(ApiError::Validation)?;
            // A session-scoped rollup degenerates the aggregator's
            // worker/pool dimension by filtering session_metrics through
            // its own session id instead (no such `Scope` variant exists,
            // so this goes through the dedicated session-scoped query).
            let buckets = metrics_aggregate::aggregate_session(&state.db, id, interval, q.since).await?;
            Ok(Json(serde_json::to_value(buckets).unwrap()))
        }
    }
}

// Re-exported for `api::workers`'s worker/pool-scoped endpoints.
pub use metrics_aggregate::Scope as MetricsScope;
