// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! `GET /health` — unauthenticated and unprefixed (§9 canonical routing
//! decision), generalizing the teacher's `health_check` handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub server_id: String,
    pub version: &'static str,
    pub database: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_ok = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();

    Json(HealthResponse {
        status: if db_ok { "healthy" } else { "degraded" },
        server_id: state.config.server.server_id.clone(),
        version: crate::VERSION,
        database: if db_ok { "connected" } else { "unavailable" },
    })
}
