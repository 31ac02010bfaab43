// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §7 Error Handling Design — a single `ApiError` translating every internal
//! error kind into the matching HTTP status + JSON body, generalizing the
//! teacher's ad hoc `(StatusCode, Json<serde_json::Value>)` handler returns
//! into one `IntoResponse` impl every handler in `api::*` can `?` into.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::errors::{ClaimError, ProviderError, SchedulerError, StoreError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Conflict(String),
    Validation(String),
    Unauthorized,
    RateLimited,
    Provider(String),
    Internal(String),
}

impl ApiError {
    fn status_and_body(&self) -> (StatusCode, serde_json::Value) {
        match self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, json!({ "error": "not_found", "details": what })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": "conflict", "details": msg })),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": "validation", "details": msg })),
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, json!({ "error": "unauthorized", "details": "missing or invalid X-API-Key" }))
            }
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "rate_limited", "details": "too many requests", "retry_after": 60 }),
            ),
            ApiError::Provider(msg) => (StatusCode::BAD_GATEWAY, json!({ "error": "provider_error", "details": msg })),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "internal", "details": msg })),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Validation(msg) => ApiError::Validation(msg),
            StoreError::NotAvailable => ApiError::Internal("database not available".into()),
            StoreError::ConnectionFailed(msg) | StoreError::QueryFailed(msg) | StoreError::MigrationFailed(msg) => {
                ApiError::Internal(msg)
            }
        }
    }
}

impl From<ClaimError> for ApiError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::Store(e) => e.into(),
            // WorkerNotActive/WorkerAtCapacity/NoPendingSessions are ordinary
            // claim outcomes (§4.G), handled explicitly in `api::workers` —
            // reaching here means a caller used `?` somewhere that shouldn't.
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Store(e) => e.into(),
            SchedulerError::PoolNotFound(id) => ApiError::NotFound(format!("work pool {}", id)),
            SchedulerError::NoAvailableWorkers => ApiError::Conflict("no available workers for placement".into()),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        ApiError::Provider(err.to_string())
    }
}
