// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §6 route table and middleware chain. `/health` is the sole unauthenticated,
//! unprefixed route; everything else lives under `/api/v1` (§9 canonical
//! prefix decision). CORS/tracing/compression are plain `tower-http` layers,
//! the same stack the teacher builds its `Router` with in `noxterm.rs::main`;
//! auth and rate limiting are request-local `axum::middleware::from_fn`
//! functions (see `api::middleware`).

use std::time::Duration;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::middleware::{rate_limit, require_api_key};
use super::state::AppState;
use super::{events, health, metrics, sessions, work_pools, workers};

pub fn build_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/sessions", post(sessions::create).get(sessions::list))
        .route("/sessions/:id", get(sessions::get).delete(sessions::delete))
        .route("/sessions/:id/refresh", post(sessions::refresh))
        .route("/events", post(events::create).get(events::list))
        .route("/metrics", post(metrics::create))
        .route("/metrics/session/:id", get(metrics::session_metrics))
        .route("/workerpools/pools", post(work_pools::create).get(work_pools::list))
        .route(
            "/workerpools/pools/:id",
            get(work_pools::get).put(work_pools::update).delete(work_pools::delete),
        )
        .route("/workerpools/workers", post(workers::register).get(workers::list))
        .route("/workerpools/workers/:id", get(workers::get).delete(workers::delete))
        .route("/workerpools/workers/:id/heartbeat", put(workers::heartbeat))
        .route("/workerpools/workers/:id/claim-session", post(workers::claim_session))
        .route("/workerpools/metrics/workers/:id", get(workers::worker_metrics))
        .route("/workerpools/metrics/workpool/:id", get(workers::work_pool_metrics))
        .route_layer(from_fn_with_state(state.clone(), rate_limit))
        .route_layer(from_fn_with_state(state.clone(), require_api_key));

    let cors = if state.config.cors.allow_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(
                state.config.cors.allow_origins.iter().filter_map(|o| o.parse().ok()),
            ))
            .allow_credentials(state.config.cors.allow_credentials)
    };

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", v1)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(state.config.server.request_timeout_secs)))
        .layer(ConcurrencyLimitLayer::new(1024));

    if state.config.compression.enabled {
        router = router.layer(CompressionLayer::new());
    }

    router.with_state(state)
}
