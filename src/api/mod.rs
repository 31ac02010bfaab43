// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §6 HTTP API surface — axum handlers grouped by resource, generalizing the
//! teacher's single `noxterm.rs` handler set into one module per §3 entity.

pub mod error;
pub mod events;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod sessions;
pub mod state;
pub mod work_pools;
pub mod workers;

pub use routes::build_router;
pub use state::AppState;
