// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! Shared application state threaded through every handler, constructed once
//! at startup — the explicit `App` value §9's Design Notes calls for in place
//! of a global registry/singleton.

use std::sync::Arc;

use crate::config::Config;
use crate::db::DbPool;
use crate::provider::ProviderRegistry;
use crate::registry::WorkerRegistry;

use super::middleware::IpRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub providers: Arc<ProviderRegistry>,
    pub workers: Arc<WorkerRegistry>,
    pub limiter: Arc<IpRateLimiter>,
}
