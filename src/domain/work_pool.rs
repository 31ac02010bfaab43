// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

use super::enums::{Browser, BrowserVersion, OperatingSystem, ProviderType, WorkPoolStatus};
use super::screen::Screen;
use super::session::{Proxy, ResourceLimits};

/// A named, provider-typed placement domain with shared defaults (§3 WorkPool).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkPool {
    pub id: Uuid,
    pub name: String,
    pub provider_type: ProviderType,
    pub status: WorkPoolStatus,

    pub default_browser: Option<Browser>,
    pub default_version: Option<BrowserVersion>,
    pub default_headless: Option<bool>,
    pub default_operating_system: Option<OperatingSystem>,
    pub default_screen: Option<Screen>,
    pub default_proxy: Option<Proxy>,
    pub default_resource_limits: Option<ResourceLimits>,
    pub default_environment: Option<HashMap<String, String>>,

    pub min_workers: i32,
    pub max_workers: i32,
    pub max_sessions_per_worker: i32,

    pub provider_config: JsonValue,
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
