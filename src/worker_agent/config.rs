// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! Worker-agent-specific configuration. Loaded on top of the shared
//! [`crate::config::Config`] so the agent's Docker/poll/metrics knobs stay
//! identical to the ones `fleet-server` documents, plus the handful of
//! settings that only make sense for a process that calls the server's API
//! rather than embedding it (`server_url`, `work_pool_id`, persisted identity).

use std::path::PathBuf;

use uuid::Uuid;

use crate::config::{Config, ConfigError, DockerConfig};
use crate::domain::ProviderType;

#[derive(Debug, Clone)]
pub struct WorkerAgentConfig {
    pub server_url: String,
    pub api_key: Option<String>,
    pub worker_name: String,
    pub work_pool_id: Uuid,
    pub capacity: i32,
    pub provider_type: ProviderType,
    pub poll_interval_secs: u64,
    pub metrics_interval_secs: u64,
    pub state_file: PathBuf,
    pub docker: DockerConfig,
}

impl WorkerAgentConfig {
    /// Reads the shared [`Config`] for ambient settings (docker, poll/metrics
    /// defaults) plus the agent-only `FLEET_WORKER_*` variables below.
    pub fn from_env() -> Result<Self, ConfigError> {
        let shared = Config::from_env()?;

        let work_pool_id = std::env::var("FLEET_WORKER_POOL_ID")
            .map_err(|_| ConfigError::MissingRequired { key: "FLEET_WORKER_POOL_ID".to_string() })?
            .parse::<Uuid>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "FLEET_WORKER_POOL_ID".to_string(),
                value: "<redacted>".to_string(),
                reason: e.to_string(),
            })?;

        let worker_name = std::env::var("FLEET_WORKER_NAME").unwrap_or_else(|_| format!("worker-{}", Uuid::new_v4()));

        let provider_type = std::env::var("FLEET_WORKER_PROVIDER_TYPE")
            .ok()
            .map(|s| s.parse::<ProviderType>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "FLEET_WORKER_PROVIDER_TYPE".to_string(),
                value: "".to_string(),
                reason: e,
            })?
            .unwrap_or_default();

        Ok(Self {
            server_url: std::env::var("FLEET_SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string()),
            api_key: std::env::var("FLEET_WORKER_API_KEY").ok().or_else(|| shared.server.api_key.clone()),
            worker_name,
            work_pool_id,
            capacity: crate::config::env_parse("FLEET_WORKER_CAPACITY", shared.worker.default_capacity)?,
            provider_type,
            poll_interval_secs: shared.worker.poll_interval_secs,
            metrics_interval_secs: shared.worker.metrics_interval_secs,
            state_file: std::env::var("FLEET_WORKER_STATE_FILE")
                .unwrap_or_else(|_| "./fleet-worker.state".to_string())
                .into(),
            docker: shared.docker,
        })
    }
}
