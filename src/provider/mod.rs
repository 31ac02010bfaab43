// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §4.A Provider Abstraction — the capability trait every execution backend
//! implements, plus a small static registry keyed by `ProviderType`. Only
//! `docker` has a real backend (grounded in the teacher's bollard usage);
//! the cloud variants are stubs returning `ProviderError::Unsupported`, kept
//! so the `ProviderType` enum and API surface are already complete for when
//! a real backend is wired in.

mod aws_ecs;
mod azure_container_instance;
pub mod docker;
mod gcp_cloud_run;
mod kubernetes;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ProviderType, Session};
use crate::errors::ProviderError;

/// Result of a successful launch (§4.A `LaunchContainer`).
#[derive(Debug, Clone)]
pub struct LaunchResult {
    pub container_id: String,
    pub ws_endpoint: String,
    pub live_url: String,
    pub ip_address: Option<String>,
}

/// Result of a status probe (§4.A `GetContainerStatus`).
#[derive(Debug, Clone)]
pub struct ContainerStatus {
    pub running: bool,
    pub cpu_percent: Option<f64>,
    pub memory_mb: Option<f64>,
    pub network_rx_bytes: Option<i64>,
    pub network_tx_bytes: Option<i64>,
}

/// Result of `GetWorkerStats` — host-level, not container-level.
#[derive(Debug, Clone)]
pub struct WorkerStats {
    pub running_containers: i64,
    pub cpu_percent: Option<f64>,
    pub memory_mb: Option<f64>,
    pub disk_mb: Option<f64>,
    pub network_rx_bytes: Option<i64>,
    pub network_tx_bytes: Option<i64>,
    pub last_updated: DateTime<Utc>,
}

/// Image resolution (§4.A): `registry?/image_prefix/<browser>:<version>`.
pub fn resolve_image(registry: Option<&str>, image_prefix: &str, session: &Session) -> String {
    let repo = format!("{}/{}", image_prefix.trim_end_matches('/'), session.browser);
    let tagged = format!("{}:{}", repo, session.version);
    match registry {
        Some(r) if !r.is_empty() => format!("{}/{}", r.trim_end_matches('/'), tagged),
        _ => tagged,
    }
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Initialize the backend client; implementations set worker-local status
    /// to ONLINE on success (caller's responsibility to persist that).
    async fn start(&self) -> Result<(), ProviderError>;

    /// Release backend resources.
    async fn stop(&self) -> Result<(), ProviderError>;

    async fn launch_container(&self, session: &Session) -> Result<LaunchResult, ProviderError>;

    async fn terminate_container(&self, container_id: &str) -> Result<(), ProviderError>;

    async fn get_container_status(&self, container_id: &str) -> Result<ContainerStatus, ProviderError>;

    async fn get_container_logs(&self, container_id: &str, lines: i64) -> Result<String, ProviderError>;

    async fn get_worker_stats(&self) -> Result<WorkerStats, ProviderError>;

    async fn health_check(&self) -> bool;
}

/// Maps a `ProviderType` to its `Provider` implementation. Holds no state of
/// its own beyond the Docker client handle; cloud variants are zero-sized
/// stubs until a real backend lands.
pub struct ProviderRegistry {
    docker: docker::DockerProvider,
    azure: azure_container_instance::AzureContainerInstanceProvider,
    aws: aws_ecs::AwsEcsProvider,
    gcp: gcp_cloud_run::GcpCloudRunProvider,
    kubernetes: kubernetes::KubernetesProvider,
}

impl ProviderRegistry {
    pub fn new(docker: docker::DockerProvider) -> Self {
        Self {
            docker,
            azure: azure_container_instance::AzureContainerInstanceProvider,
            aws: aws_ecs::AwsEcsProvider,
            gcp: gcp_cloud_run::GcpCloudRunProvider,
            kubernetes: kubernetes::KubernetesProvider,
        }
    }

    pub fn get(&self, kind: ProviderType) -> &dyn Provider {
        match kind {
            ProviderType::Docker => &self.docker,
            ProviderType::AzureContainerInstance => &self.azure,
            ProviderType::AwsEcs => &self.aws,
            ProviderType::GcpCloudRun => &self.gcp,
            ProviderType::Kubernetes => &self.kubernetes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Browser, BrowserVersion, OperatingSystem, Screen};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn sample_session(browser: Browser, version: BrowserVersion) -> Session {
        Session {
            id: Uuid::nil(),
            browser,
            version,
            operating_system: OperatingSystem::Linux,
            headless: true,
            screen: Screen::default(),
            proxy: None,
            resource_limits: None,
            environment: HashMap::new(),
            status: crate::domain::SessionStatus::Pending,
            work_pool_id: None,
            worker_id: None,
            container_id: None,
            ws_endpoint: None,
            live_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            expires_at: None,
        }
    }

    #[test]
    fn resolve_image_without_registry() {
        let session = sample_session(Browser::Chrome, BrowserVersion::Latest);
        assert_eq!(resolve_image(None, "fleet", &session), "fleet/chrome:latest");
    }

    #[test]
    fn resolve_image_with_registry() {
        let session = sample_session(Browser::Firefox, BrowserVersion::Stable);
        assert_eq!(
            resolve_image(Some("registry.example.com"), "fleet/", &session),
            "registry.example.com/fleet/firefox:stable"
        );
    }
}
