// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! Docker backend (§4.A), grounded in the teacher's `noxterm::start_container`
//! (image pull, `Config`/`HostConfig`/`CreateContainerOptions`, start) and
//! `lifecycle::check_container_health`/`stop_container` (stats, stop+remove).
//! Fleet containers run the browser image's own entrypoint instead of a PTY
//! shell, so there is no exec/attach surface here.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogsOptions, RemoveContainerOptions, StartContainerOptions, StatsOptions,
    StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use chrono::Utc;
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use super::{resolve_image, ContainerStatus, LaunchResult, Provider, WorkerStats};
use crate::config::DockerConfig;
use crate::domain::Session;
use crate::errors::ProviderError;

pub struct DockerProvider {
    docker: Docker,
    config: DockerConfig,
}

impl DockerProvider {
    pub fn connect(config: DockerConfig) -> Result<Self, ProviderError> {
        let docker = match &config.socket_path {
            Some(path) => Docker::connect_with_unix(path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| ProviderError::ConnectionFailed(e.to_string()))?,
            None => Docker::connect_with_local_defaults().map_err(|e| ProviderError::ConnectionFailed(e.to_string()))?,
        };
        Ok(Self { docker, config })
    }

    fn container_name(session_id: uuid::Uuid) -> String {
        format!("fleet-session-{}", session_id.simple())
    }

    async fn ensure_image(&self, image: &str) -> Result<(), ProviderError> {
        let images = self
            .docker
            .list_images::<String>(None)
            .await
            .map_err(ProviderError::from)?;
        let exists = images
            .iter()
            .any(|img| img.repo_tags.iter().any(|tag| tag == image));
        if exists {
            return Ok(());
        }

        info!("image {} not found locally, pulling", image);
        let options = CreateImageOptions { from_image: image, ..Default::default() };
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| ProviderError::ImagePullFailed(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Provider for DockerProvider {
    async fn start(&self) -> Result<(), ProviderError> {
        self.docker.ping().await.map_err(ProviderError::from)?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// §4.A LaunchContainer — launches must pass `BROWSERLESS_SESSION_ID` and
    /// `BROWSERLESS_HEADLESS`, merged over session-provided env (session wins).
    async fn launch_container(&self, session: &Session) -> Result<LaunchResult, ProviderError> {
        let image = resolve_image(self.config.registry.as_deref(), &self.config.image_prefix, session);
        self.ensure_image(&image).await?;

        let mut env_vars = vec![
            format!("BROWSERLESS_SESSION_ID={}", session.id),
            format!("BROWSERLESS_HEADLESS={}", session.headless),
        ];
        for (k, v) in &session.environment {
            env_vars.retain(|existing| !existing.starts_with(&format!("{}=", k)));
            env_vars.push(format!("{}={}", k, v));
        }

        let memory_bytes = session
            .resource_limits
            .as_ref()
            .and_then(|r| r.memory.as_ref())
            .and_then(|m| parse_memory_literal(m));
        let cpu_quota = session
            .resource_limits
            .as_ref()
            .and_then(|r| r.cpu)
            .map(|cpus| (cpus * 100_000.0) as i64);

        let container_name = Self::container_name(session.id);
        let config = Config {
            image: Some(image.clone()),
            env: Some(env_vars),
            host_config: Some(HostConfig {
                memory: memory_bytes,
                memory_swap: memory_bytes,
                cpu_quota,
                cpu_period: cpu_quota.map(|_| 100_000),
                auto_remove: Some(true),
                privileged: Some(false),
                readonly_rootfs: Some(false),
                network_mode: Some(self.config.network.clone()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let options = CreateContainerOptions { name: container_name.clone(), platform: None };
        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| ProviderError::ContainerCreateFailed(e.to_string()))?;
        let container_id = response.id;

        self.docker
            .start_container(&container_id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| ProviderError::ContainerStartFailed(e.to_string()))?;

        let inspected = self
            .docker
            .inspect_container(&container_id, None::<bollard::container::InspectContainerOptions>)
            .await
            .map_err(ProviderError::from)?;
        let ip_address = inspected
            .network_settings
            .as_ref()
            .and_then(|ns| ns.ip_address.clone())
            .filter(|ip| !ip.is_empty());

        // Fleet's browser images expose a devtools websocket on a fixed port;
        // the live/debug URL and ws endpoint are derived from the container's
        // own network identity rather than a host-mapped port (bridge network).
        let ws_endpoint = format!("ws://{}:9222", container_name);
        let live_url = format!("http://{}:9223", container_name);

        Ok(LaunchResult { container_id, ws_endpoint, live_url, ip_address })
    }

    /// §4.A TerminateContainer: graceful stop, fall back to kill, then remove.
    async fn terminate_container(&self, container_id: &str) -> Result<(), ProviderError> {
        let stop_result = self
            .docker
            .stop_container(container_id, Some(StopContainerOptions { t: self.config.stop_timeout_secs as i64 }))
            .await;

        match stop_result {
            Ok(_) => debug!("container {} stopped gracefully", container_id),
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => {
                debug!("container {} already removed", container_id);
                return Ok(());
            }
            Err(e) => {
                warn!("graceful stop failed for {}, forcing: {}", container_id, e);
                let _ = self.docker.kill_container::<String>(container_id, None).await;
            }
        }

        match self
            .docker
            .remove_container(container_id, Some(RemoveContainerOptions { force: true, ..Default::default() }))
            .await
        {
            Ok(_) | Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => Ok(()),
            Err(e) => Err(ProviderError::ContainerStopFailed(e.to_string())),
        }
    }

    async fn get_container_status(&self, container_id: &str) -> Result<ContainerStatus, ProviderError> {
        let inspected = self
            .docker
            .inspect_container(container_id, None::<bollard::container::InspectContainerOptions>)
            .await
            .map_err(|e| match e {
                bollard::errors::Error::DockerResponseServerError { status_code: 404, .. } => {
                    ProviderError::NotFound(container_id.to_string())
                }
                other => ProviderError::from(other),
            })?;
        let running = inspected.state.and_then(|s| s.running).unwrap_or(false);

        let mut stats_stream = self.docker.stats(container_id, Some(StatsOptions { stream: false, ..Default::default() }));
        let Some(stats_result) = stats_stream.next().await else {
            return Ok(ContainerStatus { running, cpu_percent: None, memory_mb: None, network_rx_bytes: None, network_tx_bytes: None });
        };
        let stats = stats_result.map_err(ProviderError::from)?;

        let cpu_delta = stats
            .cpu_stats
            .cpu_usage
            .total_usage
            .saturating_sub(stats.precpu_stats.cpu_usage.total_usage) as f64;
        let system_delta = stats
            .cpu_stats
            .system_cpu_usage
            .unwrap_or(0)
            .saturating_sub(stats.precpu_stats.system_cpu_usage.unwrap_or(0)) as f64;
        let cpu_percent = if system_delta > 0.0 {
            let num_cpus = stats.cpu_stats.online_cpus.unwrap_or(1) as f64;
            Some((cpu_delta / system_delta) * num_cpus * 100.0)
        } else {
            Some(0.0)
        };

        let memory_mb = stats.memory_stats.usage.map(|u| u as f64 / (1024.0 * 1024.0));

        let (rx, tx) = match &stats.networks {
            Some(networks) => {
                let mut rx = 0i64;
                let mut tx = 0i64;
                for net in networks.values() {
                    rx += net.rx_bytes as i64;
                    tx += net.tx_bytes as i64;
                }
                (Some(rx), Some(tx))
            }
            None => (None, None),
        };

        Ok(ContainerStatus { running, cpu_percent, memory_mb, network_rx_bytes: rx, network_tx_bytes: tx })
    }

    async fn get_container_logs(&self, container_id: &str, lines: i64) -> Result<String, ProviderError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: lines.to_string(),
            ..Default::default()
        };
        let mut stream = self.docker.logs(container_id, Some(options));
        let mut output = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ProviderError::from)?;
            let bytes = match chunk {
                bollard::container::LogOutput::StdOut { message } => message,
                bollard::container::LogOutput::StdErr { message } => message,
                bollard::container::LogOutput::Console { message } => message,
                bollard::container::LogOutput::StdIn { message } => message,
            };
            output.push_str(&String::from_utf8_lossy(&bytes));
        }
        Ok(output)
    }

    async fn get_worker_stats(&self) -> Result<WorkerStats, ProviderError> {
        let containers = self
            .docker
            .list_containers::<String>(None)
            .await
            .map_err(ProviderError::from)?;
        let running_containers = containers
            .iter()
            .filter(|c| c.names.iter().any(|names| names.iter().any(|n| n.contains("fleet-session-"))))
            .count() as i64;

        Ok(WorkerStats {
            running_containers,
            cpu_percent: None,
            memory_mb: None,
            disk_mb: None,
            network_rx_bytes: None,
            network_tx_bytes: None,
            last_updated: Utc::now(),
        })
    }

    async fn health_check(&self) -> bool {
        self.docker.ping().await.is_ok()
    }
}

/// Parses the `^\d+[MG]$` memory literal into bytes for `HostConfig::memory`.
fn parse_memory_literal(literal: &str) -> Option<i64> {
    let (digits, unit) = literal.split_at(literal.len().checked_sub(1)?);
    let value: i64 = digits.parse().ok()?;
    match unit {
        "M" => Some(value * 1024 * 1024),
        "G" => Some(value * 1024 * 1024 * 1024),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_megabyte_literal() {
        assert_eq!(parse_memory_literal("512M"), Some(512 * 1024 * 1024));
    }

    #[test]
    fn parses_gigabyte_literal() {
        assert_eq!(parse_memory_literal("2G"), Some(2 * 1024 * 1024 * 1024));
    }

    #[test]
    fn rejects_unknown_unit() {
        assert_eq!(parse_memory_literal("2GB"), None);
    }
}
