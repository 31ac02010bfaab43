// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §4.H Worker Agent main loop, grounded in the teacher's `LifecycleManager`
//! task split (cleanup / health-check / metrics / orphan-detection) collapsed
//! into one cooperative loop per the spec's single-process-per-worker model.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{ResourceLimits, Session, SessionEventType, Worker, WorkerStatus};
use crate::provider::docker::DockerProvider;
use crate::provider::{Provider, ProviderRegistry};
use crate::{Context, Result};

use super::client::{ClaimOutcome, FleetClient};
use super::config::WorkerAgentConfig;

/// State the agent keeps about a session it is actively running — the
/// worker-local mirror of what the server persists, since the agent never
/// reads `sessions` directly, only through the HTTP surface it claims over.
struct LocalSession {
    claimed_at: DateTime<Utc>,
    resource_limits: Option<ResourceLimits>,
    container_id: Option<String>,
    last_metrics_emit: Option<DateTime<Utc>>,
}

pub struct WorkerAgent {
    client: FleetClient,
    config: WorkerAgentConfig,
    providers: ProviderRegistry,
    worker_id: Uuid,
    active: HashMap<Uuid, LocalSession>,
}

impl WorkerAgent {
    /// §4.H `Register()` — idempotent by id: a worker id persisted in
    /// `state_file` from a prior run is reused (after confirming the server
    /// still knows about it); otherwise a fresh worker row is created.
    pub async fn bootstrap(config: WorkerAgentConfig) -> Result<Self> {
        let client = FleetClient::new(config.server_url.clone(), config.api_key.clone())?;

        let docker = DockerProvider::connect(config.docker.clone()).map_err(|e| anyhow::anyhow!("docker connect failed: {}", e))?;
        let providers = ProviderRegistry::new(docker);
        providers
            .get(config.provider_type)
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("provider start failed: {}", e))?;

        let worker_id = Self::register_or_resume(&client, &config).await?;

        Ok(Self { client, config, providers, worker_id, active: HashMap::new() })
    }

    async fn register_or_resume(client: &FleetClient, config: &WorkerAgentConfig) -> Result<Uuid> {
        if let Ok(contents) = tokio::fs::read_to_string(&config.state_file).await {
            if let Ok(id) = contents.trim().parse::<Uuid>() {
                if let Some(worker) = client.get_worker(id).await? {
                    info!("resuming as worker {} ({})", worker.id, worker.name);
                    return Ok(worker.id);
                }
                warn!("persisted worker id {} is no longer known to the server, re-registering", id);
            }
        }

        let worker: Worker = client
            .register(&config.worker_name, config.work_pool_id, config.capacity, config.provider_type)
            .await
            .context("worker registration failed")?;

        if let Err(e) = tokio::fs::write(&config.state_file, worker.id.to_string()).await {
            warn!("failed to persist worker id to {}: {}", config.state_file.display(), e);
        }

        info!("registered as worker {} ({})", worker.id, worker.name);
        Ok(worker.id)
    }

    pub async fn run(mut self) -> Result<()> {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        let mut shutdown = Box::pin(shutdown_signal());

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown signal received, draining");
                    self.drain().await;
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("worker loop iteration failed: {}", e);
                    }
                }
            }
        }
    }

    async fn tick(&mut self) -> Result<()> {
        self.send_heartbeat(WorkerStatus::Online).await?;
        self.reconcile_active_sessions().await;
        self.emit_metrics_if_due().await;

        if (self.active.len() as i32) < self.config.capacity {
            self.try_claim().await;
        }

        Ok(())
    }

    async fn send_heartbeat(&self, status: WorkerStatus) -> Result<()> {
        let stats = self
            .providers
            .get(self.config.provider_type)
            .get_worker_stats()
            .await
            .map_err(|e| anyhow::anyhow!("worker stats failed: {}", e))?;

        self.client
            .heartbeat(
                self.worker_id,
                status,
                self.active.len() as i32,
                stats.cpu_percent,
                stats.memory_mb,
                stats.disk_mb,
                None,
            )
            .await
            .context("heartbeat failed")?;
        Ok(())
    }

    /// §4.H `ReconcileActiveSessions`: check each local session's container,
    /// expire by `resource_limits.timeout_minutes`, map cleanup reasons to
    /// terminal events (§4.H's completed/crashed/timeout/else table).
    async fn reconcile_active_sessions(&mut self) {
        let now = Utc::now();
        let mut finished = Vec::new();

        for (&session_id, local) in self.active.iter() {
            let expired = local
                .resource_limits
                .as_ref()
                .map(|limits| local.claimed_at + chrono::Duration::minutes(limits.timeout_minutes) < now)
                .unwrap_or(false);

            if expired {
                finished.push((session_id, SessionEventType::SessionTimedOut, local.container_id.clone()));
                continue;
            }

            let Some(container_id) = &local.container_id else { continue };
            match self.providers.get(self.config.provider_type).get_container_status(container_id).await {
                Ok(status) if status.running => {}
                Ok(_) => finished.push((session_id, SessionEventType::SessionCompleted, local.container_id.clone())),
                Err(e) => {
                    warn!("container status check failed for session {}: {}", session_id, e);
                    finished.push((session_id, SessionEventType::SessionCrashed, local.container_id.clone()));
                }
            }
        }

        for (session_id, event, container_id) in finished {
            if let Some(container_id) = container_id {
                if let Err(e) = self.providers.get(self.config.provider_type).terminate_container(&container_id).await {
                    warn!("failed to terminate container {} for session {}: {}", container_id, session_id, e);
                }
            }
            if let Err(e) = self.client.post_event(session_id, event, None).await {
                error!("failed to post terminal event for session {}: {}", session_id, e);
            }
            self.active.remove(&session_id);
        }
    }

    /// §4.H `EmitMetricsIfDue`: per session, once `metrics_interval` has elapsed.
    async fn emit_metrics_if_due(&mut self) {
        let now = Utc::now();
        let due: Vec<Uuid> = self
            .active
            .iter()
            .filter(|(_, local)| {
                local
                    .last_metrics_emit
                    .map(|last| (now - last).num_seconds() as u64 >= self.config.metrics_interval_secs)
                    .unwrap_or(true)
            })
            .map(|(&id, _)| id)
            .collect();

        for session_id in due {
            let container_id = self.active.get(&session_id).and_then(|l| l.container_id.clone());
            let Some(container_id) = container_id else { continue };

            match self.providers.get(self.config.provider_type).get_container_status(&container_id).await {
                Ok(status) => {
                    if let Err(e) = self
                        .client
                        .post_metrics(session_id, status.cpu_percent, status.memory_mb, status.network_rx_bytes, status.network_tx_bytes)
                        .await
                    {
                        warn!("metrics post failed for session {}: {}", session_id, e);
                    }
                    if let Some(local) = self.active.get_mut(&session_id) {
                        local.last_metrics_emit = Some(now);
                    }
                }
                Err(e) => warn!("metrics collection failed for session {}: {}", session_id, e),
            }
        }
    }

    async fn try_claim(&mut self) {
        match self.client.claim_session(self.worker_id).await {
            Ok(ClaimOutcome::Claimed(session)) => self.start_session_locally(*session).await,
            Ok(ClaimOutcome::Empty(_reason)) => {}
            Err(e) => warn!("claim request failed: {}", e),
        }
    }

    /// §4.H `StartSessionLocally`: SESSION_ASSIGNED -> SESSION_STARTING ->
    /// provision -> BROWSER_STARTED. A launch failure has no dedicated
    /// "failed" event in the event table (§4.B only reaches terminal status
    /// FAILED through the scheduler's direct write, never through an event,
    /// per the canonical status set); the nearest event the agent can raise
    /// over its HTTP surface is SESSION_CRASHED, which is terminal and
    /// decrements load the same way.
    async fn start_session_locally(&mut self, session: Session) {
        let session_id = session.id;

        if let Err(e) = self.client.post_event(session_id, SessionEventType::SessionAssigned, None).await {
            error!("failed to post session_assigned for {}: {}", session_id, e);
        }
        if let Err(e) = self.client.post_event(session_id, SessionEventType::SessionStarting, None).await {
            error!("failed to post session_starting for {}: {}", session_id, e);
        }

        match self.providers.get(self.config.provider_type).launch_container(&session).await {
            Ok(result) => {
                info!("launched container {} for session {}", result.container_id, session_id);
                self.active.insert(
                    session_id,
                    LocalSession {
                        claimed_at: Utc::now(),
                        resource_limits: session.resource_limits.clone(),
                        container_id: Some(result.container_id),
                        last_metrics_emit: None,
                    },
                );
                if let Err(e) = self.client.post_event(session_id, SessionEventType::BrowserStarted, None).await {
                    error!("failed to post browser_started for {}: {}", session_id, e);
                }
            }
            Err(e) => {
                error!("launch_container failed for session {}: {}", session_id, e);
                let data = Some(serde_json::json!({ "reason": "launch_failed", "detail": e.to_string() }));
                if let Err(e) = self.client.post_event(session_id, SessionEventType::SessionCrashed, data).await {
                    error!("failed to post failure event for session {}: {}", session_id, e);
                }
            }
        }
    }

    /// §4.H drain phase: mark OFFLINE via heartbeat, let active sessions run
    /// to their own natural terminal event rather than force-killing them.
    async fn drain(&self) {
        if let Err(e) = self.send_heartbeat(WorkerStatus::Offline).await {
            warn!("drain heartbeat failed: {}", e);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
