// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! HTTP client for the central `fleet-server` API, grounded in the teacher's
//! use of `reqwest` with a `json` body and rustls-tls for outbound calls
//! (the teacher's `AnyoneService` HTTP plumbing is the nearest analogue here,
//! since `noxterm.rs` itself never makes outbound HTTP calls of its own).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::domain::{ProviderType, Session, SessionEventType, Worker, WorkerStatus};
use crate::{Context, Result};

#[derive(Clone)]
pub struct FleetClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct WorkerRegisterBody {
    name: String,
    work_pool_id: Uuid,
    capacity: i32,
    provider_type: ProviderType,
}

#[derive(Debug, Serialize)]
struct HeartbeatBody {
    status: WorkerStatus,
    current_load: i32,
    cpu_percent: Option<f64>,
    memory_usage_mb: Option<f64>,
    disk_usage_mb: Option<f64>,
    ip_address: Option<String>,
}

#[derive(Debug, Serialize)]
struct EventBody {
    session_id: Uuid,
    event: SessionEventType,
    data: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
struct MetricsBody {
    session_id: Uuid,
    cpu_percent: Option<f64>,
    memory_mb: Option<f64>,
    network_rx_bytes: Option<i64>,
    network_tx_bytes: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawClaimResponse {
    claimed: bool,
    session: Option<Session>,
    reason: Option<String>,
}

/// §4.G's three-way claim outcome as seen by the worker agent.
pub enum ClaimOutcome {
    Claimed(Box<Session>),
    Empty(String),
}

impl FleetClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), api_key })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }

    /// §4.H `Register()` — idempotent by id at the agent level (the caller
    /// decides whether to call this or reuse a persisted worker id); the
    /// server itself always creates a fresh row, since workers have no
    /// natural external identity to upsert on besides name+pool.
    pub async fn register(&self, name: &str, work_pool_id: Uuid, capacity: i32, provider_type: ProviderType) -> Result<Worker> {
        let body = WorkerRegisterBody { name: name.to_string(), work_pool_id, capacity, provider_type };
        let resp = self
            .apply_auth(self.http.post(self.url("/workerpools/workers")).json(&body))
            .send()
            .await
            .context("register request failed")?;
        parse_json(resp).await
    }

    pub async fn get_worker(&self, worker_id: Uuid) -> Result<Option<Worker>> {
        let resp = self
            .apply_auth(self.http.get(self.url(&format!("/workerpools/workers/{}", worker_id))))
            .send()
            .await
            .context("get worker request failed")?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(parse_json(resp).await?))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn heartbeat(
        &self,
        worker_id: Uuid,
        status: WorkerStatus,
        current_load: i32,
        cpu_percent: Option<f64>,
        memory_usage_mb: Option<f64>,
        disk_usage_mb: Option<f64>,
        ip_address: Option<String>,
    ) -> Result<Worker> {
        let body = HeartbeatBody { status, current_load, cpu_percent, memory_usage_mb, disk_usage_mb, ip_address };
        let resp = self
            .apply_auth(self.http.put(self.url(&format!("/workerpools/workers/{}/heartbeat", worker_id))).json(&body))
            .send()
            .await
            .context("heartbeat request failed")?;
        parse_json(resp).await
    }

    pub async fn claim_session(&self, worker_id: Uuid) -> Result<ClaimOutcome> {
        let resp = self
            .apply_auth(self.http.post(self.url(&format!("/workerpools/workers/{}/claim-session", worker_id))))
            .send()
            .await
            .context("claim request failed")?;
        let raw: RawClaimResponse = parse_json(resp).await?;
        match (raw.claimed, raw.session) {
            (true, Some(session)) => Ok(ClaimOutcome::Claimed(Box::new(session))),
            _ => Ok(ClaimOutcome::Empty(raw.reason.unwrap_or_else(|| "unknown".to_string()))),
        }
    }

    pub async fn post_event(&self, session_id: Uuid, event: SessionEventType, data: Option<JsonValue>) -> Result<()> {
        let body = EventBody { session_id, event, data };
        let resp = self.apply_auth(self.http.post(self.url("/events")).json(&body)).send().await.context("event post failed")?;
        ensure_success(resp).await
    }

    pub async fn post_metrics(
        &self,
        session_id: Uuid,
        cpu_percent: Option<f64>,
        memory_mb: Option<f64>,
        network_rx_bytes: Option<i64>,
        network_tx_bytes: Option<i64>,
    ) -> Result<()> {
        let body = MetricsBody { session_id, cpu_percent, memory_mb, network_rx_bytes, network_tx_bytes };
        let resp = self.apply_auth(self.http.post(self.url("/metrics")).json(&body)).send().await.context("metrics post failed")?;
        ensure_success(resp).await
    }
}

async fn parse_json<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("fleet-server returned {}: {}", status, body);
    }
    resp.json::<T>().await.context("failed to decode fleet-server response")
}

async fn ensure_success(resp: reqwest::Response) -> Result<()> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("fleet-server returned {}: {}", status, body);
    }
    Ok(())
}

