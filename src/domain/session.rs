// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! Session, SessionEvent and SessionMetrics value types (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::LazyLock;
use uuid::Uuid;

use regex::Regex;

use super::enums::{Browser, BrowserVersion, OperatingSystem, SessionStatus};
use super::screen::Screen;

static MEMORY_LITERAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+[MG]$").unwrap());

/// Optional upstream proxy for the browser container (§3 Session.proxy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proxy {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Container resource caps (§3 Session.resource_limits).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu: Option<f64>,
    pub memory: Option<String>,
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: i64,
}

fn default_timeout_minutes() -> i64 {
    30
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu: None,
            memory: None,
            timeout_minutes: default_timeout_minutes(),
        }
    }
}

impl ResourceLimits {
    /// §4.C validation: `memory` must match `^\d+[MG]$` when present.
    pub fn is_valid(&self) -> bool {
        match &self.memory {
            Some(m) => MEMORY_LITERAL.is_match(m),
            None => true,
        }
    }
}

/// A request for (and lifecycle record of) a running browser instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,

    pub browser: Browser,
    pub version: BrowserVersion,
    pub operating_system: OperatingSystem,
    pub headless: bool,

    pub screen: Screen,
    pub proxy: Option<Proxy>,
    pub resource_limits: Option<ResourceLimits>,
    pub environment: HashMap<String, String>,

    pub status: SessionStatus,

    pub work_pool_id: Option<Uuid>,
    pub worker_id: Option<Uuid>,

    pub container_id: Option<String>,
    pub ws_endpoint: Option<String>,
    pub live_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// §3: `expires_at = created_at + timeout_minutes` when the caller specified one.
    pub fn compute_expiry(created_at: DateTime<Utc>, limits: Option<&ResourceLimits>) -> Option<DateTime<Utc>> {
        let minutes = limits.map(|l| l.timeout_minutes)?;
        Some(created_at + chrono::Duration::minutes(minutes))
    }

    /// §4.C: a PENDING session with no bound worker is eligible for §4.G claim.
    pub fn is_claimable(&self) -> bool {
        self.status == SessionStatus::Pending && self.worker_id.is_none()
    }
}

/// Append-only lifecycle event (§3 SessionEvent; §4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventType {
    SessionCreated,
    SessionAssigned,
    SessionStarting,
    BrowserStarted,
    SessionIdle,
    SessionActive,
    SessionCompleted,
    SessionCrashed,
    SessionTimedOut,
    SessionTerminated,
}

impl SessionEventType {
    /// §4.B event → status table. `None` means the event carries no status change.
    pub fn inferred_status(self) -> Option<SessionStatus> {
        use SessionEventType::*;
        match self {
            SessionCreated | SessionAssigned => Some(SessionStatus::Pending),
            SessionStarting => Some(SessionStatus::Starting),
            BrowserStarted => Some(SessionStatus::Running),
            SessionCompleted => Some(SessionStatus::Completed),
            SessionCrashed => Some(SessionStatus::Crashed),
            SessionTimedOut => Some(SessionStatus::TimedOut),
            SessionTerminated => Some(SessionStatus::Terminated),
            SessionIdle | SessionActive => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub id: i64,
    pub session_id: Uuid,
    pub event: SessionEventType,
    pub timestamp: DateTime<Utc>,
    pub data: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub id: i64,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: Option<f64>,
    pub memory_mb: Option<f64>,
    pub network_rx_bytes: Option<i64>,
    pub network_tx_bytes: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_literal_accepts_valid_forms() {
        assert!(ResourceLimits { memory: Some("512M".into()), ..Default::default() }.is_valid());
        assert!(ResourceLimits { memory: Some("2G".into()), ..Default::default() }.is_valid());
        assert!(!ResourceLimits { memory: Some("2GB".into()), ..Default::default() }.is_valid());
        assert!(!ResourceLimits { memory: Some("".into()), ..Default::default() }.is_valid());
    }

    #[test]
    fn expiry_is_none_without_resource_limits() {
        let now = Utc::now();
        assert!(Session::compute_expiry(now, None).is_none());
    }

    #[test]
    fn expiry_adds_timeout_minutes() {
        let now = Utc::now();
        let limits = ResourceLimits { timeout_minutes: 45, ..Default::default() };
        let expires = Session::compute_expiry(now, Some(&limits)).unwrap();
        assert_eq!(expires, now + chrono::Duration::minutes(45));
    }
}
