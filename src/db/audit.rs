// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//! Audit log database operations (ambient; carried regardless of spec.md's
//! feature Non-goals, per SPEC_FULL.md's supplemented-features section).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use tracing::debug;
use uuid::Uuid;

use super::pool::DbPool;
use crate::errors::StoreError;

/// Event types for audit logging, generalized from the teacher's session/container
/// set to Fleet's session/worker/work-pool lifecycle.
#[derive(Debug, Clone, Serialize)]
pub enum EventType {
    SessionCreated,
    SessionClaimed,
    SessionTerminated,
    WorkerRegistered,
    WorkerOffline,
    WorkPoolCreated,
    WorkPoolDeleted,
    RateLimitExceeded,
    AuthAttempt,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::SessionCreated => write!(f, "session_created"),
            EventType::SessionClaimed => write!(f, "session_claimed"),
            EventType::SessionTerminated => write!(f, "session_terminated"),
            EventType::WorkerRegistered => write!(f, "worker_registered"),
            EventType::WorkerOffline => write!(f, "worker_offline"),
            EventType::WorkPoolCreated => write!(f, "work_pool_created"),
            EventType::WorkPoolDeleted => write!(f, "work_pool_deleted"),
            EventType::RateLimitExceeded => write!(f, "rate_limit_exceeded"),
            EventType::AuthAttempt => write!(f, "auth_attempt"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: i64,
    pub session_id: Option<Uuid>,
    pub worker_id: Option<Uuid>,
    pub work_pool_id: Option<Uuid>,
    pub actor: String,
    pub event_type: String,
    pub event_data: Option<JsonValue>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub session_id: Option<Uuid>,
    pub worker_id: Option<Uuid>,
    pub work_pool_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

pub async fn log(
    pool: &DbPool,
    actor: &str,
    event_type: EventType,
    event_data: Option<JsonValue>,
    ctx: AuditContext,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs
            (session_id, worker_id, work_pool_id, actor, event_type, event_data, ip_address, user_agent)
        VALUES ($1, $2, $3, $4, $5, $6, $7::INET, $8)
        "#,
    )
    .bind(ctx.session_id)
    .bind(ctx.worker_id)
    .bind(ctx.work_pool_id)
    .bind(actor)
    .bind(event_type.to_string())
    .bind(event_data)
    .bind(ctx.ip_address)
    .bind(ctx.user_agent)
    .execute(pool)
    .await?;

    debug!("logged audit event: {} by {}", event_type, actor);
    Ok(())
}

pub async fn get_by_session(pool: &DbPool, session_id: Uuid, limit: i64) -> Result<Vec<AuditLog>, StoreError> {
    let rows = sqlx::query_as::<_, AuditLog>(
        r#"
        SELECT id, session_id, worker_id, work_pool_id, actor, event_type, event_data,
               ip_address::TEXT as ip_address, user_agent, created_at
        FROM audit_logs
        WHERE session_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(session_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_recent(pool: &DbPool, limit: i64) -> Result<Vec<AuditLog>, StoreError> {
    let rows = sqlx::query_as::<_, AuditLog>(
        r#"
        SELECT id, session_id, worker_id, work_pool_id, actor, event_type, event_data,
               ip_address::TEXT as ip_address, user_agent, created_at
        FROM audit_logs
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
