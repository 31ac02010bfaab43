// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//! Periodic housekeeping, generalized from the teacher's `db::cleanup::run_all`
//! to Fleet's entity set. Invoked on a timer from `fleet-server`'s startup task,
//! the same way the teacher schedules its cleanup loop.

use tracing::info;

use super::pool::DbPool;
use crate::errors::StoreError;

#[derive(Debug, Clone)]
pub struct CleanupStats {
    pub expired_sessions: i64,
    pub old_rate_limits: i64,
    pub old_metrics: i64,
    pub old_audit_logs: i64,
}

impl CleanupStats {
    pub fn total(&self) -> i64 {
        self.expired_sessions + self.old_rate_limits + self.old_metrics + self.old_audit_logs
    }
}

pub async fn run_all(pool: &DbPool) -> Result<CleanupStats, StoreError> {
    let expired_sessions = cleanup_expired_sessions(pool).await?;
    let old_rate_limits = call_cleanup_fn(pool, "cleanup_old_rate_limits").await?;
    let old_metrics = call_cleanup_fn(pool, "cleanup_old_metrics").await?;
    let old_audit_logs = call_cleanup_fn(pool, "cleanup_old_audit_logs").await?;

    let stats = CleanupStats { expired_sessions, old_rate_limits, old_metrics, old_audit_logs };

    if stats.total() > 0 {
        info!(
            "cleanup completed: {} expired sessions, {} rate limits, {} metrics, {} audit logs",
            expired_sessions, old_rate_limits, old_metrics, old_audit_logs
        );
    }

    Ok(stats)
}

/// §3/§4.C: a non-terminal session whose `expires_at` has passed transitions
/// to EXPIRED rather than being deleted, matching the terminal-status set's
/// distinct EXPIRED variant. EXPIRED is terminal, so I5 still applies here:
/// any bound worker's `current_load` must come down by exactly one, the same
/// as the ordinary §4.B event path does for every other terminal transition.
async fn cleanup_expired_sessions(pool: &DbPool) -> Result<i64, StoreError> {
    let mut tx = pool.begin().await?;

    let expired: Vec<(uuid::Uuid, Option<uuid::Uuid>)> = sqlx::query_as(
        r#"
        SELECT id, worker_id FROM sessions
        WHERE status IN ('pending', 'starting', 'running')
          AND expires_at IS NOT NULL
          AND expires_at < NOW()
        FOR UPDATE
        "#,
    )
    .fetch_all(&mut *tx)
    .await?;

    for (session_id, worker_id) in &expired {
        sqlx::query("UPDATE sessions SET status = 'expired', updated_at = NOW() WHERE id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
        if let Some(worker_id) = worker_id {
            super::workers::decrement_load(&mut tx, *worker_id).await?;
        }
    }

    tx.commit().await?;
    Ok(expired.len() as i64)
}

async fn call_cleanup_fn(pool: &DbPool, function_name: &str) -> Result<i64, StoreError> {
    let query = format!("SELECT {}()", function_name);
    let (deleted,): (i32,) = sqlx::query_as(&query).fetch_one(pool).await?;
    Ok(deleted as i64)
}
