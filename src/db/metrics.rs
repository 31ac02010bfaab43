// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! SessionMetrics ingestion and retrieval (§3, §6 POST /sessions/{id}/metrics).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::pool::DbPool;
use crate::domain::SessionMetrics;
use crate::errors::StoreError;

#[derive(Debug, FromRow)]
struct DbSessionMetrics {
    id: i64,
    session_id: Uuid,
    timestamp: DateTime<Utc>,
    cpu_percent: Option<f64>,
    memory_mb: Option<f64>,
    network_rx_bytes: Option<i64>,
    network_tx_bytes: Option<i64>,
}

impl From<DbSessionMetrics> for SessionMetrics {
    fn from(row: DbSessionMetrics) -> Self {
        SessionMetrics {
            id: row.id,
            session_id: row.session_id,
            timestamp: row.timestamp,
            cpu_percent: row.cpu_percent,
            memory_mb: row.memory_mb,
            network_rx_bytes: row.network_rx_bytes,
            network_tx_bytes: row.network_tx_bytes,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsSample {
    pub cpu_percent: Option<f64>,
    pub memory_mb: Option<f64>,
    pub network_rx_bytes: Option<i64>,
    pub network_tx_bytes: Option<i64>,
}

pub async fn record(pool: &DbPool, session_id: Uuid, sample: MetricsSample) -> Result<SessionMetrics, StoreError> {
    let row = sqlx::query_as::<_, DbSessionMetrics>(
        r#"
        INSERT INTO session_metrics (session_id, cpu_percent, memory_mb, network_rx_bytes, network_tx_bytes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(session_id)
    .bind(sample.cpu_percent)
    .bind(sample.memory_mb)
    .bind(sample.network_rx_bytes)
    .bind(sample.network_tx_bytes)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// §6 GET /sessions/{id}/metrics — raw series, chronological, optionally windowed.
pub async fn list(
    pool: &DbPool,
    session_id: Uuid,
    since: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<SessionMetrics>, StoreError> {
    let rows = sqlx::query_as::<_, DbSessionMetrics>(
        r#"
        SELECT * FROM session_metrics
        WHERE session_id = $1 AND ($2::TIMESTAMPTZ IS NULL OR timestamp >= $2)
        ORDER BY timestamp ASC
        LIMIT $3
        "#,
    )
    .bind(session_id)
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(SessionMetrics::from).collect())
}
