// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §4.I Metrics Aggregator — read-side only, time-bucketed rollups over
//! `session_metrics`. Bucketing is pushed down to Postgres' `date_trunc`,
//! the same way the teacher lets the database do aggregation rather than
//! pulling rows into process memory.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::DbPool;
use crate::errors::StoreError;

/// Supported rollup granularities (§4.I `interval` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    OneHour,
}

impl Interval {
    fn date_trunc_field(self) -> &'static str {
        match self {
            Interval::OneMinute => "minute",
            Interval::FiveMinutes => "minute",
            Interval::OneHour => "hour",
        }
    }

    /// `date_trunc` only goes down to whole units; 5-minute buckets need a
    /// floor-division trick on top of the minute truncation.
    fn bucket_minutes(self) -> Option<i64> {
        match self {
            Interval::FiveMinutes => Some(5),
            _ => None,
        }
    }
}

impl std::str::FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1min" => Ok(Interval::OneMinute),
            "5min" => Ok(Interval::FiveMinutes),
            "1h" => Ok(Interval::OneHour),
            other => Err(format!("unsupported interval: {}", other)),
        }
    }
}

/// Scope of a rollup query: a single worker, a whole pool (optionally broken
/// down per worker via `db::workers`), or system-wide.
#[derive(Debug, Clone)]
pub enum Scope {
    Worker(Uuid),
    Pool(Uuid),
    SystemWide,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MetricsBucket {
    pub bucket: DateTime<Utc>,
    pub avg_cpu_percent: Option<f64>,
    pub avg_memory_mb: Option<f64>,
    pub sum_memory_mb: Option<f64>,
    pub sum_network_rx_bytes: Option<i64>,
    pub sum_network_tx_bytes: Option<i64>,
    pub sample_count: i64,
    pub distinct_session_count: i64,
}

/// §4.I: when `interval` is `None`, returns raw rows ordered by timestamp
/// ascending instead of aggregating (`raw` field covers that case upstream
/// in `api::metrics`; this module only does the bucketed path).
pub async fn aggregate(
    pool: &DbPool,
    scope: Scope,
    interval: Interval,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<MetricsBucket>, StoreError> {
    let bucket_expr = match interval.bucket_minutes() {
        Some(minutes) => format!(
            "to_timestamp(floor(extract(epoch from sm.timestamp) / {secs}) * {secs})",
            secs = minutes * 60
        ),
        None => format!("date_trunc('{}', sm.timestamp)", interval.date_trunc_field()),
    };

    let query = format!(
        r#"
        SELECT
            {bucket_expr} AS bucket,
            AVG(sm.cpu_percent) AS avg_cpu_percent,
            AVG(sm.memory_mb) AS avg_memory_mb,
            SUM(sm.memory_mb) AS sum_memory_mb,
            SUM(sm.network_rx_bytes) AS sum_network_rx_bytes,
            SUM(sm.network_tx_bytes) AS sum_network_tx_bytes,
            COUNT(*) AS sample_count,
            COUNT(DISTINCT sm.session_id) AS distinct_session_count
        FROM session_metrics sm
        JOIN sessions s ON s.id = sm.session_id
        WHERE ($1::UUID IS NULL OR s.worker_id = $1)
          AND ($2::UUID IS NULL OR s.work_pool_id = $2)
          AND ($3::TIMESTAMPTZ IS NULL OR sm.timestamp >= $3)
        GROUP BY bucket
        ORDER BY bucket ASC
        "#,
    );

    let (worker_id, work_pool_id) = match scope {
        Scope::Worker(id) => (Some(id), None),
        Scope::Pool(id) => (None, Some(id)),
        Scope::SystemWide => (None, None),
    };

    let rows = sqlx::query_as::<_, MetricsBucket>(&query)
        .bind(worker_id)
        .bind(work_pool_id)
        .bind(since)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Session-scoped rollup for `GET /api/v1/metrics/session/{id}?interval=...`
/// (§6) — the same bucket math as [`aggregate`], but filtered directly by
/// `session_id` since a single session isn't a `Scope` the worker/pool
/// query above models.
pub async fn aggregate_session(
    pool: &DbPool,
    session_id: Uuid,
    interval: Interval,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<MetricsBucket>, StoreError> {
    let bucket_expr = match interval.bucket_minutes() {
        Some(minutes) => format!(
            "to_timestamp(floor(extract(epoch from sm.timestamp) / {secs}) * {secs})",
            secs = minutes * 60
        ),
        None => format!("date_trunc('{}', sm.timestamp)", interval.date_trunc_field()),
    };

    let query = format!(
        r#"
        SELECT
            {bucket_expr} AS bucket,
            AVG(sm.cpu_percent) AS avg_cpu_percent,
            AVG(sm.memory_mb) AS avg_memory_mb,
            SUM(sm.memory_mb) AS sum_memory_mb,
            SUM(sm.network_rx_bytes) AS sum_network_rx_bytes,
            SUM(sm.network_tx_bytes) AS sum_network_tx_bytes,
            COUNT(*) AS sample_count,
            COUNT(DISTINCT sm.session_id) AS distinct_session_count
        FROM session_metrics sm
        WHERE sm.session_id = $1
          AND ($2::TIMESTAMPTZ IS NULL OR sm.timestamp >= $2)
        GROUP BY bucket
        ORDER BY bucket ASC
        "#,
    );

    let rows = sqlx::query_as::<_, MetricsBucket>(&query)
        .bind(session_id)
        .bind(since)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_known_intervals() {
        assert_eq!(Interval::from_str("1min").unwrap(), Interval::OneMinute);
        assert_eq!(Interval::from_str("5min").unwrap(), Interval::FiveMinutes);
        assert_eq!(Interval::from_str("1h").unwrap(), Interval::OneHour);
    }

    #[test]
    fn rejects_unknown_interval() {
        assert!(Interval::from_str("1day").is_err());
    }
}
