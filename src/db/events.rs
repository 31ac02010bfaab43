// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! SessionEvent append log and the §4.B transactional apply: every event is
//! recorded verbatim; only events that resolve to a forward status transition
//! (via [`crate::event::resolve_transition`]) mutate `sessions.status`, and
//! only a transition into a terminal status decrements the bound worker's
//! load. Lock ordering follows §5: session row first, worker row second.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use super::pool::DbPool;
use crate::domain::{SessionEvent, SessionEventType, SessionStatus};
use crate::errors::StoreError;
use crate::event::resolve_transition;

#[derive(Debug, FromRow)]
struct DbSessionEvent {
    id: i64,
    session_id: Uuid,
    event: String,
    timestamp: DateTime<Utc>,
    data: Option<JsonValue>,
}

impl TryFrom<DbSessionEvent> for SessionEvent {
    type Error = StoreError;

    fn try_from(row: DbSessionEvent) -> Result<Self, Self::Error> {
        Ok(SessionEvent {
            id: row.id,
            session_id: row.session_id,
            event: parse_event(&row.event)?,
            timestamp: row.timestamp,
            data: row.data,
        })
    }
}

fn parse_event(raw: &str) -> Result<SessionEventType, StoreError> {
    use SessionEventType::*;
    match raw {
        "session_created" => Ok(SessionCreated),
        "session_assigned" => Ok(SessionAssigned),
        "session_starting" => Ok(SessionStarting),
        "browser_started" => Ok(BrowserStarted),
        "session_idle" => Ok(SessionIdle),
        "session_active" => Ok(SessionActive),
        "session_completed" => Ok(SessionCompleted),
        "session_crashed" => Ok(SessionCrashed),
        "session_timed_out" => Ok(SessionTimedOut),
        "session_terminated" => Ok(SessionTerminated),
        other => Err(StoreError::Validation(format!("unknown session event: {}", other))),
    }
}

fn event_str(event: SessionEventType) -> &'static str {
    use SessionEventType::*;
    match event {
        SessionCreated => "session_created",
        SessionAssigned => "session_assigned",
        SessionStarting => "session_starting",
        BrowserStarted => "browser_started",
        SessionIdle => "session_idle",
        SessionActive => "session_active",
        SessionCompleted => "session_completed",
        SessionCrashed => "session_crashed",
        SessionTimedOut => "session_timed_out",
        SessionTerminated => "session_terminated",
    }
}

pub async fn list(pool: &DbPool, session_id: Uuid) -> Result<Vec<SessionEvent>, StoreError> {
    let rows = sqlx::query_as::<_, DbSessionEvent>(
        "SELECT * FROM session_events WHERE session_id = $1 ORDER BY timestamp ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(SessionEvent::try_from).collect()
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub session_id: Option<Uuid>,
    pub event_type: Option<SessionEventType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// §6 GET /api/v1/events/ — session_id?, event_type?, time window, paging.
pub async fn list_filtered(pool: &DbPool, filter: EventFilter, offset: i64, limit: i64) -> Result<Vec<SessionEvent>, StoreError> {
    let rows = sqlx::query_as::<_, DbSessionEvent>(
        r#"
        SELECT * FROM session_events
        WHERE ($1::UUID IS NULL OR session_id = $1)
          AND ($2::TEXT IS NULL OR event = $2)
          AND ($3::TIMESTAMPTZ IS NULL OR timestamp >= $3)
          AND ($4::TIMESTAMPTZ IS NULL OR timestamp <= $4)
        ORDER BY timestamp ASC
        OFFSET $5 LIMIT $6
        "#,
    )
    .bind(filter.session_id)
    .bind(filter.event_type.map(event_str))
    .bind(filter.since)
    .bind(filter.until)
    .bind(offset)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(SessionEvent::try_from).collect()
}

async fn insert(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    session_id: Uuid,
    event: SessionEventType,
    data: Option<JsonValue>,
) -> Result<SessionEvent, StoreError> {
    let row = sqlx::query_as::<_, DbSessionEvent>(
        r#"
        INSERT INTO session_events (session_id, event, data)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(session_id)
    .bind(event_str(event))
    .bind(data)
    .fetch_one(&mut **tx)
    .await?;
    row.try_into()
}

/// §4.B — the only entry point that appends a `session_events` row. Steps:
/// 1. lock the session row,
/// 2. append the event,
/// 3. resolve the status transition (if any) and apply it,
/// 4. on a transition into a terminal status, decrement the bound worker's
///    load (worker row locked only after the session row, per §5).
///
/// Returns the appended event and the session's status after the call.
pub async fn apply_session_event(
    pool: &DbPool,
    session_id: Uuid,
    event: SessionEventType,
    data: Option<JsonValue>,
) -> Result<(SessionEvent, SessionStatus), StoreError> {
    let mut tx = pool.begin().await?;

    let session = super::sessions::get_for_update(&mut tx, session_id)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("session {}", session_id)))?;

    let recorded = insert(&mut tx, session_id, event, data).await?;

    let next_status = match resolve_transition(session.status, event) {
        Some(next) => {
            sqlx::query("UPDATE sessions SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(next.to_string())
                .bind(session_id)
                .execute(&mut *tx)
                .await?;

            if next.is_terminal() {
                if let Some(worker_id) = session.worker_id {
                    super::workers::decrement_load(&mut tx, worker_id).await?;
                }
            }
            next
        }
        None => session.status,
    };

    tx.commit().await?;
    Ok((recorded, next_status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_str_round_trips_through_parse_event() {
        use SessionEventType::*;
        for event in [
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
        ] {
            assert_eq!(parse_event(event_str(event)).unwrap(), event);
        }
    }

    #[test]
    fn parse_event_rejects_unknown_strings() {
        assert!(parse_event("not_a_real_event").is_err());
    }
}
