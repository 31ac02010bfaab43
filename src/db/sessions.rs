// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! CRUD for the Session entity (§4.C). Enum/JSON columns are stored as
//! TEXT/JSONB and converted at the boundary, mirroring the teacher's
//! `db::sessions` string-status pattern generalized to the richer Fleet
//! session shape.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use super::pool::DbPool;
use crate::domain::{Browser, BrowserVersion, OperatingSystem, Proxy, ResourceLimits, Screen, Session, SessionStatus};
use crate::errors::StoreError;

#[derive(Debug, FromRow)]
struct DbSession {
    id: Uuid,
    browser: String,
    version: String,
    operating_system: String,
    headless: bool,
    screen: JsonValue,
    proxy: Option<JsonValue>,
    resource_limits: Option<JsonValue>,
    environment: JsonValue,
    status: String,
    work_pool_id: Option<Uuid>,
    worker_id: Option<Uuid>,
    container_id: Option<String>,
    ws_endpoint: Option<String>,
    live_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbSession> for Session {
    type Error = StoreError;

    fn try_from(row: DbSession) -> Result<Self, Self::Error> {
        Ok(Session {
            id: row.id,
            browser: Browser::from_str(&row.browser).map_err(StoreError::Validation)?,
            version: BrowserVersion::from_str(&row.version).map_err(StoreError::Validation)?,
            operating_system: OperatingSystem::from_str(&row.operating_system).map_err(StoreError::Validation)?,
            headless: row.headless,
            screen: serde_json::from_value(row.screen).map_err(|e| StoreError::QueryFailed(e.to_string()))?,
            proxy: row
                .proxy
                .map(serde_json::from_value::<Proxy>)
                .transpose()
                .map_err(|e| StoreError::QueryFailed(e.to_string()))?,
            resource_limits: row
                .resource_limits
                .map(serde_json::from_value::<ResourceLimits>)
                .transpose()
                .map_err(|e| StoreError::QueryFailed(e.to_string()))?,
            environment: serde_json::from_value(row.environment).unwrap_or_default(),
            status: SessionStatus::from_str(&row.status).map_err(StoreError::Validation)?,
            work_pool_id: row.work_pool_id,
            worker_id: row.worker_id,
            container_id: row.container_id,
            ws_endpoint: row.ws_endpoint,
            live_url: row.live_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
            expires_at: row.expires_at,
        })
    }
}

/// Fields a client may supply when creating a session; everything else is
/// either computed (`id`, timestamps) or filled in later by placement (§4.F).
#[derive(Debug, Clone, Default)]
pub struct SessionCreate {
    pub browser: Option<Browser>,
    pub version: Option<BrowserVersion>,
    pub operating_system: Option<OperatingSystem>,
    pub headless: Option<bool>,
    pub screen: Option<Screen>,
    pub proxy: Option<Proxy>,
    pub resource_limits: Option<ResourceLimits>,
    pub environment: HashMap<String, String>,
}

impl SessionCreate {
    /// §4.C validation: memory literal, screen dimensions, no unknown enum
    /// values (enum parsing already rejects those upstream of this call).
    pub fn validate(&self) -> Result<(), StoreError> {
        if let Some(screen) = &self.screen {
            if !screen.is_valid() {
                return Err(StoreError::Validation("screen width/height must be positive".into()));
            }
        }
        if let Some(limits) = &self.resource_limits {
            if !limits.is_valid() {
                return Err(StoreError::Validation(
                    "resource_limits.memory must match ^\\d+[MG]$".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub status: Option<SessionStatus>,
    pub work_pool_id: Option<Uuid>,
    pub worker_id: Option<Uuid>,
}

pub async fn create(pool: &DbPool, spec: SessionCreate) -> Result<Session, StoreError> {
    spec.validate()?;

    let browser = spec.browser.unwrap_or(Browser::Chrome);
    let version = spec.version.unwrap_or(BrowserVersion::Latest);
    let os = spec.operating_system.unwrap_or(OperatingSystem::Linux);
    let screen = spec.screen.unwrap_or_default();

    let row = sqlx::query_as::<_, DbSession>(
        r#"
        INSERT INTO sessions
            (browser, version, operating_system, headless, screen, proxy,
             resource_limits, environment, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(browser.to_string())
    .bind(version.to_string())
    .bind(os.to_string())
    .bind(spec.headless.unwrap_or(false))
    .bind(serde_json::to_value(&screen).unwrap())
    .bind(spec.proxy.as_ref().map(|p| serde_json::to_value(p).unwrap()))
    .bind(
        spec.resource_limits
            .as_ref()
            .map(|r| serde_json::to_value(r).unwrap()),
    )
    .bind(serde_json::to_value(&spec.environment).unwrap())
    .bind(Session::compute_expiry(Utc::now(), spec.resource_limits.as_ref()))
    .fetch_one(pool)
    .await?;

    row.try_into()
}

pub async fn get(pool: &DbPool, id: Uuid) -> Result<Option<Session>, StoreError> {
    let row = sqlx::query_as::<_, DbSession>("SELECT * FROM sessions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(Session::try_from).transpose()
}

/// Fetch-and-lock variant used by §4.F/§4.G/§4.B transactions that must
/// serialize on the session row before touching its bound worker.
pub async fn get_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
) -> Result<Option<Session>, StoreError> {
    let row = sqlx::query_as::<_, DbSession>("SELECT * FROM sessions WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    row.map(Session::try_from).transpose()
}

pub async fn list(pool: &DbPool, filter: SessionFilter, offset: i64, limit: i64) -> Result<Vec<Session>, StoreError> {
    let rows = sqlx::query_as::<_, DbSession>(
        r#"
        SELECT * FROM sessions
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::UUID IS NULL OR work_pool_id = $2)
          AND ($3::UUID IS NULL OR worker_id = $3)
        ORDER BY created_at DESC
        OFFSET $4 LIMIT $5
        "#,
    )
    .bind(filter.status.map(|s| s.to_string()))
    .bind(filter.work_pool_id)
    .bind(filter.worker_id)
    .bind(offset)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Session::try_from).collect()
}

/// §4.F step 5 — bind the session to a pool (placement never binds a worker).
pub async fn bind_pool(pool: &DbPool, id: Uuid, work_pool_id: Uuid) -> Result<(), StoreError> {
    sqlx::query("UPDATE sessions SET work_pool_id = $1, updated_at = NOW() WHERE id = $2")
        .bind(work_pool_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// §4.D Merge — persist the session fields a pool's defaults filled in.
pub async fn apply_defaults(
    pool: &DbPool,
    id: Uuid,
    browser: Browser,
    version: BrowserVersion,
    headless: bool,
    operating_system: OperatingSystem,
    screen: Screen,
    proxy: Option<&Proxy>,
    resource_limits: Option<&ResourceLimits>,
    environment: &HashMap<String, String>,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        UPDATE sessions
        SET browser = $1, version = $2, headless = $3, operating_system = $4,
            screen = $5, proxy = $6, resource_limits = $7, environment = $8,
            updated_at = NOW()
        WHERE id = $9
        "#,
    )
    .bind(browser.to_string())
    .bind(version.to_string())
    .bind(headless)
    .bind(operating_system.to_string())
    .bind(serde_json::to_value(screen).unwrap())
    .bind(proxy.map(|p| serde_json::to_value(p).unwrap()))
    .bind(resource_limits.map(|r| serde_json::to_value(r).unwrap()))
    .bind(serde_json::to_value(environment).unwrap())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// §4.G step 5 — bind the worker and increment its load, within the caller's transaction.
pub async fn bind_worker(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    worker_id: Uuid,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE sessions SET worker_id = $1, updated_at = NOW() WHERE id = $2")
        .bind(worker_id)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// §4.G step 3 — oldest unclaimed PENDING session in a pool, row-locked.
pub async fn next_claimable(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    work_pool_id: Uuid,
) -> Result<Option<Session>, StoreError> {
    let row = sqlx::query_as::<_, DbSession>(
        r#"
        SELECT * FROM sessions
        WHERE work_pool_id = $1 AND status = 'pending' AND worker_id IS NULL
        ORDER BY created_at ASC
        FOR UPDATE SKIP LOCKED
        LIMIT 1
        "#,
    )
    .bind(work_pool_id)
    .fetch_optional(&mut **tx)
    .await?;
    row.map(Session::try_from).transpose()
}

/// §4.A LaunchContainer success — set provider-supplied connection details.
pub async fn set_container_details(
    pool: &DbPool,
    id: Uuid,
    container_id: &str,
    ws_endpoint: &str,
    live_url: &str,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        UPDATE sessions
        SET container_id = $1, ws_endpoint = $2, live_url = $3, updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(container_id)
    .bind(ws_endpoint)
    .bind(live_url)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// §9 Open Question / §4.A failure semantics — FAILED is set directly by the
/// scheduler/worker on a `ProviderError`, never inferred from an event.
pub async fn mark_failed(pool: &DbPool, id: Uuid) -> Result<(), StoreError> {
    sqlx::query("UPDATE sessions SET status = 'failed', updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// §4.C Refresh: extends `expires_at` by `resource_limits.timeout_minutes` from now.
pub async fn refresh(pool: &DbPool, id: Uuid) -> Result<Option<Session>, StoreError> {
    let Some(session) = get(pool, id).await? else {
        return Ok(None);
    };
    if session.status.is_terminal() {
        return Err(StoreError::Conflict("cannot refresh a terminal session".into()));
    }
    let minutes = session
        .resource_limits
        .as_ref()
        .map(|r| r.timeout_minutes)
        .unwrap_or(30);

    let row = sqlx::query_as::<_, DbSession>(
        "UPDATE sessions SET expires_at = NOW() + ($1 || ' minutes')::INTERVAL, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(minutes.to_string())
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(Some(row.try_into()?))
}

/// Delete semantics: any state is deletable; an active session transitions to
/// TERMINATED instead of being removed, matching §3's lifecycle note ("deletable
/// at any state (becomes TERMINATED if active)").
pub async fn delete(pool: &DbPool, id: Uuid, force: bool) -> Result<bool, StoreError> {
    let Some(session) = get(pool, id).await? else {
        return Ok(false);
    };

    if session.status.is_terminal() {
        sqlx::query("DELETE FROM sessions WHERE id = $1").bind(id).execute(pool).await?;
        return Ok(true);
    }

    if !force {
        // Active session: terminate rather than hard-delete, decrementing the
        // bound worker's load if any (§4.B step 3 semantics, applied directly).
        let mut tx = pool.begin().await?;
        if let Some(worker_id) = session.worker_id {
            super::workers::decrement_load(&mut tx, worker_id).await?;
        }
        sqlx::query("UPDATE sessions SET status = 'terminated', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        return Ok(true);
    }

    let mut tx = pool.begin().await?;
    if let Some(worker_id) = session.worker_id {
        super::workers::decrement_load(&mut tx, worker_id).await?;
    }
    sqlx::query("DELETE FROM sessions WHERE id = $1").bind(id).execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(true)
}

/// Count of non-terminal sessions in a pool, used by §4.F scoring.
pub async fn count_active_in_pool(pool: &DbPool, work_pool_id: Uuid) -> Result<i64, StoreError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sessions WHERE work_pool_id = $1 AND status IN ('pending', 'starting', 'running')",
    )
    .bind(work_pool_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_bad_memory_literal() {
        let spec = SessionCreate {
            resource_limits: Some(ResourceLimits { memory: Some("2GB".into()), ..Default::default() }),
            ..Default::default()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn validate_rejects_nonpositive_screen() {
        let spec = SessionCreate {
            screen: Some(Screen { width: -1, height: 10, ..Default::default() }),
            ..Default::default()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn validate_accepts_empty_spec() {
        assert!(SessionCreate::default().validate().is_ok());
    }
}
