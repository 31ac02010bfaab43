// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §4.D/§4.F — the WorkPoolManager: defaults merge, best-fit pool placement,
//! and the optional centralized provisioning path. Grounded in the Python
//! original's `workerpool/manager.py` (`assign_session_to_work_pool`,
//! `_apply_pool_defaults`, `_try_provision_session`), rewritten as pure
//! scoring plus explicit persistence calls instead of one monolithic method.

use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::domain::{Session, SessionStatus, WorkPool};
use crate::errors::SchedulerError;
use crate::provider::{Provider, ProviderRegistry};

/// §4.D Merge: copies each non-null pool default onto the session field it
/// matches, but only where the session left that field unset. Explicit
/// session values always win (S6).
pub fn apply_pool_defaults(session: &mut Session, pool: &WorkPool) {
    if session.proxy.is_none() {
        session.proxy = pool.default_proxy.clone();
    }
    if session.resource_limits.is_none() {
        session.resource_limits = pool.default_resource_limits.clone();
    }
    if let Some(env) = &pool.default_environment {
        for (k, v) in env {
            session.environment.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

/// §4.F step 3/4: does `pool` accept `session` at all, and if so what's its score?
/// `None` means the pool is skipped outright (browser/OS mismatch, or zero
/// available worker slots).
async fn score_pool(pool: &DbPool, candidate: &WorkPool, session: &Session) -> Result<Option<i64>, SchedulerError> {
    if let Some(default_browser) = candidate.default_browser {
        if default_browser != session.browser {
            return Ok(None);
        }
    }
    if let Some(default_os) = candidate.default_operating_system {
        if default_os != session.operating_system {
            return Ok(None);
        }
    }

    let available_slots = db::workers::count_available_in_pool(pool, candidate.id).await?;
    if available_slots == 0 {
        return Ok(None);
    }

    let active_sessions = db::sessions::count_active_in_pool(pool, candidate.id).await?;
    Ok(Some(10 * available_slots - active_sessions))
}

/// §4.F `Place`. Returns `true` on successful placement (session bound to a
/// pool and merged with its defaults), `false` when no pool could take it —
/// the session is left PENDING and unbound for a future placement attempt.
pub async fn place(pool: &DbPool, session_id: Uuid, requested_pool_id: Option<Uuid>) -> Result<bool, SchedulerError> {
    let Some(mut session) = db::sessions::get(pool, session_id).await? else {
        return Err(SchedulerError::Store(crate::errors::StoreError::NotFound(format!(
            "session {}",
            session_id
        ))));
    };

    if session.status != SessionStatus::Pending {
        return Err(SchedulerError::Store(crate::errors::StoreError::Conflict(
            "session is not pending placement".into(),
        )));
    }

    let target = if let Some(requested) = requested_pool_id {
        let candidate = db::work_pools::get(pool, requested)
            .await?
            .ok_or_else(|| SchedulerError::PoolNotFound(requested.to_string()))?;
        if candidate.status != crate::domain::WorkPoolStatus::Active {
            return Err(SchedulerError::PoolNotFound(requested.to_string()));
        }
        candidate
    } else {
        let candidates = db::work_pools::list(pool).await?;
        let mut best: Option<(i64, WorkPool)> = None;
        for candidate in candidates {
            if candidate.status != crate::domain::WorkPoolStatus::Active {
                continue;
            }
            let Some(score) = score_pool(pool, &candidate, &session).await? else {
                continue;
            };
            // Ties broken by lowest pool id (§4.F step 5).
            let better = match &best {
                None => true,
                Some((best_score, best_pool)) => {
                    score > *best_score || (score == *best_score && candidate.id < best_pool.id)
                }
            };
            if better {
                best = Some((score, candidate));
            }
        }
        match best {
            Some((_, candidate)) => candidate,
            None => return Ok(false),
        }
    };

    apply_pool_defaults(&mut session, &target);
    db::sessions::bind_pool(pool, session.id, target.id).await?;
    db::sessions::apply_defaults(
        pool,
        session.id,
        session.browser,
        session.version,
        session.headless,
        session.operating_system,
        session.screen.clone(),
        session.proxy.as_ref(),
        session.resource_limits.as_ref(),
        &session.environment,
    )
    .await?;

    Ok(true)
}

/// §4.F `ProvisionDirect` — optional centralized provisioning path, used only
/// by deployments that skip a separate worker agent. Same failure semantics
/// as §4.A: a launch failure marks the session FAILED and (if it had been
/// bound to a worker already) the caller is responsible for the load decrement
/// via the ordinary terminal-event path.
pub async fn provision_direct(
    pool: &DbPool,
    registry: &ProviderRegistry,
    session_id: Uuid,
) -> Result<Session, SchedulerError> {
    let session = db::sessions::get(pool, session_id)
        .await?
        .ok_or_else(|| SchedulerError::Store(crate::errors::StoreError::NotFound(format!("session {}", session_id))))?;

    let provider_type = match session.work_pool_id {
        Some(work_pool_id) => db::work_pools::get(pool, work_pool_id)
            .await?
            .map(|p| p.provider_type)
            .unwrap_or_default(),
        None => Default::default(),
    };

    let provider = registry.get(provider_type);
    let launch = provider
        .launch_container(&session)
        .await
        .map_err(|_| SchedulerError::NoAvailableWorkers);

    match launch {
        Ok(result) => {
            db::sessions::set_container_details(pool, session_id, &result.container_id, &result.ws_endpoint, &result.live_url)
                .await?;
            db::events::apply_session_event(pool, session_id, crate::domain::SessionEventType::BrowserStarted, None)
                .await?;
        }
        Err(_) => {
            db::sessions::mark_failed(pool, session_id).await?;
        }
    }

    db::sessions::get(pool, session_id)
        .await?
        .ok_or_else(|| SchedulerError::Store(crate::errors::StoreError::NotFound(format!("session {}", session_id))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Browser, BrowserVersion, OperatingSystem, Screen};
    use chrono::Utc;
    use std::collections::HashMap;

    fn sample_session() -> Session {
        Session {
            id: Uuid::nil(),
            browser: Browser::Chrome,
            version: BrowserVersion::Latest,
            operating_system: OperatingSystem::Linux,
            headless: true,
            screen: Screen::default(),
            proxy: None,
            resource_limits: None,
            environment: HashMap::new(),
            status: SessionStatus::Pending,
            work_pool_id: None,
            worker_id: None,
            container_id: None,
            ws_endpoint: None,
            live_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            expires_at: None,
        }
    }

    fn sample_pool() -> WorkPool {
        WorkPool {
            id: Uuid::nil(),
            name: "default".into(),
            provider_type: Default::default(),
            status: crate::domain::WorkPoolStatus::Active,
            default_browser: None,
            default_version: None,
            default_headless: None,
            default_operating_system: None,
            default_screen: None,
            default_proxy: None,
            default_resource_limits: Some(crate::domain::ResourceLimits { memory: Some("2G".into()), ..Default::default() }),
            default_environment: None,
            min_workers: 0,
            max_workers: 10,
            max_sessions_per_worker: 5,
            provider_config: serde_json::json!({}),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn merge_fills_unset_fields_only() {
        let mut session = sample_session();
        let pool = sample_pool();
        apply_pool_defaults(&mut session, &pool);
        assert_eq!(session.resource_limits.unwrap().memory, Some("2G".into()));
    }

    #[test]
    fn merge_does_not_override_explicit_session_value() {
        // S6: session already has resource_limits set, pool default must not clobber it.
        let mut session = sample_session();
        session.resource_limits = Some(crate::domain::ResourceLimits { memory: Some("512M".into()), ..Default::default() });
        let pool = sample_pool();
        apply_pool_defaults(&mut session, &pool);
        assert_eq!(session.resource_limits.unwrap().memory, Some("512M".into()));
    }

    #[test]
    fn merge_fills_missing_environment_keys_without_overwriting_present_ones() {
        let mut session = sample_session();
        session.environment.insert("FOO".into(), "explicit".into());
        let mut pool = sample_pool();
        let mut defaults = HashMap::new();
        defaults.insert("FOO".into(), "from_pool".into());
        defaults.insert("BAR".into(), "from_pool".into());
        pool.default_environment = Some(defaults);

        apply_pool_defaults(&mut session, &pool);
        assert_eq!(session.environment.get("FOO").unwrap(), "explicit");
        assert_eq!(session.environment.get("BAR").unwrap(), "from_pool");
    }
}
