// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §4.G Claim — a worker pulls the oldest unclaimed PENDING session in its
//! pool inside a single serializable transaction:
//! 1. lock and validate the calling worker (must be claim-eligible, §4.G step 1),
//! 2. lock the oldest claimable session row with `FOR UPDATE SKIP LOCKED`
//!    (§4.G step 3; session row before worker row per §5's lock ordering —
//!    the worker row is locked first here only because its eligibility gates
//!    whether we look for a session at all, and it is re-touched, not
//!    re-locked, at step 5),
//! 3. bind the session to the worker and bump `current_load`,
//! 4. append the `session_assigned` event and advance status to STARTING
//!    is deliberately NOT done here — the worker agent emits `session_starting`
//!    itself once it begins provisioning (§4.H), keeping this endpoint a pure
//!    hand-off.

use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::domain::Session;
use crate::errors::ClaimError;

/// Attempts to hand the given worker the oldest pending session in its pool.
/// Returns `Ok(None)` when the pool has nothing to claim (not an error, per
/// §4.G's "claim is a poll, not a guarantee").
pub async fn claim_session(pool: &DbPool, worker_id: Uuid) -> Result<Option<Session>, ClaimError> {
    let mut tx = pool.begin().await?;

    let worker = db::workers::get_for_update(&mut tx, worker_id)
        .await?
        .ok_or(ClaimError::Store(crate::errors::StoreError::NotFound(format!(
            "worker {}",
            worker_id
        ))))?;

    if !worker.status.is_claimable() {
        return Err(ClaimError::WorkerNotActive);
    }
    if !worker.has_spare_capacity() {
        return Err(ClaimError::WorkerAtCapacity);
    }

    let Some(session) = db::sessions::next_claimable(&mut tx, worker.work_pool_id).await? else {
        tx.commit().await?;
        return Ok(None);
    };

    db::sessions::bind_worker(&mut tx, session.id, worker_id).await?;
    db::workers::increment_load(&mut tx, worker_id).await?;

    tx.commit().await?;

    let claimed = db::sessions::get(pool, session.id).await?;
    Ok(claimed)
}
