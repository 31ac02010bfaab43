// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! Pure event → status mapping (§4.B). No I/O: `db::events::apply_session_event`
//! wraps `should_update`/`SessionEventType::inferred_status` in the transaction
//! that appends the event row and, on a terminal transition, decrements the
//! bound worker's `current_load`.

use crate::domain::{SessionEventType, SessionStatus};

/// `should_update(current, new) := rank(new) > rank(current)`.
pub fn should_update(current: SessionStatus, new: SessionStatus) -> bool {
    new.rank() > current.rank()
}

/// Resolve the status transition (if any) implied by applying `event` to a
/// session currently in `current`. Returns `None` when the event carries no
/// status (SESSION_IDLE/SESSION_ACTIVE) or when applying it would regress
/// rank (§4.B step 2 / P2).
pub fn resolve_transition(current: SessionStatus, event: SessionEventType) -> Option<SessionStatus> {
    let candidate = event.inferred_status()?;
    should_update(current, candidate).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionEventType::*;
    use crate::domain::SessionStatus::*;

    #[test]
    fn forward_transition_applies() {
        assert_eq!(resolve_transition(Pending, SessionStarting), Some(Starting));
        assert_eq!(resolve_transition(Starting, BrowserStarted), Some(Running));
    }

    #[test]
    fn regression_is_ignored() {
        // S3: a completed session ignores a late session_starting event.
        assert_eq!(resolve_transition(Completed, SessionStarting), None);
        assert_eq!(resolve_transition(Running, SessionCreated), None);
    }

    #[test]
    fn idle_and_active_never_change_status() {
        assert_eq!(resolve_transition(Running, SessionIdle), None);
        assert_eq!(resolve_transition(Running, SessionActive), None);
    }

    #[test]
    fn repeating_terminal_event_is_a_no_op() {
        assert_eq!(resolve_transition(Completed, SessionCompleted), None);
        assert_eq!(resolve_transition(Crashed, SessionCrashed), None);
    }

    #[test]
    fn equal_rank_terminal_statuses_do_not_cross_update() {
        // Crashed and TimedOut share rank 3; neither "advances" into the other.
        assert_eq!(resolve_transition(Crashed, SessionTimedOut), None);
    }
}
