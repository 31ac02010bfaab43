// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//! Session-claim error types (§4.G)

use std::fmt;

use super::store::StoreError;

#[derive(Debug)]
pub enum ClaimError {
    WorkerNotActive,
    WorkerAtCapacity,
    NoPendingSessions,
    Store(StoreError),
}

impl fmt::Display for ClaimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimError::WorkerNotActive => write!(f, "worker is not active"),
            ClaimError::WorkerAtCapacity => write!(f, "worker is at capacity"),
            ClaimError::NoPendingSessions => write!(f, "no pending sessions to claim"),
            ClaimError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ClaimError {}

impl From<StoreError> for ClaimError {
    fn from(err: StoreError) -> Self {
        ClaimError::Store(err)
    }
}
