// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//! Placement/scheduler error types

use std::fmt;

use super::store::StoreError;

#[derive(Debug)]
pub enum SchedulerError {
    PoolNotFound(String),
    NoAvailableWorkers,
    Store(StoreError),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::PoolNotFound(id) => write!(f, "work pool not found: {}", id),
            SchedulerError::NoAvailableWorkers => write!(f, "no available workers for placement"),
            SchedulerError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<StoreError> for SchedulerError {
    fn from(err: StoreError) -> Self {
        SchedulerError::Store(err)
    }
}
