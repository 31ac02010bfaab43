// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//! Persistence layer error types

use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    ConnectionFailed(String),
    QueryFailed(String),
    MigrationFailed(String),
    NotFound(String),
    /// Uniqueness or state-precondition violation (§7 Conflict): pool name
    /// taken, delete-with-active-load/sessions without `force`.
    Conflict(String),
    /// Malformed request payload (§7 Validation): bad enum, bad memory
    /// literal, non-positive screen dimensions.
    Validation(String),
    NotAvailable,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ConnectionFailed(msg) => write!(f, "database connection failed: {}", msg),
            StoreError::QueryFailed(msg) => write!(f, "query failed: {}", msg),
            StoreError::MigrationFailed(msg) => write!(f, "migration failed: {}", msg),
            StoreError::NotFound(what) => write!(f, "not found: {}", what),
            StoreError::Conflict(msg) => write!(f, "conflict: {}", msg),
            StoreError::Validation(msg) => write!(f, "validation error: {}", msg),
            StoreError::NotAvailable => write!(f, "database not available"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            other => StoreError::QueryFailed(other.to_string()),
        }
    }
}
