// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! Database connection pool and migration bootstrap.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::errors::StoreError;

pub type DbPool = PgPool;

pub struct PoolOptions {
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

pub async fn init_pool(database_url: &str, opts: PoolOptions) -> Result<DbPool, StoreError> {
    info!("Connecting to PostgreSQL database...");

    let pool = PgPoolOptions::new()
        .max_connections(opts.max_connections)
        .min_connections(opts.min_connections)
        .acquire_timeout(opts.connect_timeout)
        .idle_timeout(opts.idle_timeout)
        .connect(database_url)
        .await
        .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Applies the single bundled migration file, exactly as the teacher's
/// `db::pool::run_migrations` does — no migration-tool dependency.
pub async fn run_migrations(pool: &DbPool) -> Result<(), StoreError> {
    info!("Running database migrations...");
    let migration_sql = include_str!("../../migrations/001_initial.sql");
    sqlx::raw_sql(migration_sql)
        .execute(pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
    info!("Database migrations completed successfully");
    Ok(())
}
