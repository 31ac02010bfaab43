// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! `fleet-server` — the central scheduler/API binary. Startup sequence
//! generalizes the teacher's `noxterm.rs::main`: tracing init, config load,
//! Docker connect, Postgres pool + migrations, then the axum server.
//! Unlike the teacher, the database and Docker connections are not optional
//! here — Fleet has no in-memory fallback store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use fleet::api::middleware::build_rate_limiter;
use fleet::api::{build_router, AppState};
use fleet::config::Config;
use fleet::db;
use fleet::provider::docker::DockerProvider;
use fleet::provider::{Provider, ProviderRegistry};
use fleet::registry::WorkerRegistry;
use fleet::{error, info, warn, Result};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    if let Err(e) = config.validate() {
        warn!("configuration warning: {}", e);
    }

    info!("fleet-server {} starting", fleet::VERSION);
    info!("environment: {}", config.server.environment);

    let pool_opts = db::pool::PoolOptions {
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        connect_timeout: Duration::from_secs(config.database.connect_timeout_secs),
        idle_timeout: Duration::from_secs(config.database.idle_timeout_secs),
    };
    let pool = db::pool::init_pool(&config.database.connection_string(), pool_opts).await?;
    info!("connected to postgres, running migrations");
    db::pool::run_migrations(&pool).await?;

    let docker = DockerProvider::connect(config.docker.clone()).map_err(|e| anyhow::anyhow!("docker connect failed: {}", e))?;
    docker.start().await.map_err(|e| anyhow::anyhow!("docker start failed: {}", e))?;
    info!("docker provider ready");

    let providers = Arc::new(ProviderRegistry::new(docker));

    let workers = Arc::new(WorkerRegistry::new(
        pool.clone(),
        config.scheduler.liveness_sweep_interval_secs,
        config.scheduler.liveness_timeout_secs,
    ));
    workers.clone().spawn_liveness_sweeper();

    let limiter = build_rate_limiter(config.rate_limit.requests_per_minute);

    let config = Arc::new(config);
    spawn_cleanup_task(pool.clone(), config.session.cleanup_interval_secs);

    let state = AppState { db: pool, config: config.clone(), providers, workers, limiter };
    let router = build_router(state);

    let addr = config.server.listen_addr;
    info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to {}: {}", addr, e))?;

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fleet=info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_target(false)
        .with_level(true)
        .with_thread_ids(true)
        .init();
}

fn spawn_cleanup_task(pool: db::DbPool, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            match db::cleanup::run_all(&pool).await {
                Ok(stats) if stats.total() > 0 => info!("cleanup pass: {:?}", stats),
                Ok(_) => {}
                Err(e) => error!("cleanup pass failed: {}", e),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining");
}
