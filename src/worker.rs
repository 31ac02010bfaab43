// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! `fleet-worker` — the pull-based agent binary (§4.H). Talks to
//! `fleet-server` purely over HTTP and provisions containers on its own
//! host; startup mirrors `fleet-server`'s tracing setup but has no database
//! or axum router of its own.

use fleet::worker_agent::{WorkerAgent, WorkerAgentConfig};
use fleet::{info, Result};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = WorkerAgentConfig::from_env()?;
    info!("fleet-worker {} starting", fleet::VERSION);
    info!("server: {}, work pool: {}", config.server_url, config.work_pool_id);

    let agent = WorkerAgent::bootstrap(config).await?;
    agent.run().await
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fleet=info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_target(false)
        .with_level(true)
        .with_thread_ids(true)
        .init();
}
