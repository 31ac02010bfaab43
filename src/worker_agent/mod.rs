// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! §4.H worker agent: HTTP client to `fleet-server`, environment-driven
//! config, and the main loop itself.

pub mod agent;
pub mod client;
pub mod config;

pub use agent::WorkerAgent;
pub use client::{ClaimOutcome, FleetClient};
pub use config::WorkerAgentConfig;
