// Fleet library
// Shared types and logic behind both the `fleet-server` and `fleet-worker` binaries.

pub mod api;
pub mod claim;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod event;
pub mod metrics_aggregate;
pub mod provider;
pub mod registry;
pub mod scheduler;
pub mod security;
pub mod worker_agent;

// Re-export commonly used types
pub use anyhow::{Context, Result};
pub use tracing::{debug, error, info, warn};
pub use uuid::Uuid;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const BUILD_TIME: &str = include_str!(concat!(env!("OUT_DIR"), "/build_time.txt"));
