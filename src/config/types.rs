// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! Configuration type definitions
//! All configuration structs and enums used throughout the application.

use std::net::SocketAddr;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub docker: DockerConfig,
    pub session: SessionConfig,
    pub scheduler: SchedulerConfig,
    pub worker: WorkerConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub compression: CompressionConfig,
    pub observability: ObservabilityConfig,
    pub security: SecurityConfig,
}

/// Server binding configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub listen_addr: SocketAddr,
    pub environment: Environment,
    pub server_id: String,
    pub api_key: Option<String>,
    pub secret_key: String,
    pub debug: bool,
    pub request_timeout_secs: u64,
    pub graceful_shutdown_timeout_secs: u64,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Staging,
    Development,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "staging" | "stage" => Ok(Environment::Staging),
            "development" | "dev" | "" => Ok(Environment::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Staging => write!(f, "staging"),
            Environment::Development => write!(f, "development"),
        }
    }
}

/// PostgreSQL connection configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub db: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Build a `postgres://` URL from discrete fields when `url` is unset.
    pub fn connection_string(&self) -> String {
        self.url.clone().unwrap_or_else(|| {
            format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.db
            )
        })
    }
}

/// Provider/container resource defaults (§4.A image + resource knobs)
#[derive(Debug, Clone)]
pub struct DockerConfig {
    pub registry: Option<String>,
    pub image_prefix: String,
    pub network: String,
    pub stop_timeout_secs: u64,
    pub socket_path: Option<String>,
}

/// Session lifecycle defaults (§3, §4.C)
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub default_timeout_minutes: i64,
    pub cleanup_interval_secs: u64,
}

/// Scheduler/placement tuning (§4.F, §9 — auto-scale fields are modeled, not actuated)
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub liveness_sweep_interval_secs: u64,
    pub liveness_timeout_secs: i64,
}

/// Worker agent defaults (§4.H)
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval_secs: u64,
    pub metrics_interval_secs: u64,
    pub default_capacity: i32,
}

/// Rate limiting configuration (§6, §7 RateLimited)
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_minute: u32,
    pub block_window_secs: u64,
}

/// CORS configuration (§6 middleware chain, out of core but carried as ambient stack)
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub allow_credentials: bool,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

/// Response compression configuration (§6)
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub minimum_size: u16,
}

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub json_logs: bool,
    pub metrics_enabled: bool,
    pub metrics_path: String,
}

/// Security configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub api_key_excluded_paths: Vec<String>,
    pub audit_logging: bool,
}
