// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//! Configuration loading from environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use super::error::ConfigError;
use super::types::*;

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if e.not_found() {
                info!("No .env file found, using environment variables only");
            } else {
                warn!("Error loading .env file: {}", e);
            }
        }

        let host = env_or("API_HOST", "127.0.0.1");
        let port = env_parse("API_PORT", 8000u16)?;
        let listen_addr =
            format!("{}:{}", host, port)
                .parse()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "API_HOST/API_PORT".to_string(),
                    value: format!("{}:{}", host, port),
                    reason: format!("Invalid socket address: {}", e),
                })?;

        let environment = env_parse("ENVIRONMENT", Environment::Development)?;

        Ok(Config {
            server: ServerConfig {
                host: host.clone(),
                port,
                listen_addr,
                environment,
                server_id: env::var("SERVER_ID").unwrap_or_else(|_| uuid::Uuid::new_v4().to_string()),
                api_key: env::var("API_KEY").ok(),
                secret_key: env_or("SECRET_KEY", "fleet-dev-secret-change-me"),
                debug: env_parse("DEBUG", false)?,
                request_timeout_secs: env_parse("FLEET_REQUEST_TIMEOUT", 30u64)?,
                graceful_shutdown_timeout_secs: env_parse("FLEET_SHUTDOWN_TIMEOUT", 30u64)?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                user: env_or("POSTGRES_USER", "fleet"),
                password: env_or("POSTGRES_PASSWORD", "fleet"),
                host: env_or("POSTGRES_HOST", "localhost"),
                port: env_parse("POSTGRES_PORT", 5432u16)?,
                db: env_or("POSTGRES_DB", "fleet"),
                max_connections: env_parse("FLEET_DB_MAX_CONNECTIONS", 20u32)?,
                min_connections: env_parse("FLEET_DB_MIN_CONNECTIONS", 2u32)?,
                connect_timeout_secs: env_parse("FLEET_DB_CONNECT_TIMEOUT", 10u64)?,
                idle_timeout_secs: env_parse("FLEET_DB_IDLE_TIMEOUT", 600u64)?,
            },
            docker: DockerConfig {
                registry: env::var("FLEET_DOCKER_REGISTRY").ok(),
                image_prefix: env_or("FLEET_DOCKER_IMAGE_PREFIX", "browserless"),
                network: env_or("FLEET_DOCKER_NETWORK", "bridge"),
                stop_timeout_secs: env_parse("FLEET_DOCKER_STOP_TIMEOUT", 10u64)?,
                socket_path: env::var("DOCKER_HOST").ok(),
            },
            session: SessionConfig {
                default_timeout_minutes: env_parse("FLEET_SESSION_DEFAULT_TIMEOUT_MINUTES", 30i64)?,
                cleanup_interval_secs: env_parse("FLEET_SESSION_CLEANUP_INTERVAL", 60u64)?,
            },
            scheduler: SchedulerConfig {
                liveness_sweep_interval_secs: env_parse("FLEET_LIVENESS_SWEEP_INTERVAL", 60u64)?,
                liveness_timeout_secs: env_parse("FLEET_LIVENESS_TIMEOUT", 300i64)?,
            },
            worker: WorkerConfig {
                poll_interval_secs: env_parse("FLEET_WORKER_POLL_INTERVAL", 10u64)?,
                metrics_interval_secs: env_parse("FLEET_WORKER_METRICS_INTERVAL", 60u64)?,
                default_capacity: env_parse("FLEET_WORKER_DEFAULT_CAPACITY", 5i32)?,
            },
            rate_limit: RateLimitConfig {
                enabled: env_parse("RATE_LIMIT_ENABLED", true)?,
                requests_per_minute: env_parse("RATE_LIMIT_REQUESTS_PER_MINUTE", 120u32)?,
                block_window_secs: env_parse("FLEET_RATE_LIMIT_BLOCK_WINDOW", 60u64)?,
            },
            cors: CorsConfig {
                allow_origins: env_list("CORS_ALLOW_ORIGINS", vec!["*".to_string()]),
                allow_credentials: env_parse("CORS_ALLOW_CREDENTIALS", false)?,
                allow_methods: env_list(
                    "CORS_ALLOW_METHODS",
                    vec!["GET".into(), "POST".into(), "PUT".into(), "DELETE".into()],
                ),
                allow_headers: env_list("CORS_ALLOW_HEADERS", vec!["*".to_string()]),
            },
            compression: CompressionConfig {
                enabled: env_parse("GZIP_ENABLED", true)?,
                minimum_size: env_parse("GZIP_MINIMUM_SIZE", 1024u16)?,
            },
            observability: ObservabilityConfig {
                log_level: env_or("FLEET_LOG_LEVEL", "info"),
                json_logs: env_parse("FLEET_JSON_LOGS", false)?,
                metrics_enabled: env_parse("FLEET_METRICS_ENABLED", true)?,
                metrics_path: env_or("FLEET_METRICS_PATH", "/metrics"),
            },
            security: SecurityConfig {
                api_key_excluded_paths: env_list(
                    "FLEET_API_KEY_EXCLUDED_PATHS",
                    vec![
                        "/docs".to_string(),
                        "/redoc".to_string(),
                        "/openapi.json".to_string(),
                        "/health".to_string(),
                    ],
                ),
                audit_logging: env_parse("FLEET_AUDIT_LOGGING", true)?,
            },
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn is_production(&self) -> bool {
        self.server.environment == Environment::Production
    }

    pub fn is_development(&self) -> bool {
        self.server.environment == Environment::Development
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::from_env().unwrap_or_else(|_| panic!("Failed to load default configuration"))
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value.parse().map_err(|e| ConfigError::ParseError {
            key: key.to_string(),
            message: format!("{}", e),
        }),
        Err(_) => Ok(default),
    }
}

pub fn env_list(key: &str, default: Vec<String>) -> Vec<String> {
    match env::var(key) {
        Ok(value) => value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_list_splits_and_trims() {
        std::env::set_var("FLEET_TEST_LIST", "a, b ,c");
        assert_eq!(env_list("FLEET_TEST_LIST", vec![]), vec!["a", "b", "c"]);
        std::env::remove_var("FLEET_TEST_LIST");
    }

    #[test]
    fn env_list_falls_back_to_default() {
        std::env::remove_var("FLEET_TEST_LIST_MISSING");
        assert_eq!(
            env_list("FLEET_TEST_LIST_MISSING", vec!["x".to_string()]),
            vec!["x".to_string()]
        );
    }

    #[test]
    fn env_parse_rejects_bad_value() {
        std::env::set_var("FLEET_TEST_PORT", "not-a-number");
        let result: Result<u16, ConfigError> = env_parse("FLEET_TEST_PORT", 8000u16);
        assert!(result.is_err());
        std::env::remove_var("FLEET_TEST_PORT");
    }
}
