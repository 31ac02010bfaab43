// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! Configuration validation

use tracing::warn;

use super::error::ConfigError;
use super::types::{Config, Environment};

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                value: "0".to_string(),
                reason: "Port cannot be 0".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "FLEET_DB_MAX_CONNECTIONS".to_string(),
                value: "0".to_string(),
                reason: "Max connections cannot be 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::InvalidValue {
                key: "FLEET_DB_MIN_CONNECTIONS".to_string(),
                value: self.database.min_connections.to_string(),
                reason: "Min connections cannot exceed max connections".to_string(),
            });
        }

        if self.worker.default_capacity <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "FLEET_WORKER_DEFAULT_CAPACITY".to_string(),
                value: self.worker.default_capacity.to_string(),
                reason: "Worker default capacity must be positive".to_string(),
            });
        }

        if self.scheduler.liveness_timeout_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "FLEET_LIVENESS_TIMEOUT".to_string(),
                value: self.scheduler.liveness_timeout_secs.to_string(),
                reason: "Liveness timeout must be positive".to_string(),
            });
        }

        if self.session.default_timeout_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "FLEET_SESSION_DEFAULT_TIMEOUT_MINUTES".to_string(),
                value: self.session.default_timeout_minutes.to_string(),
                reason: "Session default timeout must be positive".to_string(),
            });
        }

        if self.server.environment == Environment::Production {
            if self.server.secret_key == "fleet-dev-secret-change-me" {
                warn!("SECRET_KEY is set to the development default in production!");
            }
            if self.server.api_key.is_none() {
                warn!("API_KEY is unset in production - all requests will be rejected by the auth middleware");
            }
            if !self.rate_limit.enabled {
                warn!("Rate limiting is disabled in production!");
            }
            if !self.security.audit_logging {
                warn!("Audit logging is disabled in production");
            }
            if self.server.debug {
                warn!("DEBUG is enabled in production");
            }
            if self.cors.allow_origins.iter().any(|o| o == "*") {
                warn!("CORS allows all origins in production");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::{env_or, env_parse};

    fn base_config() -> Config {
        Config::from_env().expect("default config should load")
    }

    #[test]
    fn rejects_zero_port() {
        let mut cfg = base_config();
        cfg.server.port = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_min_exceeding_max_connections() {
        let mut cfg = base_config();
        cfg.database.min_connections = 50;
        cfg.database.max_connections = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_default_config() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
        let _ = env_or("unused", "unused");
        let _: Result<u16, ConfigError> = env_parse("unused", 0);
    }
}
