//! # Process Configuration
//!
//! `GatewayConfig` holds process-level settings: bind address, Redis URL,
//! admin credentials, and default logging level. It is loaded once at
//! startup from environment variables (with `.env` support via `dotenv`)
//! and does not change for the lifetime of the process — unlike
//! [`crate::rate_limit_config::ConfigSnapshot`], which is hot-swappable.

use crate::config_validator::ConfigValidator;
use crate::error::GatewayError;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_address: String,
    pub redis_url: Option<String>,
    pub admin_username: String,
    pub admin_password: String,
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            redis_url: None,
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from the environment, falling back to
    /// defaults for anything unset. `dotenv().ok()` is called by the
    /// caller (in `main`) before this runs, so a `.env` file in the
    /// working directory is picked up the same way.
    pub fn from_env() -> Result<Self, GatewayError> {
        let host = std::env::var("GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("GATEWAY_PORT").unwrap_or_else(|_| "8000".to_string());
        let bind_address = format!("{}:{}", host, port);

        let redis_url = std::env::var("REDIS_URL").ok().or_else(|| {
            std::env::var("REDIS_HOST").ok().map(|redis_host| {
                let redis_port = std::env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
                format!("redis://{}:{}", redis_host, redis_port)
            })
        });

        let admin_username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let admin_password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        ConfigValidator::validate_bind_address(&bind_address)?;
        if let Some(url) = &redis_url {
            ConfigValidator::validate_redis_url(url)?;
        }

        Ok(Self {
            bind_address,
            redis_url,
            admin_username,
            admin_password,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_environment() {
        let config = GatewayConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0:8000");
        assert!(config.redis_url.is_none());
    }
}
