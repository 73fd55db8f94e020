use crate::error::GatewayError;

/// Validates process-level configuration values.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a Redis URL.
    pub fn validate_redis_url(url: &str) -> Result<(), GatewayError> {
        if url.is_empty() {
            return Err(GatewayError::ConfigError(
                "Redis URL cannot be empty".to_string(),
            ));
        }

        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(GatewayError::ConfigError(
                "Redis URL must start with 'redis://' or 'rediss://'".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates a bind address.
    pub fn validate_bind_address(address: &str) -> Result<(), GatewayError> {
        if address.is_empty() {
            return Err(GatewayError::ConfigError(
                "Bind address cannot be empty".to_string(),
            ));
        }

        if !address.contains(':') {
            return Err(GatewayError::ConfigError(
                "Bind address must be in host:port format".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_redis_url() {
        assert!(ConfigValidator::validate_redis_url("redis://localhost:6379").is_ok());
        assert!(ConfigValidator::validate_redis_url("rediss://localhost:6379").is_ok());
    }

    #[test]
    fn test_invalid_redis_url() {
        assert!(ConfigValidator::validate_redis_url("").is_err());
        assert!(ConfigValidator::validate_redis_url("http://localhost:6379").is_err());
    }

    #[test]
    fn test_valid_bind_address() {
        assert!(ConfigValidator::validate_bind_address("127.0.0.1:8080").is_ok());
        assert!(ConfigValidator::validate_bind_address("0.0.0.0:3000").is_ok());
    }

    #[test]
    fn test_invalid_bind_address() {
        assert!(ConfigValidator::validate_bind_address("").is_err());
        assert!(ConfigValidator::validate_bind_address("localhost").is_err());
    }
}
