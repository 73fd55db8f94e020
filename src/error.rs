//! # Error Types and Handling
//!
//! This module defines the custom error type for Tollgate and its automatic
//! conversion to HTTP responses.
//!
//! ## Error to HTTP Status Mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error → HTTP Status Mapping                          │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  GatewayError Variant        │  HTTP Status        │  Response Type    │
//! │  ────────────────────────────┼─────────────────────┼───────────────────│
//! │  RateLimitExceeded           │  429 Too Many Reqs  │  + Retry-After    │
//! │  ValidationError             │  400 Bad Request    │  JSON error       │
//! │  Unauthorized                │  401 Unauthorized    │  JSON error       │
//! │  Forbidden                   │  403 Forbidden       │  JSON error       │
//! │  ConfigError                 │  400 Bad Request    │  JSON error       │
//! │  StoreError                  │  500 Internal Error │  Generic error    │
//! │  InternalError               │  500 Internal Error │  Generic error    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `StoreError` exists for the admin surface, where a write must be able to
//! report failure. The admission path never produces it: KV adapters are
//! infallible at their public signature, so the bucket engine can't observe
//! a store error in the first place.
//!
//! ## Automatic Conversions
//!
//! - `redis::RedisError` → `GatewayError::StoreError`
//! - `serde_json::Error` → `GatewayError::ConfigError`
//!
//! ## Axum Integration
//!
//! ```rust,ignore
//! async fn handler() -> Result<impl IntoResponse, GatewayError> {
//!     Err(GatewayError::ValidationError("invalid key".to_string()))
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

/// Custom error type for all Tollgate operations.
///
/// Each variant maps to an appropriate HTTP status code when converted to
/// an Axum response via [`IntoResponse`].
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// The rate limit was exceeded for the requested key.
    /// Maps to: 429 Too Many Requests (with Retry-After header)
    RateLimitExceeded {
        /// Seconds until more tokens are available.
        retry_after: u64,
        /// Maximum allowed requests in the current window.
        limit: u64,
    },

    /// Request validation failed (malformed key, missing field, etc.).
    /// Maps to: 400 Bad Request
    ValidationError(String),

    /// Missing or invalid bearer credential.
    /// Maps to: 401 Unauthorized
    Unauthorized(String),

    /// Valid credential, insufficient role.
    /// Maps to: 403 Forbidden
    Forbidden(String),

    /// Configuration document is invalid or missing a required field.
    /// Maps to: 400 Bad Request
    ConfigError(String),

    /// The KV store reported an error the caller must react to. Only used
    /// by the admin surface; the admission path never raises this.
    /// Maps to: 500 Internal Server Error
    StoreError(String),

    /// Unexpected internal error.
    /// Maps to: 500 Internal Server Error
    InternalError(String),
}

impl std::error::Error for GatewayError {}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::RateLimitExceeded { retry_after, limit } => {
                write!(f, "rate limit exceeded: {} requests allowed, retry after {}s", limit, retry_after)
            }
            GatewayError::ValidationError(msg) => write!(f, "validation error: {}", msg),
            GatewayError::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            GatewayError::Forbidden(msg) => write!(f, "forbidden: {}", msg),
            GatewayError::ConfigError(msg) => write!(f, "configuration error: {}", msg),
            GatewayError::StoreError(msg) => write!(f, "store error: {}", msg),
            GatewayError::InternalError(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            GatewayError::RateLimitExceeded { retry_after, limit } => (
                StatusCode::TOO_MANY_REQUESTS,
                serde_json::json!({
                    "error": "rate_limit_exceeded",
                    "message": self.to_string(),
                    "retry_after_seconds": retry_after,
                    "limit": limit,
                }),
            ),
            GatewayError::ValidationError(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "validation_error",
                    "message": self.to_string(),
                }),
            ),
            GatewayError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({
                    "error": "unauthorized",
                    "message": self.to_string(),
                }),
            ),
            GatewayError::Forbidden(_) => (
                StatusCode::FORBIDDEN,
                serde_json::json!({
                    "error": "forbidden",
                    "message": self.to_string(),
                }),
            ),
            GatewayError::ConfigError(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "configuration_error",
                    "message": self.to_string(),
                }),
            ),
            GatewayError::StoreError(_) | GatewayError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({
                    "error": "internal_error",
                    "message": "An unexpected error occurred",
                }),
            ),
        };

        let mut response = (status, Json(body)).into_response();

        if let GatewayError::RateLimitExceeded { retry_after, limit } = &self {
            let headers = response.headers_mut();
            if let Ok(val) = retry_after.to_string().parse() {
                headers.insert("Retry-After", val);
            }
            if let Ok(val) = limit.to_string().parse() {
                headers.insert("X-RateLimit-Limit", val);
            }
        }

        response
    }
}

impl From<redis::RedisError> for GatewayError {
    fn from(err: redis::RedisError) -> Self {
        GatewayError::StoreError(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
