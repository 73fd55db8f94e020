//! # Tollgate - A Token-Bucket API Gateway
//!
//! Tollgate is an HTTP API gateway that enforces per-user, per-endpoint
//! request admission using a token-bucket policy, backed by a shared
//! key-value store so that multiple gateway instances converge on one view
//! of each bucket.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────────────┐     ┌─────────────┐
//! │   Client    │────▶│     Tollgate Gateway     │────▶│    Redis    │
//! │  (callers)  │     │                          │     │  (buckets,  │
//! └─────────────┘     └──────────────────────────┘     │   stats,    │
//!                                  │                    │   config)   │
//!                     ┌────────────┼────────────┐       └─────────────┘
//!                     ▼            ▼            ▼
//!                ┌─────────┐ ┌──────────┐ ┌──────────┐
//!                │ Bucket  │ │  Config  │ │  Stats   │
//!                │ Engine  │ │ Resolver │ │ Recorder │
//!                └─────────┘ └──────────┘ └──────────┘
//! ```
//!
//! ## Core Components
//!
//! - **[`server::Server`]** - HTTP server built on Axum with graceful shutdown
//! - **[`admission::Admission`]** - Admission facade wiring config, bucket
//!   engine, and stats recorder behind `is_allowed`/`get_remaining`/
//!   `reset_user`/`get_stats`/`get_user_stats`/`update_config`
//! - **[`bucket`]** - Token bucket algorithm: load, refill, admit-or-reject, persist
//! - **[`kv::KvStore`]** - Narrow async contract over the shared store (Redis or in-memory)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tollgate::{config::GatewayConfig, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::from_env()?;
//!     let server = Server::new(config).await;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request Flow
//!
//! 1. HTTP request arrives at the Axum server.
//! 2. [`middleware::rate_limit_middleware`] authenticates the caller and
//!    asks the [`admission::Admission`] facade whether to admit the request.
//! 3. The facade resolves bucket parameters via [`rate_limit_config::resolve`],
//!    runs the token-bucket step in [`bucket`], and records the outcome in
//!    [`stats`].
//! 4. The chassis forwards to the upstream handler or replies 429.
//!
//! ## Storage Modes
//!
//! | Mode        | Use Case                        | State Persistence |
//! |-------------|----------------------------------|--------------------|
//! | In-memory   | Tests, no `REDIS_URL` configured | Process-local      |
//! | Redis       | Production, multiple instances   | Shared, convergent |
//!
//! ## Module Organization
//!
//! - [`admission`] - Public admission facade (`is_allowed`, `get_remaining`, ...)
//! - [`auth`] - Demo bearer-token stand-in guarding the `/admin/*` surface
//! - [`bucket`] - Token bucket algorithm and its persistence protocol
//! - [`config`] - Process-level configuration (bind address, Redis URL)
//! - [`config_validator`] - Validation helpers for process configuration
//! - [`error`] - `GatewayError` and its HTTP status mapping
//! - [`handlers`] - HTTP request handlers for all routes
//! - [`kv`] - KV store adapter (`RedisKvStore`, `InMemoryKvStore`)
//! - [`middleware`] - Logging and rate-limiting Axum middleware
//! - [`rate_limit_config`] - Rate-limit policy document and precedence resolver
//! - [`server`] - HTTP server setup and routing
//! - [`stats`] - Per-minute admission counters

pub mod admission;
pub mod auth;
pub mod bucket;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod handlers;
pub mod kv;
pub mod middleware;
pub mod rate_limit_config;
pub mod server;
pub mod stats;

// Re-export commonly used types
pub use admission::Admission;
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use rate_limit_config::ConfigSnapshot;

/// Result type alias for gateway operations that can fail (the admission
/// path itself never does — see [`kv::KvStore`]).
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Version of the tollgate library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
