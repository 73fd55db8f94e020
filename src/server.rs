//! # HTTP Server Module
//!
//! Builds the Axum router and runs it with graceful shutdown, the way
//! `throttler::server` does for its own route set. The routes and
//! middleware stack here implement SPEC_FULL's external HTTP surface;
//! the admission engine itself lives in [`crate::admission`].
//!
//! ## Graceful Shutdown
//!
//! Listens for `SIGINT` (Ctrl+C) and, on Unix, `SIGTERM`. In-flight
//! requests are allowed to complete before the server exits.

use crate::admission::Admission;
use crate::auth::TokenStore;
use crate::config::GatewayConfig;
use crate::handlers::{
    admin_login, create_data, create_user, create_user_token, get_config, get_data, get_stats,
    get_user_stats, get_users, health_check, readiness_check, reset_user, update_config,
};
use crate::kv::{InMemoryKvStore, KvStore, RedisKvStore};
use crate::middleware::{logging_middleware, rate_limit_middleware};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state handed to every handler and to the rate
/// limiting middleware via `with_state`.
pub struct AppState {
    pub config: GatewayConfig,
    pub store: Arc<dyn KvStore>,
    pub admission: Admission,
    pub tokens: TokenStore,
}

/// Connects to Redis if a URL is configured, otherwise falls back to the
/// in-memory store — the same "local mode when Redis is absent" posture
/// the teacher's `RateLimiter::new` takes.
async fn build_store(config: &GatewayConfig) -> Arc<dyn KvStore> {
    match &config.redis_url {
        Some(url) => match RedisKvStore::connect(url).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(error = %e, "failed to connect to Redis, falling back to in-memory store");
                Arc::new(InMemoryKvStore::new())
            }
        },
        None => {
            tracing::info!("no REDIS_URL configured, running with an in-memory store");
            Arc::new(InMemoryKvStore::new())
        }
    }
}

/// Builds the configured Axum router with all routes, middleware, and
/// shared state wired up.
pub async fn create_app(config: GatewayConfig) -> Router {
    let store = build_store(&config).await;
    let admission = Admission::connect(store.clone()).await;
    let tokens = TokenStore::new();

    let state = Arc::new(AppState {
        config,
        store,
        admission,
        tokens,
    });

    let protected = Router::new()
        .route("/api/users", get(get_users).post(create_user))
        .route("/api/data", get(get_data).post(create_data))
        .route("/admin/config", get(get_config).post(update_config))
        .route("/admin/stats", get(get_stats))
        .route("/admin/user/:user_id/stats", get(get_user_stats))
        .route("/admin/user/:user_id/reset", post(reset_user))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/admin/login", post(admin_login))
        .route("/auth/token", post(create_user_token))
        .merge(protected)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(logging_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// HTTP server wrapper binding the configured address and running the
/// Axum app until a shutdown signal is received.
pub struct Server {
    app: Router,
    bind_address: String,
}

impl Server {
    pub async fn new(config: GatewayConfig) -> Self {
        let bind_address = config.bind_address.clone();
        let app = create_app(config).await;
        Self { app, bind_address }
    }

    pub async fn run(self) -> Result<(), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;

        tracing::info!("tollgate listening on {}", self.bind_address);
        tracing::info!("health check available at /health");
        tracing::info!("readiness check available at /ready");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("received terminate signal, initiating graceful shutdown");
        },
    }
}
