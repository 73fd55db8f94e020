//! # HTTP Request Handlers
//!
//! ## Handler Overview
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                           Request Handlers                             │
//! ├────────────────────────────────────────────────────────────────────────┤
//! │  Health:        GET  /health, /ready                                   │
//! │  Example API:   GET/POST /api/users, /api/data   (behind admission)    │
//! │  Admin auth:    POST /admin/login                                      │
//! │  Admin CRUD:    GET/POST /admin/config                                 │
//! │                 GET  /admin/stats                                      │
//! │                 GET  /admin/user/:user_id/stats                        │
//! │                 POST /admin/user/:user_id/reset                        │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All handlers return `Result<impl IntoResponse, GatewayError>`, where
//! `GatewayError` automatically converts to the appropriate HTTP status.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::rate_limit_config::ConfigSnapshot;
use crate::server::AppState;

pub type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

pub async fn readiness_check(State(state): State<SharedState>) -> impl IntoResponse {
    let mode = if state.config.redis_url.is_some() {
        "redis"
    } else {
        "in-memory"
    };

    (
        StatusCode::OK,
        Json(json!({ "status": "ready", "store": mode })),
    )
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

pub async fn admin_login(
    State(state): State<SharedState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let token = state
        .tokens
        .login_admin(&state.config, &body.username, &body.password)
        .await?;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct UserTokenRequest {
    pub user_id: String,
}

/// Issues a demo user-role bearer token for an arbitrary `user_id`,
/// standing in for real credential issuance so callers exercising the
/// protected example endpoints have something to send as
/// `Authorization: Bearer ...`.
pub async fn create_user_token(
    State(state): State<SharedState>,
    Json(body): Json<UserTokenRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    if body.user_id.trim().is_empty() {
        return Err(GatewayError::ValidationError("user_id required".to_string()));
    }

    let token = state.tokens.issue_user_token(&body.user_id).await;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

pub async fn get_config(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    state.tokens.authenticate_admin(&headers).await?;

    let snapshot = match state.store.get(crate::admission::CONFIG_KEY).await {
        Some(raw) => serde_json::from_str::<serde_json::Value>(&raw)?,
        None => serde_json::to_value(ConfigSnapshot::default())?,
    };

    Ok(Json(snapshot))
}

pub async fn update_config(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, GatewayError> {
    state.tokens.authenticate_admin(&headers).await?;

    ConfigSnapshot::validate(&body).map_err(GatewayError::ConfigError)?;
    let snapshot: ConfigSnapshot = serde_json::from_value(body)?;

    state
        .store
        .set(crate::admission::CONFIG_KEY, &serde_json::to_string(&snapshot)?, None)
        .await;
    state.admission.update_config(snapshot).await;

    Ok(Json(json!({ "message": "Configuration updated successfully" })))
}

pub async fn get_stats(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    state.tokens.authenticate_admin(&headers).await?;

    let rows = state.admission.get_stats().await;
    let global_stats: Vec<_> = rows
        .into_iter()
        .map(|row| json!({ "minute": row.minute, "total": row.total, "allowed": row.allowed, "blocked": row.blocked }))
        .collect();

    Ok(Json(json!({ "global_stats": global_stats })))
}

pub async fn get_user_stats(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    state.tokens.authenticate_admin(&headers).await?;

    let (rows, buckets) = state.admission.get_user_stats(&user_id).await;
    let user_stats: Vec<_> = rows
        .into_iter()
        .map(|row| json!({ "minute": row.minute, "total": row.total, "allowed": row.allowed, "blocked": row.blocked }))
        .collect();
    let current_buckets: serde_json::Map<String, serde_json::Value> = buckets
        .into_iter()
        .map(|(key, snap)| {
            (
                key,
                json!({ "tokens": snap.tokens, "last_refill": snap.last_refill }),
            )
        })
        .collect();

    Ok(Json(json!({
        "user_id": user_id,
        "user_stats": user_stats,
        "current_buckets": current_buckets,
    })))
}

pub async fn reset_user(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    state.tokens.authenticate_admin(&headers).await?;

    state.admission.reset_user(&user_id).await;

    Ok(Json(json!({ "message": format!("Reset rate limits for user {}", user_id) })))
}

/// Example upstream endpoint standing in for a real protected resource.
pub async fn get_users() -> impl IntoResponse {
    Json(json!({
        "users": [
            { "id": 1, "name": "John Doe", "email": "john@example.com" },
            { "id": 2, "name": "Jane Smith", "email": "jane@example.com" },
        ]
    }))
}

pub async fn create_user(Json(body): Json<serde_json::Value>) -> impl IntoResponse {
    Json(json!({
        "message": "User created successfully",
        "user": {
            "id": 3,
            "name": body.get("name").and_then(|v| v.as_str()).unwrap_or("Unknown"),
            "email": body.get("email").and_then(|v| v.as_str()).unwrap_or("unknown@example.com"),
        }
    }))
}

pub async fn get_data() -> impl IntoResponse {
    Json(json!({
        "data": [
            { "id": 1, "value": "sample data 1" },
            { "id": 2, "value": "sample data 2" },
        ]
    }))
}

pub async fn create_data(Json(body): Json<serde_json::Value>) -> impl IntoResponse {
    Json(json!({
        "message": "Data created successfully",
        "data": {
            "id": 10,
            "value": body.get("value").and_then(|v| v.as_str()).unwrap_or("default value"),
        }
    }))
}
