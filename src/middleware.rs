use crate::handlers::SharedState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{info, warn};

/// Logging middleware that tracks request duration and basic metrics.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_success() {
        info!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            duration_ms = duration.as_millis(),
            "request completed"
        );
    } else {
        warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            duration_ms = duration.as_millis(),
            "request completed with error"
        );
    }

    response
}

/// Paths that never go through admission, mirroring the original
/// prototype's middleware skip-list (there, also `/docs`, `/redoc`, and
/// `/openapi.json` — FastAPI-generated routes this gateway doesn't have).
const SKIP_PATHS: &[&str] = &["/health", "/ready", "/admin/login", "/auth/token"];

/// Authenticates the caller, then runs the admission check for every
/// route not in [`SKIP_PATHS`]. Rejects with 401 if no valid bearer token
/// is present, or 429 if the admission facade denies the request.
pub async fn rate_limit_middleware(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if SKIP_PATHS.contains(&path.as_str()) {
        return next.run(request).await;
    }

    let user_id = match state.tokens.authenticate(request.headers()).await {
        Ok(user_id) => user_id,
        Err(err) => return err.into_response(),
    };

    let method = request.method().as_str().to_string();
    let allowed = state.admission.is_allowed(&user_id, &path, &method).await;

    if !allowed {
        let remaining = state.admission.get_remaining(&user_id, &path, &method).await;
        return crate::error::GatewayError::RateLimitExceeded {
            retry_after: 60,
            limit: remaining.max_tokens,
        }
        .into_response();
    }

    next.run(request).await
}
