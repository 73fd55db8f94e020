//! # Demo Auth Stand-in
//!
//! The spec keeps credential verification out of CORE scope and only
//! requires that the chassis hand the admission facade a `user_id`. This
//! module reduces `gateway/auth.py`'s JWT-based login to a minimal
//! in-process bearer token store: `/admin/login` mints an opaque token
//! carrying a role, and `/admin/*` handlers check it. Not JWT, not meant
//! for production — a placeholder for an auth layer a real deployment
//! would swap in.

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use axum::http::HeaderMap;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone)]
struct Issued {
    user_id: String,
    role: Role,
}

/// In-memory token store. Tokens never expire in this stand-in; a real
/// deployment would replace this module entirely rather than extend it.
#[derive(Default)]
pub struct TokenStore {
    issued: RwLock<HashMap<String, Issued>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn mint(&self, user_id: &str, role: Role) -> String {
        let token = Uuid::new_v4().to_string();
        self.issued.write().await.insert(
            token.clone(),
            Issued {
                user_id: user_id.to_string(),
                role,
            },
        );
        token
    }

    /// Verifies the admin username/password pair against `GatewayConfig`
    /// and mints an admin-role token, mirroring `/admin/login` in the
    /// original prototype.
    pub async fn login_admin(
        &self,
        config: &GatewayConfig,
        username: &str,
        password: &str,
    ) -> Result<String, GatewayError> {
        if username == config.admin_username && password == config.admin_password {
            Ok(self.mint(username, Role::Admin).await)
        } else {
            Err(GatewayError::Unauthorized("invalid credentials".to_string()))
        }
    }

    /// Issues a user-role token for an opaque `user_id`, used by the
    /// example upstream endpoints behind the admission middleware.
    pub async fn issue_user_token(&self, user_id: &str) -> String {
        self.mint(user_id, Role::User).await
    }

    async fn lookup(&self, token: &str) -> Option<(String, Role)> {
        self.issued
            .read()
            .await
            .get(token)
            .map(|issued| (issued.user_id.clone(), issued.role))
    }

    /// Extracts and verifies a bearer token from the `Authorization`
    /// header, returning the carried `user_id`.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<String, GatewayError> {
        let (user_id, _role) = self.extract(headers).await?;
        Ok(user_id)
    }

    /// Same as [`authenticate`](Self::authenticate) but additionally
    /// requires the admin role, mirroring the `role != "admin"` checks
    /// guarding every `/admin/*` handler in `gateway/main.py`.
    pub async fn authenticate_admin(&self, headers: &HeaderMap) -> Result<String, GatewayError> {
        let (user_id, role) = self.extract(headers).await?;
        if role != Role::Admin {
            return Err(GatewayError::Forbidden("admin access required".to_string()));
        }
        Ok(user_id)
    }

    async fn extract(&self, headers: &HeaderMap) -> Result<(String, Role), GatewayError> {
        let header = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| GatewayError::Unauthorized("authentication required".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| GatewayError::Unauthorized("expected a Bearer token".to_string()))?;

        self.lookup(token)
            .await
            .ok_or_else(|| GatewayError::Unauthorized("invalid token".to_string()))
    }
}
