//! # Rate Limit Policy Configuration
//!
//! `ConfigSnapshot` is the document persisted at the `rate_limit_config`
//! key and hot-swappable at runtime. It is distinct from
//! [`crate::config::GatewayConfig`], which holds process-level settings
//! (bind address, Redis URL) loaded once at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single `{requests_per_minute, burst_size}` pair. Each field is
/// independently optional so a user override or endpoint rule can
/// specify only one of the two and fall back to the default for the
/// other, per the precedence rules in [`resolve`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RateLimit {
    pub requests_per_minute: Option<u64>,
    pub burst_size: Option<u64>,
}

/// The full rate-limit policy document.
///
/// `extra` captures any top-level JSON keys this type doesn't know about
/// so that a round-trip through `get`/`update` preserves them, even
/// though resolution ignores them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub default_requests_per_minute: u64,
    pub default_burst_size: Option<u64>,
    #[serde(default)]
    pub endpoints: HashMap<String, HashMap<String, RateLimit>>,
    #[serde(default)]
    pub user_overrides: HashMap<String, RateLimit>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            default_requests_per_minute: 60,
            default_burst_size: Some(10),
            endpoints: HashMap::new(),
            user_overrides: HashMap::new(),
            extra: serde_json::Map::new(),
        }
    }
}

impl ConfigSnapshot {
    /// Accepted only if the two required fields are present, mirroring
    /// the admin surface's validation: a config update missing
    /// `default_requests_per_minute` or `endpoints` is rejected and the
    /// in-process snapshot is left unchanged.
    pub fn validate(value: &serde_json::Value) -> Result<(), String> {
        let obj = value
            .as_object()
            .ok_or_else(|| "configuration must be a JSON object".to_string())?;

        if !obj.contains_key("default_requests_per_minute") {
            return Err("missing field: default_requests_per_minute".to_string());
        }
        if !obj.contains_key("endpoints") {
            return Err("missing field: endpoints".to_string());
        }

        Ok(())
    }

    fn default_burst(&self) -> u64 {
        self.default_burst_size.unwrap_or(10)
    }
}

/// Resolved bucket parameters for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLimit {
    pub requests_per_minute: u64,
    pub burst_size: u64,
}

/// Picks `(requests_per_minute, burst_size)` for a request.
///
/// Precedence, first match wins:
/// 1. `user_overrides[user_id]` — a full shadow; each field independently
///    falls back to the snapshot default when absent.
/// 2. `endpoints[endpoint][method]` — same per-field fallback.
/// 3. `(default_requests_per_minute, default_burst_size or 10)`.
///
/// Path matching is exact string equality; method matching is
/// case-sensitive, matching the HTTP verb as received.
pub fn resolve(snapshot: &ConfigSnapshot, user_id: &str, endpoint: &str, method: &str) -> ResolvedLimit {
    if let Some(user_limit) = snapshot.user_overrides.get(user_id) {
        return ResolvedLimit {
            requests_per_minute: user_limit
                .requests_per_minute
                .unwrap_or(snapshot.default_requests_per_minute),
            burst_size: user_limit.burst_size.unwrap_or_else(|| snapshot.default_burst()),
        };
    }

    if let Some(method_limit) = snapshot
        .endpoints
        .get(endpoint)
        .and_then(|methods| methods.get(method))
    {
        return ResolvedLimit {
            requests_per_minute: method_limit
                .requests_per_minute
                .unwrap_or(snapshot.default_requests_per_minute),
            burst_size: method_limit.burst_size.unwrap_or_else(|| snapshot.default_burst()),
        };
    }

    ResolvedLimit {
        requests_per_minute: snapshot.default_requests_per_minute,
        burst_size: snapshot.default_burst(),
    }
}
