//! Authorization evaluator configuration.
//!
//! # Configuration
//!
//! - `AUTHZ_MODE`: `static` or `dynamic` (default: `static`)
//! - `PERMISSION_CACHE_TTL_SECS`: role permission cache lifetime in seconds
//!   (default: 300)
//!
//! Static mode answers checks from the fixed in-process role tables and
//! needs no store. Dynamic mode resolves permissions through the role
//! store and caches the result per role for the configured TTL.

use std::time::Duration;

/// Which strategy the evaluator uses to resolve a role's permissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Fixed in-process tables keyed by the legacy role enum.
    Static,
    /// Role/permission store lookups with per-role caching.
    Dynamic,
}

impl EvaluationMode {
    /// Parses a mode name, case-insensitively. Unknown values fall back to
    /// `Static`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "dynamic" => EvaluationMode::Dynamic,
            _ => EvaluationMode::Static,
        }
    }
}

/// Authorization configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthzConfig {
    /// Evaluation strategy.
    pub mode: EvaluationMode,

    /// How long a role's resolved permission set stays cached in dynamic
    /// mode.
    pub cache_ttl: Duration,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            mode: EvaluationMode::Static,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

impl AuthzConfig {
    /// Creates an `AuthzConfig` from environment variables.
    ///
    /// Falls back to defaults if variables are unset or unparseable.
    ///
    /// # Environment Variables
    ///
    /// - `AUTHZ_MODE`: Default `static`
    /// - `PERMISSION_CACHE_TTL_SECS`: Default 300
    #[must_use]
    pub fn from_env() -> Self {
        let mode = std::env::var("AUTHZ_MODE")
            .map(|v| EvaluationMode::parse(&v))
            .unwrap_or(EvaluationMode::Static);
        let cache_ttl_secs = std::env::var("PERMISSION_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        Self {
            mode,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
        }
    }
}
