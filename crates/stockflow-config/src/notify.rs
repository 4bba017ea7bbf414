//! Notification delivery configuration.
//!
//! # Configuration
//!
//! - `NOTIFY_MAX_DELIVERY_ATTEMPTS`: failed-delivery retry ceiling
//!   (default: 3)
//! - `NOTIFY_PREFERENCE_TIMEOUT_MS`: preference lookup deadline in
//!   milliseconds before the resolver falls back to defaults (default: 500)
//! - `NOTIFY_EMERGENCY_BYPASS`: when `true`, Emergency-priority
//!   notifications skip every preference gate (default: true)

use std::time::Duration;

/// Notification pipeline configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Maximum delivery attempts per notification before it stops being
    /// retryable.
    pub max_delivery_attempts: i32,

    /// Deadline for a preference store lookup. On expiry the resolver
    /// synthesizes the default preference rather than blocking delivery.
    pub preference_timeout: Duration,

    /// Whether Emergency priority bypasses all preference gates.
    pub emergency_bypass: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_delivery_attempts: 3,
            preference_timeout: Duration::from_millis(500),
            emergency_bypass: true,
        }
    }
}

impl NotifyConfig {
    /// Creates a `NotifyConfig` from environment variables.
    ///
    /// Falls back to defaults if variables are unset or unparseable.
    ///
    /// # Environment Variables
    ///
    /// - `NOTIFY_MAX_DELIVERY_ATTEMPTS`: Default 3
    /// - `NOTIFY_PREFERENCE_TIMEOUT_MS`: Default 500
    /// - `NOTIFY_EMERGENCY_BYPASS`: Default true
    #[must_use]
    pub fn from_env() -> Self {
        let max_delivery_attempts = std::env::var("NOTIFY_MAX_DELIVERY_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);
        let timeout_ms = std::env::var("NOTIFY_PREFERENCE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);
        let emergency_bypass = std::env::var("NOTIFY_EMERGENCY_BYPASS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);

        Self {
            max_delivery_attempts,
            preference_timeout: Duration::from_millis(timeout_ms),
            emergency_bypass,
        }
    }
}
