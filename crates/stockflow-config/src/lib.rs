//! # StockFlow Config
//!
//! Configuration types for the StockFlow engine, loaded from environment
//! variables:
//!
//! - [`authz`]: authorization evaluation mode and permission cache tuning
//! - [`notify`]: notification delivery tuning (retry limits, lookup
//!   timeouts, emergency bypass)
//!
//! # Example
//!
//! ```ignore
//! use stockflow_config::{AuthzConfig, NotifyConfig};
//!
//! dotenvy::dotenv().ok();
//! let authz = AuthzConfig::from_env();
//! let notify = NotifyConfig::from_env();
//! ```

pub mod authz;
pub mod notify;

// Re-export commonly used types at crate root
pub use authz::{AuthzConfig, EvaluationMode};
pub use notify::NotifyConfig;

/// Loads `.env` into the process environment if present. Call once at
/// startup before reading any config.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}
