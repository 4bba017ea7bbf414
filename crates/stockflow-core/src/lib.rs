//! # StockFlow Core
//!
//! Core types, errors, and utilities for the StockFlow authorization and
//! notification engines.
//!
//! This crate provides foundational types used throughout the workspace:
//!
//! - [`errors`]: the shared error taxonomy for catalog, store, and template
//!   operations
//! - [`permissions`]: centralized permission name constants, the built-in
//!   permission catalog, and permission-name validation
//! - [`logging`]: console logging bootstrap
//!
//! # Example
//!
//! ```ignore
//! use stockflow_core::errors::CoreError;
//! use stockflow_core::permissions;
//!
//! if effective.contains(permissions::product::CREATE) {
//!     // create product
//! }
//!
//! let err = CoreError::not_found("role");
//! ```

pub mod errors;
pub mod logging;
pub mod permissions;

// Re-export commonly used types at crate root
pub use errors::{CoreError, CoreResult};
pub use permissions::{BuiltinPermission, builtin_permissions, is_valid_permission_name};
