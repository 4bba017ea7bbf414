//! # StockFlow Authz
//!
//! Authorization for the StockFlow engine:
//!
//! - [`catalog`]: the permission catalog (registration, listing, lifecycle)
//! - [`graph`]: roles, grant edges, and user-role assignment
//! - [`evaluator`]: permission checks over a pluggable permission source
//! - [`cache`]: the TTL cache backing dynamic evaluation
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use stockflow_authz::{AuthorizationEvaluator, StaticPermissionSource};
//!
//! let evaluator = AuthorizationEvaluator::new(Arc::new(StaticPermissionSource));
//! let allowed = evaluator.has_permission(&principal, "product.edit").await?;
//! ```

pub mod cache;
pub mod catalog;
pub mod evaluator;
pub mod graph;

pub use cache::PermissionCache;
pub use catalog::PermissionCatalog;
pub use evaluator::{
    AuthorizationEvaluator, DynamicPermissionSource, PermissionSource, StaticPermissionSource,
};
pub use graph::RoleGraph;
