//! Shared error taxonomy for the StockFlow core.
//!
//! Authorization checks never surface these to callers as a denial reason:
//! a failed permission check resolves to `false` (or an `Err` the caller
//! treats as deny), and the caller decides the user-visible response.

use thiserror::Error;

/// Convenience alias used by services across the workspace.
pub type CoreResult<T> = Result<T, CoreError>;

/// Error type shared by the catalog, role graph, preference, and template
/// services.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The referenced role, permission, preference, or template does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A catalog or template insert collided with an existing unique name.
    #[error("duplicate name: '{0}'")]
    DuplicateName(String),

    /// A permission name failed the `category.action` shape check on create.
    /// Lookups of malformed names do not raise this; they simply miss.
    #[error("invalid permission name: '{0}' (expected 'category.action')")]
    InvalidPermissionName(String),

    /// Only one of quiet-hours start/end was supplied.
    #[error("quiet hours start and end must both be set or both be empty")]
    InvalidQuietHours,

    /// One or more template placeholders had no matching parameter.
    /// Every missing name is collected, not just the first.
    #[error("missing template parameters: {}", .0.join(", "))]
    MissingParameter(Vec<String>),

    /// A template failed syntactic validation (malformed placeholder or
    /// unbalanced braces).
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    /// The persistence collaborator failed. Dynamic permission evaluation
    /// fails closed when this occurs.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A store lookup exceeded the caller-supplied timeout.
    #[error("store lookup timed out: {0}")]
    Timeout(String),

    /// An illegal notification status transition was requested.
    #[error("invalid status transition: {0}")]
    InvalidTransition(String),

    /// A DTO or value failed validation.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName(name.into())
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable(err.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether this error came from the persistence collaborator rather than
    /// from domain rules.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameter_lists_every_name() {
        let err = CoreError::MissingParameter(vec!["count".into(), "name".into()]);
        assert_eq!(
            format!("{}", err),
            "missing template parameters: count, name"
        );
    }

    #[test]
    fn store_failures_are_distinguished() {
        assert!(CoreError::store("connection refused").is_store_failure());
        assert!(CoreError::Timeout("preferences".into()).is_store_failure());
        assert!(!CoreError::not_found("role").is_store_failure());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            format!("{}", CoreError::not_found("permission")),
            "permission not found"
        );
        assert_eq!(
            format!("{}", CoreError::duplicate_name("stock_low")),
            "duplicate name: 'stock_low'"
        );
    }
}
