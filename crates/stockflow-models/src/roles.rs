//! Role and permission domain models and DTOs.
//!
//! All data structures for role-based access control: permissions, roles,
//! grant edges, and the principal handed in by the identity collaborator.

use crate::ids::{PermissionId, RoleId, UserId};
use crate::enums::UserRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// An atomic, named capability check (`category.action`).
///
/// Immutable once referenced by a grant; deactivation leaves grant edges in
/// place but the evaluator treats them as non-granting.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub category: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named bundle of permissions assignable to users.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    /// Higher priority means more authority; used for tie-breaks and
    /// hierarchy display.
    pub priority: i32,
    pub is_active: bool,
    /// System roles cannot be deleted.
    pub is_system_role: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// The legacy scalar role view, computed from the canonical name.
    pub fn legacy_view(&self) -> Option<UserRole> {
        UserRole::from_role_name(&self.name)
    }

    /// A lightweight reference for embedding in a [`Principal`].
    pub fn role_ref(&self) -> RoleRef {
        RoleRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// The association record linking a role to a permission.
///
/// At most one edge exists per (role, permission) pair; re-granting is
/// idempotent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RolePermission {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
    pub granted_at: DateTime<Utc>,
    pub granted_by: Option<UserId>,
}

/// A role together with its resolved permission rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// A role reference carried by a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: RoleId,
    pub name: String,
}

/// The authenticated subject of an authorization check.
///
/// Supplied by the identity collaborator; the evaluator never authenticates.
/// Today users hold a single role, but the contract carries a set so
/// multi-role assignment needs no interface change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<RoleRef>,
}

impl Principal {
    /// A principal holding one role.
    pub fn with_role(user_id: UserId, role: RoleRef) -> Self {
        Self {
            user_id,
            roles: vec![role],
        }
    }

    /// The legacy scalar views of the principal's roles, where computable.
    pub fn legacy_roles(&self) -> Vec<UserRole> {
        self.roles
            .iter()
            .filter_map(|r| UserRole::from_role_name(&r.name))
            .collect()
    }
}

// DTOs

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePermissionDto {
    /// Dotted `category.action` identifier; validated against the catalog's
    /// name shape on create.
    #[validate(length(min = 3, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoleDto {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
    pub priority: i32,
    /// Permission names to grant on creation.
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRoleDto {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
    pub priority: Option<i32>,
}
