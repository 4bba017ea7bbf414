//! Role-permission graph service.
//!
//! Owns role lifecycle, grant edges, and user-role assignment. Every grant
//! mutation invalidates the permission cache for the affected role so
//! dynamic evaluation sees in-process changes immediately.

use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use chrono::Utc;
use stockflow_core::{CoreError, CoreResult};
use stockflow_models::roles::{CreateRoleDto, UpdateRoleDto};
use stockflow_models::{
    Role, RoleId, RolePermission, RoleWithPermissions, UserId,
};
use stockflow_store::{PermissionStore, RoleStore};

use crate::cache::PermissionCache;

pub struct RoleGraph {
    roles: Arc<dyn RoleStore>,
    permissions: Arc<dyn PermissionStore>,
    cache: Arc<PermissionCache>,
}

impl RoleGraph {
    pub fn new(
        roles: Arc<dyn RoleStore>,
        permissions: Arc<dyn PermissionStore>,
        cache: Arc<PermissionCache>,
    ) -> Self {
        Self {
            roles,
            permissions,
            cache,
        }
    }

    /// Creates a role, optionally granting an initial permission list by
    /// name. Unknown permission names fail the whole call.
    #[instrument(skip(self, dto), fields(name = %dto.name))]
    pub async fn create_role(&self, dto: CreateRoleDto) -> CoreResult<Role> {
        dto.validate()
            .map_err(|e| CoreError::validation(e.to_string()))?;

        let now = Utc::now();
        let role = self
            .roles
            .insert_role(Role {
                id: RoleId::new(),
                name: dto.name,
                display_name: dto.display_name,
                description: dto.description,
                priority: dto.priority,
                is_active: true,
                is_system_role: false,
                created_at: now,
                updated_at: now,
            })
            .await?;

        if let Some(names) = dto.permissions {
            for name in names {
                self.grant(role.id, &name, None).await?;
            }
        }
        info!(role = %role.name, "role created");
        Ok(role)
    }

    #[instrument(skip(self, dto))]
    pub async fn update_role(&self, id: RoleId, dto: UpdateRoleDto) -> CoreResult<Role> {
        dto.validate()
            .map_err(|e| CoreError::validation(e.to_string()))?;

        let mut role = self.get_role(id).await?;
        if let Some(name) = dto.name {
            role.name = name;
        }
        if let Some(display_name) = dto.display_name {
            role.display_name = display_name;
        }
        if dto.description.is_some() {
            role.description = dto.description;
        }
        if let Some(priority) = dto.priority {
            role.priority = priority;
        }
        self.roles.update_role(role).await
    }

    /// Deletes a role and its grant edges. System roles are refused.
    #[instrument(skip(self))]
    pub async fn delete_role(&self, id: RoleId) -> CoreResult<()> {
        self.roles.delete_role(id).await?;
        self.cache.invalidate(id);
        Ok(())
    }

    pub async fn get_role(&self, id: RoleId) -> CoreResult<Role> {
        self.roles
            .get_role(id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("role {id}")))
    }

    pub async fn get_role_by_name(&self, name: &str) -> CoreResult<Role> {
        self.roles
            .get_role_by_name(name)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("role '{name}'")))
    }

    /// All roles, highest priority first.
    pub async fn list_roles(&self) -> CoreResult<Vec<Role>> {
        self.roles.list_roles().await
    }

    /// A role joined with its granted permission rows.
    pub async fn role_with_permissions(&self, id: RoleId) -> CoreResult<RoleWithPermissions> {
        let role = self.get_role(id).await?;
        let edges = self.roles.edges_for_role(id).await?;
        let all = self.permissions.list_permissions().await?;
        let permissions = all
            .into_iter()
            .filter(|p| edges.iter().any(|e| e.permission_id == p.id))
            .collect();
        Ok(RoleWithPermissions { role, permissions })
    }

    /// Grants a permission to a role by name. Idempotent: re-granting an
    /// existing edge returns `false` and changes nothing.
    #[instrument(skip(self))]
    pub async fn grant(
        &self,
        role_id: RoleId,
        permission_name: &str,
        granted_by: Option<UserId>,
    ) -> CoreResult<bool> {
        let role = self.get_role(role_id).await?;
        let permission = self
            .permissions
            .get_permission_by_name(permission_name)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("permission '{permission_name}'")))?;

        let created = self
            .roles
            .grant(RolePermission {
                role_id: role.id,
                permission_id: permission.id,
                granted_at: Utc::now(),
                granted_by,
            })
            .await?;
        self.cache.invalidate(role_id);
        if created {
            info!(role = %role.name, permission = %permission.name, "permission granted");
        }
        Ok(created)
    }

    /// Revokes a permission from a role by name. Returns `false` when no
    /// edge existed.
    #[instrument(skip(self))]
    pub async fn revoke(&self, role_id: RoleId, permission_name: &str) -> CoreResult<bool> {
        let permission = self
            .permissions
            .get_permission_by_name(permission_name)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("permission '{permission_name}'")))?;

        let removed = self.roles.revoke(role_id, permission.id).await?;
        self.cache.invalidate(role_id);
        Ok(removed)
    }

    #[instrument(skip(self))]
    pub async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> CoreResult<()> {
        self.roles.assign_role(user_id, role_id).await
    }

    #[instrument(skip(self))]
    pub async fn unassign_role(&self, user_id: UserId, role_id: RoleId) -> CoreResult<()> {
        self.roles.unassign_role(user_id, role_id).await
    }

    pub async fn roles_for_user(&self, user_id: UserId) -> CoreResult<Vec<Role>> {
        self.roles.roles_for_user(user_id).await
    }
}
