//! Permission catalog service.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use chrono::Utc;
use stockflow_core::{CoreError, CoreResult, builtin_permissions, is_valid_permission_name};
use stockflow_models::roles::CreatePermissionDto;
use stockflow_models::{Permission, PermissionId};
use stockflow_store::PermissionStore;

/// The registry of every permission the evaluator can be asked about.
///
/// Registration validates the dotted `category.action` name shape; names are
/// unique and case-sensitive. Deactivating a permission leaves grant edges
/// in place, the evaluator just stops honoring them.
pub struct PermissionCatalog {
    store: Arc<dyn PermissionStore>,
}

impl PermissionCatalog {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }

    /// Every permission, active and inactive, ordered by category then name.
    pub async fn list_all(&self) -> CoreResult<Vec<Permission>> {
        self.store.list_permissions().await
    }

    /// Permissions grouped by category; groups and members come back in
    /// name order.
    pub async fn list_by_category(&self) -> CoreResult<BTreeMap<String, Vec<Permission>>> {
        let mut grouped: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
        for permission in self.store.list_permissions().await? {
            grouped
                .entry(permission.category.clone())
                .or_default()
                .push(permission);
        }
        Ok(grouped)
    }

    /// Looks a permission up by its dotted name.
    pub async fn get_by_name(&self, name: &str) -> CoreResult<Permission> {
        self.store
            .get_permission_by_name(name)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("permission '{name}'")))
    }

    /// Registers a new permission.
    #[instrument(skip(self, dto), fields(name = %dto.name))]
    pub async fn register(&self, dto: CreatePermissionDto) -> CoreResult<Permission> {
        dto.validate()
            .map_err(|e| CoreError::validation(e.to_string()))?;
        if !is_valid_permission_name(&dto.name) {
            return Err(CoreError::InvalidPermissionName(dto.name));
        }

        let now = Utc::now();
        let permission = Permission {
            id: PermissionId::new(),
            name: dto.name,
            display_name: dto.display_name,
            description: dto.description,
            category: dto.category,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let created = self.store.insert_permission(permission).await?;
        info!(permission = %created.name, "permission registered");
        Ok(created)
    }

    /// Deactivates a permission; checks against it stop granting until it is
    /// reactivated.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, name: &str) -> CoreResult<Permission> {
        self.store.set_permission_active(name, false).await
    }

    #[instrument(skip(self))]
    pub async fn activate(&self, name: &str) -> CoreResult<Permission> {
        self.store.set_permission_active(name, true).await
    }

    /// Seeds the built-in permission set, skipping names that already exist.
    /// Safe to run at every startup.
    #[instrument(skip(self))]
    pub async fn seed_builtins(&self) -> CoreResult<u32> {
        let mut created = 0;
        for builtin in builtin_permissions() {
            if self.store.get_permission_by_name(builtin.name).await?.is_some() {
                continue;
            }
            let now = Utc::now();
            self.store
                .insert_permission(Permission {
                    id: PermissionId::new(),
                    name: builtin.name.to_string(),
                    display_name: builtin.display_name.to_string(),
                    description: Some(builtin.description.to_string()),
                    category: builtin.category.to_string(),
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
            created += 1;
        }
        if created > 0 {
            info!(created, "seeded built-in permissions");
        }
        Ok(created)
    }
}
