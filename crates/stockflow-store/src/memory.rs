//! In-memory store.
//!
//! Backs tests and static deployments that never touch Postgres. One
//! `RwLock` guards the whole state; contention is irrelevant at the scales
//! this store is used at.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use stockflow_core::{CoreError, CoreResult};
use stockflow_models::{
    Channel, Notification, NotificationId, NotificationPreference, NotificationStatus,
    NotificationTemplate, NotificationType, Permission, PermissionId, Role, RoleId,
    RolePermission, TemplateId, UserId,
};

use crate::ports::{
    NotificationStore, PermissionStore, PreferenceMutation, PreferenceStore, RoleStore,
    TemplateStore,
};

#[derive(Default)]
struct Inner {
    permissions: HashMap<PermissionId, Permission>,
    roles: HashMap<RoleId, Role>,
    edges: HashMap<(RoleId, PermissionId), RolePermission>,
    user_roles: HashSet<(UserId, RoleId)>,
    preferences: HashMap<(UserId, NotificationType), NotificationPreference>,
    templates: HashMap<TemplateId, NotificationTemplate>,
    notifications: HashMap<NotificationId, Notification>,
    deliveries: HashSet<(NotificationId, Channel)>,
}

/// A store holding everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn insert_permission(&self, permission: Permission) -> CoreResult<Permission> {
        let mut inner = self.inner.write().await;
        if inner.permissions.values().any(|p| p.name == permission.name) {
            return Err(CoreError::duplicate_name(&permission.name));
        }
        inner.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn get_permission_by_name(&self, name: &str) -> CoreResult<Option<Permission>> {
        let inner = self.inner.read().await;
        Ok(inner.permissions.values().find(|p| p.name == name).cloned())
    }

    async fn list_permissions(&self) -> CoreResult<Vec<Permission>> {
        let inner = self.inner.read().await;
        let mut all: Vec<Permission> = inner.permissions.values().cloned().collect();
        all.sort_by(|a, b| a.category.cmp(&b.category).then(a.name.cmp(&b.name)));
        Ok(all)
    }

    async fn set_permission_active(&self, name: &str, active: bool) -> CoreResult<Permission> {
        let mut inner = self.inner.write().await;
        let permission = inner
            .permissions
            .values_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| CoreError::not_found(format!("permission '{name}'")))?;
        permission.is_active = active;
        permission.updated_at = chrono::Utc::now();
        Ok(permission.clone())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn insert_role(&self, role: Role) -> CoreResult<Role> {
        let mut inner = self.inner.write().await;
        if inner.roles.values().any(|r| r.name == role.name) {
            return Err(CoreError::duplicate_name(&role.name));
        }
        inner.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn get_role(&self, id: RoleId) -> CoreResult<Option<Role>> {
        Ok(self.inner.read().await.roles.get(&id).cloned())
    }

    async fn get_role_by_name(&self, name: &str) -> CoreResult<Option<Role>> {
        let inner = self.inner.read().await;
        Ok(inner.roles.values().find(|r| r.name == name).cloned())
    }

    async fn list_roles(&self) -> CoreResult<Vec<Role>> {
        let inner = self.inner.read().await;
        let mut all: Vec<Role> = inner.roles.values().cloned().collect();
        all.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.name.cmp(&b.name)));
        Ok(all)
    }

    async fn update_role(&self, role: Role) -> CoreResult<Role> {
        let mut inner = self.inner.write().await;
        if !inner.roles.contains_key(&role.id) {
            return Err(CoreError::not_found(format!("role {}", role.id)));
        }
        inner.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn delete_role(&self, id: RoleId) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let role = inner
            .roles
            .get(&id)
            .ok_or_else(|| CoreError::not_found(format!("role {id}")))?;
        if role.is_system_role {
            return Err(CoreError::validation("system roles cannot be deleted"));
        }
        inner.roles.remove(&id);
        inner.edges.retain(|(role_id, _), _| *role_id != id);
        inner.user_roles.retain(|(_, role_id)| *role_id != id);
        Ok(())
    }

    async fn grant(&self, edge: RolePermission) -> CoreResult<bool> {
        let mut inner = self.inner.write().await;
        let key = (edge.role_id, edge.permission_id);
        if inner.edges.contains_key(&key) {
            return Ok(false);
        }
        inner.edges.insert(key, edge);
        Ok(true)
    }

    async fn revoke(&self, role_id: RoleId, permission_id: PermissionId) -> CoreResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.edges.remove(&(role_id, permission_id)).is_some())
    }

    async fn edges_for_role(&self, role_id: RoleId) -> CoreResult<Vec<RolePermission>> {
        let inner = self.inner.read().await;
        Ok(inner
            .edges
            .values()
            .filter(|e| e.role_id == role_id)
            .cloned()
            .collect())
    }

    async fn permission_names_for_role(&self, role_id: RoleId) -> CoreResult<HashSet<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .edges
            .keys()
            .filter(|(r, _)| *r == role_id)
            .filter_map(|(_, p)| inner.permissions.get(p))
            .filter(|p| p.is_active)
            .map(|p| p.name.clone())
            .collect())
    }

    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.roles.contains_key(&role_id) {
            return Err(CoreError::not_found(format!("role {role_id}")));
        }
        inner.user_roles.insert((user_id, role_id));
        Ok(())
    }

    async fn unassign_role(&self, user_id: UserId, role_id: RoleId) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.user_roles.remove(&(user_id, role_id));
        Ok(())
    }

    async fn roles_for_user(&self, user_id: UserId) -> CoreResult<Vec<Role>> {
        let inner = self.inner.read().await;
        let mut roles: Vec<Role> = inner
            .user_roles
            .iter()
            .filter(|(u, _)| *u == user_id)
            .filter_map(|(_, r)| inner.roles.get(r))
            .cloned()
            .collect();
        roles.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(roles)
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get_preference(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
    ) -> CoreResult<Option<NotificationPreference>> {
        let inner = self.inner.read().await;
        Ok(inner.preferences.get(&(user_id, notification_type)).cloned())
    }

    async fn list_preferences(&self, user_id: UserId) -> CoreResult<Vec<NotificationPreference>> {
        let inner = self.inner.read().await;
        Ok(inner
            .preferences
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_preference(
        &self,
        preference: NotificationPreference,
    ) -> CoreResult<NotificationPreference> {
        preference.validate_quiet_hours()?;
        let mut inner = self.inner.write().await;
        inner.preferences.insert(
            (preference.user_id, preference.notification_type),
            preference.clone(),
        );
        Ok(preference)
    }

    async fn modify_preference(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        mutation: PreferenceMutation,
    ) -> CoreResult<NotificationPreference> {
        let mut inner = self.inner.write().await;
        let preference = inner
            .preferences
            .entry((user_id, notification_type))
            .or_insert_with(|| NotificationPreference::default_for(user_id, notification_type));
        mutation.apply(preference);
        Ok(preference.clone())
    }

    async fn upsert_preferences(
        &self,
        preferences: Vec<NotificationPreference>,
    ) -> CoreResult<Vec<NotificationPreference>> {
        // Validate every row before applying any.
        for preference in &preferences {
            preference.validate_quiet_hours()?;
        }
        let mut inner = self.inner.write().await;
        for preference in &preferences {
            inner.preferences.insert(
                (preference.user_id, preference.notification_type),
                preference.clone(),
            );
        }
        Ok(preferences)
    }

    async fn delete_preferences_for_user(&self, user_id: UserId) -> CoreResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.preferences.len();
        inner.preferences.retain(|(u, _), _| *u != user_id);
        Ok((before - inner.preferences.len()) as u64)
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn insert_template(
        &self,
        template: NotificationTemplate,
    ) -> CoreResult<NotificationTemplate> {
        let mut inner = self.inner.write().await;
        if inner.templates.values().any(|t| t.name == template.name) {
            return Err(CoreError::duplicate_name(&template.name));
        }
        inner.templates.insert(template.id, template.clone());
        Ok(template)
    }

    async fn get_template(&self, id: TemplateId) -> CoreResult<Option<NotificationTemplate>> {
        Ok(self.inner.read().await.templates.get(&id).cloned())
    }

    async fn get_template_by_name(
        &self,
        name: &str,
    ) -> CoreResult<Option<NotificationTemplate>> {
        let inner = self.inner.read().await;
        Ok(inner.templates.values().find(|t| t.name == name).cloned())
    }

    async fn list_active_templates(&self) -> CoreResult<Vec<NotificationTemplate>> {
        let inner = self.inner.read().await;
        let mut all: Vec<NotificationTemplate> = inner
            .templates
            .values()
            .filter(|t| t.is_active)
            .cloned()
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn update_template(
        &self,
        template: NotificationTemplate,
    ) -> CoreResult<NotificationTemplate> {
        let mut inner = self.inner.write().await;
        if !inner.templates.contains_key(&template.id) {
            return Err(CoreError::not_found(format!("template {}", template.id)));
        }
        inner.templates.insert(template.id, template.clone());
        Ok(template)
    }

    async fn set_template_active(&self, id: TemplateId, active: bool) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let template = inner
            .templates
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("template {id}")))?;
        template.is_active = active;
        template.updated_at = Some(chrono::Utc::now());
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: Notification) -> CoreResult<Notification> {
        let mut inner = self.inner.write().await;
        if inner.notifications.contains_key(&notification.id) {
            return Err(CoreError::duplicate_name(notification.id.to_string()));
        }
        inner
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn get_notification(&self, id: NotificationId) -> CoreResult<Option<Notification>> {
        Ok(self.inner.read().await.notifications.get(&id).cloned())
    }

    async fn update_notification(&self, notification: Notification) -> CoreResult<Notification> {
        let mut inner = self.inner.write().await;
        if !inner.notifications.contains_key(&notification.id) {
            return Err(CoreError::not_found(format!(
                "notification {}",
                notification.id
            )));
        }
        inner
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn list_by_status(&self, status: NotificationStatus) -> CoreResult<Vec<Notification>> {
        let inner = self.inner.read().await;
        Ok(inner
            .notifications
            .values()
            .filter(|n| n.status == status)
            .cloned()
            .collect())
    }

    async fn record_delivery(&self, id: NotificationId, channel: Channel) -> CoreResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.deliveries.insert((id, channel)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn permission(name: &str, category: &str) -> Permission {
        let now = Utc::now();
        Permission {
            id: PermissionId::new(),
            name: name.to_string(),
            display_name: name.to_string(),
            description: None,
            category: category.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn role(name: &str, system: bool) -> Role {
        let now = Utc::now();
        Role {
            id: RoleId::new(),
            name: name.to_string(),
            display_name: name.to_string(),
            description: None,
            priority: 10,
            is_active: true,
            is_system_role: system,
            created_at: now,
            updated_at: now,
        }
    }

    fn edge(role: &Role, permission: &Permission) -> RolePermission {
        RolePermission {
            role_id: role.id,
            permission_id: permission.id,
            granted_at: Utc::now(),
            granted_by: None,
        }
    }

    #[tokio::test]
    async fn permission_names_must_be_unique() {
        let store = MemoryStore::new();
        store
            .insert_permission(permission("product.view", "Product"))
            .await
            .unwrap();
        let err = store
            .insert_permission(permission("product.view", "Product"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn granting_twice_creates_one_edge() {
        let store = MemoryStore::new();
        let p = store
            .insert_permission(permission("product.view", "Product"))
            .await
            .unwrap();
        let r = store.insert_role(role("Auditor", false)).await.unwrap();

        assert!(store.grant(edge(&r, &p)).await.unwrap());
        assert!(!store.grant(edge(&r, &p)).await.unwrap());
        assert_eq!(store.edges_for_role(r.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inactive_permissions_drop_out_of_role_resolution() {
        let store = MemoryStore::new();
        let p = store
            .insert_permission(permission("product.delete", "Product"))
            .await
            .unwrap();
        let r = store.insert_role(role("Auditor", false)).await.unwrap();
        store.grant(edge(&r, &p)).await.unwrap();

        let names = store.permission_names_for_role(r.id).await.unwrap();
        assert!(names.contains("product.delete"));

        store
            .set_permission_active("product.delete", false)
            .await
            .unwrap();
        let names = store.permission_names_for_role(r.id).await.unwrap();
        assert!(names.is_empty());
        // The edge itself survives deactivation.
        assert_eq!(store.edges_for_role(r.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn system_roles_cannot_be_deleted() {
        let store = MemoryStore::new();
        let r = store.insert_role(role("Admin", true)).await.unwrap();
        assert!(matches!(
            store.delete_role(r.id).await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn batch_upsert_is_all_or_nothing() {
        let store = MemoryStore::new();
        let user = UserId::new();

        let good = NotificationPreference::default_for(user, NotificationType::Invoice);
        let mut bad = NotificationPreference::default_for(user, NotificationType::Payment);
        bad.quiet_hours_start = chrono::NaiveTime::from_hms_opt(22, 0, 0);

        let err = store
            .upsert_preferences(vec![good, bad])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuietHours));
        assert!(store.list_preferences(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn modify_preference_synthesizes_and_mutates_in_one_step() {
        let store = MemoryStore::new();
        let user = UserId::new();

        let pref = store
            .modify_preference(
                user,
                NotificationType::Payment,
                PreferenceMutation::AddChannel(Channel::Email),
            )
            .await
            .unwrap();
        assert!(pref.has_channel(Channel::InApp));
        assert!(pref.has_channel(Channel::Email));

        // Concurrent field edits both land; neither overwrites the other.
        let (a, b) = tokio::join!(
            store.modify_preference(
                user,
                NotificationType::Payment,
                PreferenceMutation::AddChannel(Channel::Sms),
            ),
            store.modify_preference(
                user,
                NotificationType::Payment,
                PreferenceMutation::SetEnabled(false),
            ),
        );
        a.unwrap();
        b.unwrap();

        let stored = store
            .get_preference(user, NotificationType::Payment)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.has_channel(Channel::Sms));
        assert!(!stored.is_enabled);
    }

    #[tokio::test]
    async fn duplicate_notification_ids_are_rejected() {
        let store = MemoryStore::new();
        let n = store
            .insert_notification(Notification::new("t", "m", NotificationType::Invoice))
            .await
            .unwrap();

        let err = store.insert_notification(n).await.unwrap_err();
        assert!(matches!(err, CoreError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn delivery_log_is_idempotent_per_channel() {
        let store = MemoryStore::new();
        let n = store
            .insert_notification(Notification::new(
                "t",
                "m",
                NotificationType::StockAlert,
            ))
            .await
            .unwrap();

        assert!(store.record_delivery(n.id, Channel::Email).await.unwrap());
        assert!(!store.record_delivery(n.id, Channel::Email).await.unwrap());
        assert!(store.record_delivery(n.id, Channel::Push).await.unwrap());
    }
}
