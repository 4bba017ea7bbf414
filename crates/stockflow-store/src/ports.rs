//! Repository ports.
//!
//! Services hold `Arc<dyn Trait>` and never name a concrete store. Every
//! method returns [`CoreResult`]; infrastructure failures surface as
//! `CoreError::StoreUnavailable` so callers can fail closed.

use async_trait::async_trait;
use chrono::NaiveTime;
use std::collections::HashSet;
use stockflow_core::CoreResult;
use stockflow_models::{
    Channel, Notification, NotificationPreference, NotificationPriority, NotificationStatus,
    NotificationTemplate, NotificationType, Permission, PermissionId, Role, RoleId,
    RolePermission, TemplateId, UserId,
};
use stockflow_models::ids::NotificationId;

/// A single-field change to a preference row.
///
/// Field-level edits go through [`PreferenceStore::modify_preference`] rather
/// than a load-then-replace in the caller, so two racing edits to different
/// fields cannot overwrite each other with stale full rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceMutation {
    SetEnabled(bool),
    SetMinimumPriority(NotificationPriority),
    AddChannel(Channel),
    RemoveChannel(Channel),
    SetQuietHours(NaiveTime, NaiveTime),
    ClearQuietHours,
    SetBatching(i32),
    ClearBatching,
}

impl PreferenceMutation {
    /// Applies the change to a loaded row. Every variant preserves the
    /// quiet-hours both-or-neither invariant.
    pub fn apply(self, preference: &mut NotificationPreference) {
        match self {
            Self::SetEnabled(true) => preference.enable(),
            Self::SetEnabled(false) => preference.disable(),
            Self::SetMinimumPriority(priority) => preference.set_minimum_priority(priority),
            Self::AddChannel(channel) => preference.add_channel(channel),
            Self::RemoveChannel(channel) => preference.remove_channel(channel),
            Self::SetQuietHours(start, end) => preference.set_quiet_hours(start, end),
            Self::ClearQuietHours => {
                preference.quiet_hours_start = None;
                preference.quiet_hours_end = None;
                preference.disable_quiet_hours();
            }
            Self::SetBatching(interval_minutes) => preference.set_batching(interval_minutes),
            Self::ClearBatching => preference.disable_batching(),
        }
    }
}

/// Persistence for the permission catalog.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Inserts a new permission. `DuplicateName` if the name exists.
    async fn insert_permission(&self, permission: Permission) -> CoreResult<Permission>;

    async fn get_permission_by_name(&self, name: &str) -> CoreResult<Option<Permission>>;

    /// All permissions, active and inactive, ordered by category then name.
    async fn list_permissions(&self) -> CoreResult<Vec<Permission>>;

    /// Flips the active flag. `NotFound` if the name is unknown.
    async fn set_permission_active(&self, name: &str, active: bool) -> CoreResult<Permission>;
}

/// Persistence for roles, grant edges, and user-role assignment.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Inserts a new role. `DuplicateName` if the name exists.
    async fn insert_role(&self, role: Role) -> CoreResult<Role>;

    async fn get_role(&self, id: RoleId) -> CoreResult<Option<Role>>;

    async fn get_role_by_name(&self, name: &str) -> CoreResult<Option<Role>>;

    /// All roles ordered by descending priority.
    async fn list_roles(&self) -> CoreResult<Vec<Role>>;

    /// Replaces the stored row. `NotFound` if the id is unknown.
    async fn update_role(&self, role: Role) -> CoreResult<Role>;

    /// Deletes a role and its edges. `Validation` for system roles,
    /// `NotFound` for unknown ids.
    async fn delete_role(&self, id: RoleId) -> CoreResult<()>;

    /// Upserts a grant edge. Returns `true` if the edge was newly created,
    /// `false` if it already existed.
    async fn grant(&self, edge: RolePermission) -> CoreResult<bool>;

    /// Removes a grant edge. Returns `true` if an edge was removed.
    async fn revoke(&self, role_id: RoleId, permission_id: PermissionId) -> CoreResult<bool>;

    async fn edges_for_role(&self, role_id: RoleId) -> CoreResult<Vec<RolePermission>>;

    /// Names of *active* permissions granted to the role.
    async fn permission_names_for_role(&self, role_id: RoleId) -> CoreResult<HashSet<String>>;

    /// Assigns a role to a user, idempotently.
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> CoreResult<()>;

    async fn unassign_role(&self, user_id: UserId, role_id: RoleId) -> CoreResult<()>;

    async fn roles_for_user(&self, user_id: UserId) -> CoreResult<Vec<Role>>;
}

/// Persistence for per-user notification preferences.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_preference(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
    ) -> CoreResult<Option<NotificationPreference>>;

    async fn list_preferences(&self, user_id: UserId) -> CoreResult<Vec<NotificationPreference>>;

    /// Inserts or replaces the row for (user, type). Rejects rows violating
    /// the quiet-hours invariant.
    async fn upsert_preference(
        &self,
        preference: NotificationPreference,
    ) -> CoreResult<NotificationPreference>;

    /// Atomic read-modify-write of one field: loads the row (synthesizing
    /// the default when absent), applies the mutation, and persists the
    /// result under the store's own locking.
    async fn modify_preference(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        mutation: PreferenceMutation,
    ) -> CoreResult<NotificationPreference>;

    /// All-or-nothing batch upsert: if any row is invalid, none are applied.
    async fn upsert_preferences(
        &self,
        preferences: Vec<NotificationPreference>,
    ) -> CoreResult<Vec<NotificationPreference>>;

    /// Removes every preference row for the user. Returns rows removed.
    async fn delete_preferences_for_user(&self, user_id: UserId) -> CoreResult<u64>;
}

/// Persistence for notification templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Inserts a new template. `DuplicateName` if the name exists.
    async fn insert_template(
        &self,
        template: NotificationTemplate,
    ) -> CoreResult<NotificationTemplate>;

    async fn get_template(&self, id: TemplateId) -> CoreResult<Option<NotificationTemplate>>;

    async fn get_template_by_name(&self, name: &str)
    -> CoreResult<Option<NotificationTemplate>>;

    async fn list_active_templates(&self) -> CoreResult<Vec<NotificationTemplate>>;

    /// Replaces the stored row. `NotFound` if the id is unknown.
    async fn update_template(
        &self,
        template: NotificationTemplate,
    ) -> CoreResult<NotificationTemplate>;

    /// Flips the active flag. `NotFound` if the id is unknown.
    async fn set_template_active(&self, id: TemplateId, active: bool) -> CoreResult<()>;
}

/// Persistence for notification instances and their delivery log.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: Notification) -> CoreResult<Notification>;

    async fn get_notification(&self, id: NotificationId) -> CoreResult<Option<Notification>>;

    /// Replaces the stored row after a state transition. `NotFound` if the
    /// id is unknown.
    async fn update_notification(&self, notification: Notification) -> CoreResult<Notification>;

    async fn list_by_status(&self, status: NotificationStatus) -> CoreResult<Vec<Notification>>;

    /// Records a successful delivery on one channel. Idempotent per
    /// (notification, channel): returns `true` only for the first success.
    async fn record_delivery(
        &self,
        id: NotificationId,
        channel: Channel,
    ) -> CoreResult<bool>;
}
