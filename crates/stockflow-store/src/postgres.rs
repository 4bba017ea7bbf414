//! PostgreSQL store.
//!
//! Runtime-bound `sqlx` queries against the schema in `migrations/`. Unique
//! violations on named entities map to `DuplicateName`; every other database
//! error surfaces as `StoreUnavailable`.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::instrument;

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

/// A store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the bundled migrations.
    pub async fn migrate(&self) -> CoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::store(e.to_string()))
    }
}

fn store_err(e: sqlx::Error) -> CoreError {
    CoreError::store(e.to_string())
}

/// Maps a unique violation to `DuplicateName`, anything else to
/// `StoreUnavailable`.
fn insert_err(e: sqlx::Error, name: &str) -> CoreError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return CoreError::duplicate_name(name);
    }
    store_err(e)
}

const PERMISSION_COLUMNS: &str =
    "id, name, display_name, description, category, is_active, created_at, updated_at";

const ROLE_COLUMNS: &str = "id, name, display_name, description, priority, is_active, \
     is_system_role, created_at, updated_at";

const PREFERENCE_COLUMNS: &str = "id, user_id, notification_type, enabled_channels, is_enabled, \
     minimum_priority, quiet_hours_start, quiet_hours_end, respect_quiet_hours, \
     batching_interval_minutes, created_at, updated_at";

const TEMPLATE_COLUMNS: &str = "id, name, description, title_template, message_template, \
     notification_type, default_priority, default_channels, is_active, is_persistent, \
     is_dismissible, default_action_url, expiration_hours, created_by, created_at, updated_at";

const NOTIFICATION_COLUMNS: &str = "id, title, message, notification_type, priority, status, \
     channels, recipient_id, sender_id, related_entity_id, related_entity_type, metadata, \
     action_url, template_id, created_at, sent_at, delivered_at, read_at, expires_at, \
     delivery_attempts, last_error, is_persistent, is_dismissible";

#[async_trait]
impl PermissionStore for PgStore {
    #[instrument(skip(self))]
    async fn insert_permission(&self, permission: Permission) -> CoreResult<Permission> {
        sqlx::query_as::<_, Permission>(&format!(
            r#"INSERT INTO permissions ({PERMISSION_COLUMNS})
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {PERMISSION_COLUMNS}"#
        ))
        .bind(permission.id)
        .bind(&permission.name)
        .bind(&permission.display_name)
        .bind(&permission.description)
        .bind(&permission.category)
        .bind(permission.is_active)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_err(e, &permission.name))
    }

    #[instrument(skip(self))]
    async fn get_permission_by_name(&self, name: &str) -> CoreResult<Option<Permission>> {
        sqlx::query_as::<_, Permission>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)
    }

    #[instrument(skip(self))]
    async fn list_permissions(&self) -> CoreResult<Vec<Permission>> {
        sqlx::query_as::<_, Permission>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions ORDER BY category, name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    #[instrument(skip(self))]
    async fn set_permission_active(&self, name: &str, active: bool) -> CoreResult<Permission> {
        sqlx::query_as::<_, Permission>(&format!(
            r#"UPDATE permissions SET is_active = $2, updated_at = NOW()
               WHERE name = $1
               RETURNING {PERMISSION_COLUMNS}"#
        ))
        .bind(name)
        .bind(active)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| CoreError::not_found(format!("permission '{name}'")))
    }
}

#[async_trait]
impl RoleStore for PgStore {
    #[instrument(skip(self))]
    async fn insert_role(&self, role: Role) -> CoreResult<Role> {
        sqlx::query_as::<_, Role>(&format!(
            r#"INSERT INTO roles ({ROLE_COLUMNS})
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING {ROLE_COLUMNS}"#
        ))
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.display_name)
        .bind(&role.description)
        .bind(role.priority)
        .bind(role.is_active)
        .bind(role.is_system_role)
        .bind(role.created_at)
        .bind(role.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_err(e, &role.name))
    }

    #[instrument(skip(self))]
    async fn get_role(&self, id: RoleId) -> CoreResult<Option<Role>> {
        sqlx::query_as::<_, Role>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)
    }

    #[instrument(skip(self))]
    async fn get_role_by_name(&self, name: &str) -> CoreResult<Option<Role>> {
        sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)
    }

    #[instrument(skip(self))]
    async fn list_roles(&self) -> CoreResult<Vec<Role>> {
        sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY priority DESC, name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    #[instrument(skip(self))]
    async fn update_role(&self, role: Role) -> CoreResult<Role> {
        sqlx::query_as::<_, Role>(&format!(
            r#"UPDATE roles
               SET name = $2, display_name = $3, description = $4, priority = $5,
                   is_active = $6, updated_at = NOW()
               WHERE id = $1
               RETURNING {ROLE_COLUMNS}"#
        ))
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.display_name)
        .bind(&role.description)
        .bind(role.priority)
        .bind(role.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| insert_err(e, &role.name))?
        .ok_or_else(|| CoreError::not_found(format!("role {}", role.id)))
    }

    #[instrument(skip(self))]
    async fn delete_role(&self, id: RoleId) -> CoreResult<()> {
        let role = self
            .get_role(id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("role {id}")))?;
        if role.is_system_role {
            return Err(CoreError::validation("system roles cannot be deleted"));
        }

        // Grant edges and assignments go with the role via ON DELETE CASCADE.
        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn grant(&self, edge: RolePermission) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"INSERT INTO role_permissions (role_id, permission_id, granted_at, granted_by)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (role_id, permission_id) DO NOTHING"#,
        )
        .bind(edge.role_id)
        .bind(edge.permission_id)
        .bind(edge.granted_at)
        .bind(edge.granted_by)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn revoke(&self, role_id: RoleId, permission_id: PermissionId) -> CoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
                .bind(role_id)
                .bind(permission_id)
                .execute(&self.pool)
                .await
                .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn edges_for_role(&self, role_id: RoleId) -> CoreResult<Vec<RolePermission>> {
        sqlx::query_as::<_, RolePermission>(
            r#"SELECT role_id, permission_id, granted_at, granted_by
               FROM role_permissions WHERE role_id = $1"#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    #[instrument(skip(self))]
    async fn permission_names_for_role(&self, role_id: RoleId) -> CoreResult<HashSet<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"SELECT p.name
               FROM role_permissions rp
               JOIN permissions p ON p.id = rp.permission_id
               WHERE rp.role_id = $1 AND p.is_active"#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(names.into_iter().collect())
    }

    #[instrument(skip(self))]
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> CoreResult<()> {
        sqlx::query(
            r#"INSERT INTO user_roles (user_id, role_id, assigned_at)
               VALUES ($1, $2, NOW())
               ON CONFLICT (user_id, role_id) DO NOTHING"#,
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn unassign_role(&self, user_id: UserId, role_id: RoleId) -> CoreResult<()> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn roles_for_user(&self, user_id: UserId) -> CoreResult<Vec<Role>> {
        sqlx::query_as::<_, Role>(&format!(
            r#"SELECT {ROLE_COLUMNS}
               FROM roles r
               JOIN user_roles ur ON ur.role_id = r.id
               WHERE ur.user_id = $1
               ORDER BY r.priority DESC"#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }
}

#[async_trait]
impl PreferenceStore for PgStore {
    #[instrument(skip(self))]
    async fn get_preference(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
    ) -> CoreResult<Option<NotificationPreference>> {
        sqlx::query_as::<_, NotificationPreference>(&format!(
            r#"SELECT {PREFERENCE_COLUMNS} FROM notification_preferences
               WHERE user_id = $1 AND notification_type = $2"#
        ))
        .bind(user_id)
        .bind(notification_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)
    }

    #[instrument(skip(self))]
    async fn list_preferences(&self, user_id: UserId) -> CoreResult<Vec<NotificationPreference>> {
        sqlx::query_as::<_, NotificationPreference>(&format!(
            r#"SELECT {PREFERENCE_COLUMNS} FROM notification_preferences
               WHERE user_id = $1 ORDER BY notification_type"#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    #[instrument(skip(self, preference))]
    async fn upsert_preference(
        &self,
        preference: NotificationPreference,
    ) -> CoreResult<NotificationPreference> {
        preference.validate_quiet_hours()?;
        upsert_preference_row(&self.pool, &preference).await?;
        Ok(preference)
    }

    #[instrument(skip(self))]
    async fn modify_preference(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        mutation: PreferenceMutation,
    ) -> CoreResult<NotificationPreference> {
        // Row lock for the read-modify-write; an absent row falls through to
        // the upsert's ON CONFLICT, which also covers a racing first insert.
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let existing = sqlx::query_as::<_, NotificationPreference>(&format!(
            r#"SELECT {PREFERENCE_COLUMNS} FROM notification_preferences
               WHERE user_id = $1 AND notification_type = $2
               FOR UPDATE"#
        ))
        .bind(user_id)
        .bind(notification_type)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?;

        let mut preference = existing
            .unwrap_or_else(|| NotificationPreference::default_for(user_id, notification_type));
        mutation.apply(&mut preference);
        upsert_preference_row(&mut *tx, &preference).await?;
        tx.commit().await.map_err(store_err)?;
        Ok(preference)
    }

    #[instrument(skip(self, preferences))]
    async fn upsert_preferences(
        &self,
        preferences: Vec<NotificationPreference>,
    ) -> CoreResult<Vec<NotificationPreference>> {
        for preference in &preferences {
            preference.validate_quiet_hours()?;
        }

        let mut tx = self.pool.begin().await.map_err(store_err)?;
        for preference in &preferences {
            upsert_preference_row(&mut *tx, preference).await?;
        }
        tx.commit().await.map_err(store_err)?;
        Ok(preferences)
    }

    #[instrument(skip(self))]
    async fn delete_preferences_for_user(&self, user_id: UserId) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM notification_preferences WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected())
    }
}

/// Shared upsert used by both the single and transactional batch paths.
async fn upsert_preference_row<'e, E>(
    executor: E,
    preference: &NotificationPreference,
) -> CoreResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"INSERT INTO notification_preferences
               (id, user_id, notification_type, enabled_channels, is_enabled,
                minimum_priority, quiet_hours_start, quiet_hours_end, respect_quiet_hours,
                batching_interval_minutes, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
           ON CONFLICT (user_id, notification_type) DO UPDATE SET
               enabled_channels = EXCLUDED.enabled_channels,
               is_enabled = EXCLUDED.is_enabled,
               minimum_priority = EXCLUDED.minimum_priority,
               quiet_hours_start = EXCLUDED.quiet_hours_start,
               quiet_hours_end = EXCLUDED.quiet_hours_end,
               respect_quiet_hours = EXCLUDED.respect_quiet_hours,
               batching_interval_minutes = EXCLUDED.batching_interval_minutes,
               updated_at = NOW()"#,
    )
    .bind(preference.id)
    .bind(preference.user_id)
    .bind(preference.notification_type)
    .bind(preference.enabled_channels)
    .bind(preference.is_enabled)
    .bind(preference.minimum_priority)
    .bind(preference.quiet_hours_start)
    .bind(preference.quiet_hours_end)
    .bind(preference.respect_quiet_hours)
    .bind(preference.batching_interval_minutes)
    .bind(preference.created_at)
    .bind(preference.updated_at)
    .execute(executor)
    .await
    .map_err(store_err)?;
    Ok(())
}

#[async_trait]
impl TemplateStore for PgStore {
    #[instrument(skip(self, template))]
    async fn insert_template(
        &self,
        template: NotificationTemplate,
    ) -> CoreResult<NotificationTemplate> {
        sqlx::query_as::<_, NotificationTemplate>(&format!(
            r#"INSERT INTO notification_templates ({TEMPLATE_COLUMNS})
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
               RETURNING {TEMPLATE_COLUMNS}"#
        ))
        .bind(template.id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(&template.title_template)
        .bind(&template.message_template)
        .bind(template.notification_type)
        .bind(template.default_priority)
        .bind(template.default_channels)
        .bind(template.is_active)
        .bind(template.is_persistent)
        .bind(template.is_dismissible)
        .bind(&template.default_action_url)
        .bind(template.expiration_hours)
        .bind(template.created_by)
        .bind(template.created_at)
        .bind(template.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_err(e, &template.name))
    }

    #[instrument(skip(self))]
    async fn get_template(&self, id: TemplateId) -> CoreResult<Option<NotificationTemplate>> {
        sqlx::query_as::<_, NotificationTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM notification_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)
    }

    #[instrument(skip(self))]
    async fn get_template_by_name(
        &self,
        name: &str,
    ) -> CoreResult<Option<NotificationTemplate>> {
        sqlx::query_as::<_, NotificationTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM notification_templates WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)
    }

    #[instrument(skip(self))]
    async fn list_active_templates(&self) -> CoreResult<Vec<NotificationTemplate>> {
        sqlx::query_as::<_, NotificationTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM notification_templates WHERE is_active ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    #[instrument(skip(self, template))]
    async fn update_template(
        &self,
        template: NotificationTemplate,
    ) -> CoreResult<NotificationTemplate> {
        sqlx::query_as::<_, NotificationTemplate>(&format!(
            r#"UPDATE notification_templates
               SET name = $2, description = $3, title_template = $4, message_template = $5,
                   default_priority = $6, default_channels = $7, default_action_url = $8,
                   expiration_hours = $9, updated_at = NOW()
               WHERE id = $1
               RETURNING {TEMPLATE_COLUMNS}"#
        ))
        .bind(template.id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(&template.title_template)
        .bind(&template.message_template)
        .bind(template.default_priority)
        .bind(template.default_channels)
        .bind(&template.default_action_url)
        .bind(template.expiration_hours)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| insert_err(e, &template.name))?
        .ok_or_else(|| CoreError::not_found(format!("template {}", template.id)))
    }

    #[instrument(skip(self))]
    async fn set_template_active(&self, id: TemplateId, active: bool) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE notification_templates SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(active)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::not_found(format!("template {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    #[instrument(skip(self, notification))]
    async fn insert_notification(&self, notification: Notification) -> CoreResult<Notification> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"INSERT INTO notifications ({NOTIFICATION_COLUMNS})
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                       $16, $17, $18, $19, $20, $21, $22, $23)
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(notification.id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.notification_type)
        .bind(notification.priority)
        .bind(notification.status)
        .bind(notification.channels)
        .bind(notification.recipient_id)
        .bind(notification.sender_id)
        .bind(notification.related_entity_id)
        .bind(&notification.related_entity_type)
        .bind(&notification.metadata)
        .bind(&notification.action_url)
        .bind(notification.template_id)
        .bind(notification.created_at)
        .bind(notification.sent_at)
        .bind(notification.delivered_at)
        .bind(notification.read_at)
        .bind(notification.expires_at)
        .bind(notification.delivery_attempts)
        .bind(&notification.last_error)
        .bind(notification.is_persistent)
        .bind(notification.is_dismissible)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_err(e, &notification.id.to_string()))
    }

    #[instrument(skip(self))]
    async fn get_notification(&self, id: NotificationId) -> CoreResult<Option<Notification>> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)
    }

    #[instrument(skip(self, notification))]
    async fn update_notification(&self, notification: Notification) -> CoreResult<Notification> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"UPDATE notifications
               SET status = $2, sent_at = $3, delivered_at = $4, read_at = $5,
                   delivery_attempts = $6, last_error = $7
               WHERE id = $1
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(notification.id)
        .bind(notification.status)
        .bind(notification.sent_at)
        .bind(notification.delivered_at)
        .bind(notification.read_at)
        .bind(notification.delivery_attempts)
        .bind(&notification.last_error)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| CoreError::not_found(format!("notification {}", notification.id)))
    }

    #[instrument(skip(self))]
    async fn list_by_status(&self, status: NotificationStatus) -> CoreResult<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE status = $1 ORDER BY created_at"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    #[instrument(skip(self))]
    async fn record_delivery(&self, id: NotificationId, channel: Channel) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"INSERT INTO notification_deliveries (notification_id, channel, delivered_at)
               VALUES ($1, $2, NOW())
               ON CONFLICT (notification_id, channel) DO NOTHING"#,
        )
        .bind(id)
        .bind(channel.bit() as i16)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }
}
