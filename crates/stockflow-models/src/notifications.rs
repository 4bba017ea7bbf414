//! Notification instances and templates.
//!
//! A notification is append-mostly: after creation only status transitions
//! and delivery bookkeeping mutate it. The legal lifecycle is
//! `Pending -> Sent -> Delivered -> Read`, with `Pending/Sent -> Failed` on
//! delivery errors (retryable until the configured attempt limit),
//! `Pending -> Cancelled`, and `* -> Expired` for anything not yet read once
//! `expires_at` passes.

use crate::channels::ChannelMask;
use crate::enums::{NotificationPriority, NotificationStatus, NotificationType};
use crate::ids::{NotificationId, TemplateId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stockflow_core::{CoreError, CoreResult};
use validator::Validate;

/// A notification addressed to a user through one or more channels.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: NotificationPriority,
    pub status: NotificationStatus,
    pub channels: ChannelMask,
    pub recipient_id: Option<UserId>,
    pub sender_id: Option<UserId>,
    /// Related entity (e.g. a product for stock alerts).
    pub related_entity_id: Option<uuid::Uuid>,
    pub related_entity_type: Option<String>,
    /// Additional metadata as JSON.
    pub metadata: Option<String>,
    /// URL to navigate to when the notification is activated.
    pub action_url: Option<String>,
    pub template_id: Option<TemplateId>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub delivery_attempts: i32,
    pub last_error: Option<String>,
    pub is_persistent: bool,
    pub is_dismissible: bool,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        notification_type: NotificationType,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            title: title.into(),
            message: message.into(),
            notification_type,
            priority: NotificationPriority::Normal,
            status: NotificationStatus::Pending,
            channels: ChannelMask::IN_APP,
            recipient_id: None,
            sender_id: None,
            related_entity_id: None,
            related_entity_type: None,
            metadata: None,
            action_url: None,
            template_id: None,
            created_at: Utc::now(),
            sent_at: None,
            delivered_at: None,
            read_at: None,
            expires_at: None,
            delivery_attempts: 0,
            last_error: None,
            is_persistent: true,
            is_dismissible: true,
        }
    }

    pub fn set_recipient(&mut self, recipient: UserId) {
        self.recipient_id = Some(recipient);
    }

    pub fn set_sender(&mut self, sender: UserId) {
        self.sender_id = Some(sender);
    }

    pub fn set_priority(&mut self, priority: NotificationPriority) {
        self.priority = priority;
    }

    pub fn set_channels(&mut self, channels: ChannelMask) {
        self.channels = channels;
    }

    pub fn set_related_entity(&mut self, entity_id: uuid::Uuid, entity_type: impl Into<String>) {
        self.related_entity_id = Some(entity_id);
        self.related_entity_type = Some(entity_type.into());
    }

    pub fn set_action_url(&mut self, url: impl Into<String>) {
        self.action_url = Some(url.into());
    }

    pub fn set_template(&mut self, template_id: TemplateId) {
        self.template_id = Some(template_id);
    }

    pub fn set_expiration(&mut self, expires_at: DateTime<Utc>) {
        self.expires_at = Some(expires_at);
    }

    /// Whether the expiry timestamp has passed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now > e)
    }

    /// `Pending -> Sent`.
    pub fn mark_sent(&mut self) -> CoreResult<()> {
        self.transition(NotificationStatus::Pending, NotificationStatus::Sent)?;
        self.sent_at = Some(Utc::now());
        Ok(())
    }

    /// `Sent -> Delivered`.
    pub fn mark_delivered(&mut self) -> CoreResult<()> {
        self.transition(NotificationStatus::Sent, NotificationStatus::Delivered)?;
        self.delivered_at = Some(Utc::now());
        Ok(())
    }

    /// `Delivered -> Read`.
    pub fn mark_read(&mut self) -> CoreResult<()> {
        self.transition(NotificationStatus::Delivered, NotificationStatus::Read)?;
        self.read_at = Some(Utc::now());
        Ok(())
    }

    /// Record a failed delivery attempt. Legal from `Pending`, `Sent`, or an
    /// earlier `Failed` (a retry that failed again); each call increments
    /// the attempt counter.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> CoreResult<()> {
        match self.status {
            NotificationStatus::Pending | NotificationStatus::Sent | NotificationStatus::Failed => {
                self.status = NotificationStatus::Failed;
                self.last_error = Some(error.into());
                self.delivery_attempts += 1;
                Ok(())
            }
            from => Err(self.illegal(from, NotificationStatus::Failed)),
        }
    }

    /// Cancel a notification. Only legal from `Pending`.
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.transition(NotificationStatus::Pending, NotificationStatus::Cancelled)
    }

    /// Move to `Expired`. Legal from any non-terminal state; a no-op error
    /// for `Read`/`Cancelled`/`Expired`.
    pub fn expire(&mut self) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(self.illegal(self.status, NotificationStatus::Expired));
        }
        self.status = NotificationStatus::Expired;
        Ok(())
    }

    /// Whether another delivery attempt is allowed.
    pub fn can_retry_delivery(&self, max_attempts: i32, now: DateTime<Utc>) -> bool {
        self.status == NotificationStatus::Failed
            && self.delivery_attempts < max_attempts
            && !self.is_expired_at(now)
    }

    fn transition(
        &mut self,
        from: NotificationStatus,
        to: NotificationStatus,
    ) -> CoreResult<()> {
        if self.status != from {
            return Err(self.illegal(self.status, to));
        }
        self.status = to;
        Ok(())
    }

    fn illegal(&self, from: NotificationStatus, to: NotificationStatus) -> CoreError {
        CoreError::InvalidTransition(format!("{} -> {} (notification {})", from, to, self.id))
    }
}

/// A reusable template for generating consistent notifications.
///
/// Title and message contain `{placeholder}` tokens substituted at
/// instantiation time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationTemplate {
    pub id: TemplateId,
    pub name: String,
    pub description: Option<String>,
    pub title_template: String,
    pub message_template: String,
    pub notification_type: NotificationType,
    pub default_priority: NotificationPriority,
    pub default_channels: ChannelMask,
    pub is_active: bool,
    pub is_persistent: bool,
    pub is_dismissible: bool,
    pub default_action_url: Option<String>,
    pub expiration_hours: Option<i32>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NotificationTemplate {
    pub fn new(
        name: impl Into<String>,
        title_template: impl Into<String>,
        message_template: impl Into<String>,
        notification_type: NotificationType,
        created_by: UserId,
    ) -> Self {
        Self {
            id: TemplateId::new(),
            name: name.into(),
            description: None,
            title_template: title_template.into(),
            message_template: message_template.into(),
            notification_type,
            default_priority: NotificationPriority::Normal,
            default_channels: ChannelMask::IN_APP,
            is_active: true,
            is_persistent: true,
            is_dismissible: true,
            default_action_url: None,
            expiration_hours: None,
            created_by,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.updated_at = Some(Utc::now());
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Some(Utc::now());
    }

    pub fn update_content(
        &mut self,
        name: impl Into<String>,
        title_template: impl Into<String>,
        message_template: impl Into<String>,
    ) {
        self.name = name.into();
        self.title_template = title_template.into();
        self.message_template = message_template.into();
        self.updated_at = Some(Utc::now());
    }
}

/// DTO for creating a template.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTemplateDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title_template: String,
    #[validate(length(min = 1, max = 2000))]
    pub message_template: String,
    pub notification_type: NotificationType,
    pub default_priority: Option<NotificationPriority>,
    pub default_channels: Option<ChannelMask>,
    pub default_action_url: Option<String>,
    #[validate(range(min = 1, max = 8760))]
    pub expiration_hours: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn notif() -> Notification {
        Notification::new("Stock low", "Widget stock is low", NotificationType::StockAlert)
    }

    #[test]
    fn happy_path_lifecycle() {
        let mut n = notif();
        assert_eq!(n.status, NotificationStatus::Pending);

        n.mark_sent().unwrap();
        assert_eq!(n.status, NotificationStatus::Sent);
        assert!(n.sent_at.is_some());

        n.mark_delivered().unwrap();
        n.mark_read().unwrap();
        assert_eq!(n.status, NotificationStatus::Read);
        assert!(n.read_at.is_some());
    }

    #[test]
    fn cancel_only_from_pending() {
        let mut n = notif();
        n.mark_sent().unwrap();
        assert!(matches!(
            n.cancel(),
            Err(CoreError::InvalidTransition(_))
        ));

        let mut fresh = notif();
        fresh.cancel().unwrap();
        assert_eq!(fresh.status, NotificationStatus::Cancelled);
    }

    #[test]
    fn failure_increments_attempts_and_allows_retry() {
        let mut n = notif();
        n.mark_failed("smtp timeout").unwrap();
        assert_eq!(n.status, NotificationStatus::Failed);
        assert_eq!(n.delivery_attempts, 1);
        assert!(n.can_retry_delivery(3, Utc::now()));

        n.mark_failed("smtp timeout").unwrap();
        n.mark_failed("smtp timeout").unwrap();
        assert_eq!(n.delivery_attempts, 3);
        assert!(!n.can_retry_delivery(3, Utc::now()));
    }

    #[test]
    fn read_notifications_never_expire() {
        let mut n = notif();
        n.mark_sent().unwrap();
        n.mark_delivered().unwrap();
        n.mark_read().unwrap();
        assert!(n.expire().is_err());
    }

    #[test]
    fn expiry_clock_check() {
        let mut n = notif();
        let now = Utc::now();
        n.set_expiration(now + Duration::hours(1));
        assert!(!n.is_expired_at(now));
        assert!(n.is_expired_at(now + Duration::hours(2)));

        n.expire().unwrap();
        assert_eq!(n.status, NotificationStatus::Expired);
    }

    #[test]
    fn skipping_states_is_rejected() {
        let mut n = notif();
        assert!(n.mark_delivered().is_err());
        assert!(n.mark_read().is_err());
    }

    #[test]
    fn expired_notifications_cannot_retry() {
        let mut n = notif();
        let now = Utc::now();
        n.set_expiration(now - Duration::minutes(1));
        n.mark_failed("boom").unwrap();
        assert!(!n.can_retry_delivery(3, now));
    }
}
