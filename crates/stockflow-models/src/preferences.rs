//! Per-user notification preference rows.
//!
//! One row per (user, notification type). The resolver consults these before
//! any delivery decision; absent rows are synthesized with the defaults in
//! [`NotificationPreference::default_for`].

use crate::channels::{Channel, ChannelMask};
use crate::enums::{NotificationPriority, NotificationType};
use crate::ids::{PreferenceId, UserId};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stockflow_core::{CoreError, CoreResult};
use validator::Validate;

/// A user's delivery preference for one notification type.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationPreference {
    pub id: PreferenceId,
    pub user_id: UserId,
    pub notification_type: NotificationType,
    pub enabled_channels: ChannelMask,
    pub is_enabled: bool,
    pub minimum_priority: NotificationPriority,
    /// Both bounds are set or neither. `quiet_hours_end` earlier than
    /// `quiet_hours_start` means the window spans midnight.
    pub quiet_hours_start: Option<NaiveTime>,
    pub quiet_hours_end: Option<NaiveTime>,
    pub respect_quiet_hours: bool,
    pub batching_interval_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NotificationPreference {
    /// The synthesized default used when a user has no row for a type:
    /// enabled, in-app only, minimum priority Low.
    pub fn default_for(user_id: UserId, notification_type: NotificationType) -> Self {
        Self {
            id: PreferenceId::new(),
            user_id,
            notification_type,
            enabled_channels: ChannelMask::IN_APP,
            is_enabled: true,
            minimum_priority: NotificationPriority::Low,
            quiet_hours_start: None,
            quiet_hours_end: None,
            respect_quiet_hours: true,
            batching_interval_minutes: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    pub fn enable(&mut self) {
        self.is_enabled = true;
        self.touch();
    }

    pub fn disable(&mut self) {
        self.is_enabled = false;
        self.touch();
    }

    pub fn set_minimum_priority(&mut self, priority: NotificationPriority) {
        self.minimum_priority = priority;
        self.touch();
    }

    pub fn update_channels(&mut self, channels: ChannelMask) {
        self.enabled_channels = channels;
        self.touch();
    }

    pub fn add_channel(&mut self, channel: Channel) {
        self.enabled_channels.insert(channel);
        self.touch();
    }

    pub fn remove_channel(&mut self, channel: Channel) {
        self.enabled_channels.remove(channel);
        self.touch();
    }

    pub fn has_channel(&self, channel: Channel) -> bool {
        self.enabled_channels.contains(channel)
    }

    /// Set the quiet-hours window. Both bounds are required together.
    pub fn set_quiet_hours(&mut self, start: NaiveTime, end: NaiveTime) {
        self.quiet_hours_start = Some(start);
        self.quiet_hours_end = Some(end);
        self.respect_quiet_hours = true;
        self.touch();
    }

    pub fn disable_quiet_hours(&mut self) {
        self.respect_quiet_hours = false;
        self.touch();
    }

    pub fn set_batching(&mut self, interval_minutes: i32) {
        self.batching_interval_minutes = Some(interval_minutes);
        self.touch();
    }

    pub fn disable_batching(&mut self) {
        self.batching_interval_minutes = None;
        self.touch();
    }

    /// Enforce the both-or-neither quiet-hours invariant. Stores call this
    /// before persisting a row.
    pub fn validate_quiet_hours(&self) -> CoreResult<()> {
        match (self.quiet_hours_start, self.quiet_hours_end) {
            (Some(_), Some(_)) | (None, None) => Ok(()),
            _ => Err(CoreError::InvalidQuietHours),
        }
    }

    /// Whether a time of day falls inside the configured quiet window.
    ///
    /// Returns `false` when quiet hours are unset or not respected. A window
    /// whose end precedes its start spans midnight: the inside test becomes
    /// `start <= now || now < end`; otherwise `start <= now < end`.
    pub fn is_in_quiet_hours_at(&self, now: NaiveTime) -> bool {
        if !self.respect_quiet_hours {
            return false;
        }
        let (Some(start), Some(end)) = (self.quiet_hours_start, self.quiet_hours_end) else {
            return false;
        };

        if end < start {
            start <= now || now < end
        } else {
            start <= now && now < end
        }
    }
}

/// DTO for updating one preference row.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePreferenceDto {
    pub notification_type: NotificationType,
    pub enabled_channels: ChannelMask,
    pub is_enabled: bool,
    pub minimum_priority: NotificationPriority,
    pub quiet_hours_start: Option<NaiveTime>,
    pub quiet_hours_end: Option<NaiveTime>,
    pub respect_quiet_hours: Option<bool>,
    #[validate(range(min = 1, max = 1440, message = "Batching interval must be 1-1440 minutes"))]
    pub batching_interval_minutes: Option<i32>,
}
