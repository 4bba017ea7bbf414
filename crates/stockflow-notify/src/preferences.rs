//! Delivery decision pipeline and preference management.
//!
//! A failing preference lookup falls back to the synthesized default row,
//! which then runs through the same pipeline as a stored one. A lookup that
//! exceeds the configured timeout aborts the evaluation with
//! `CoreError::Timeout` instead of hanging.

use std::sync::Arc;
use tracing::{debug, instrument, warn};
use validator::Validate;

use chrono::{DateTime, NaiveTime, Utc};
use stockflow_config::NotifyConfig;
use stockflow_core::{CoreError, CoreResult};
use stockflow_models::preferences::UpdatePreferenceDto;
use stockflow_models::{
    Channel, ChannelMask, Notification, NotificationPreference, NotificationPriority,
    NotificationType, UserId,
};
use stockflow_store::{PreferenceMutation, PreferenceStore};

/// What the dispatcher should do with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryDecision {
    /// Deliver now on the effective channels.
    Deliver,
    /// Drop it; the reason is for logs, not for users.
    Suppress(String),
    /// Hold until the recipient's quiet window closes at this time of day.
    DeferUntil(NaiveTime),
    /// Accumulate and deliver as a digest on this interval.
    Batch { interval_minutes: i32 },
}

/// Decides whether, when, and where a notification reaches a user.
pub struct PreferenceResolver {
    store: Arc<dyn PreferenceStore>,
    config: NotifyConfig,
}

impl PreferenceResolver {
    pub fn new(store: Arc<dyn PreferenceStore>, config: NotifyConfig) -> Self {
        Self { store, config }
    }

    /// Fetches the preference row, synthesizing the default when the row is
    /// absent or the store fails. A lookup exceeding the configured timeout
    /// aborts the evaluation with `Timeout`.
    async fn preference_or_default(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
    ) -> CoreResult<NotificationPreference> {
        let lookup = self.store.get_preference(user_id, notification_type);
        match tokio::time::timeout(self.config.preference_timeout, lookup).await {
            Ok(Ok(Some(preference))) => Ok(preference),
            Ok(Ok(None)) => Ok(NotificationPreference::default_for(
                user_id,
                notification_type,
            )),
            Ok(Err(e)) => {
                warn!(user = %user_id, error = %e, "preference lookup failed, using defaults");
                Ok(NotificationPreference::default_for(
                    user_id,
                    notification_type,
                ))
            }
            Err(_) => Err(CoreError::Timeout(format!(
                "preference lookup for user {user_id}"
            ))),
        }
    }

    /// Runs the gate pipeline. Gates short-circuit in order: emergency
    /// bypass, enabled, minimum priority, quiet hours, batching.
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn decide(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        priority: NotificationPriority,
        now: DateTime<Utc>,
    ) -> CoreResult<DeliveryDecision> {
        if priority == NotificationPriority::Emergency && self.config.emergency_bypass {
            debug!("emergency bypass, skipping preference gates");
            return Ok(DeliveryDecision::Deliver);
        }

        let preference = self.preference_or_default(user_id, notification_type).await?;

        if !preference.is_enabled {
            return Ok(DeliveryDecision::Suppress(format!(
                "{notification_type:?} notifications disabled"
            )));
        }

        if priority < preference.minimum_priority {
            return Ok(DeliveryDecision::Suppress(format!(
                "priority {priority:?} below minimum {:?}",
                preference.minimum_priority
            )));
        }

        // Critical and above punch through quiet hours and batching.
        if priority < NotificationPriority::Critical {
            if preference.is_in_quiet_hours_at(now.time()) {
                // Both bounds are present whenever the window matched.
                if let Some(end) = preference.quiet_hours_end {
                    return Ok(DeliveryDecision::DeferUntil(end));
                }
            }

            if let Some(interval_minutes) = preference.batching_interval_minutes {
                return Ok(DeliveryDecision::Batch { interval_minutes });
            }
        }

        Ok(DeliveryDecision::Deliver)
    }

    /// Whether the notification goes out immediately on the given channel:
    /// the pipeline must say `Deliver` and the channel must survive the
    /// user's mask.
    pub async fn should_deliver(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        priority: NotificationPriority,
        channel: Channel,
        now: DateTime<Utc>,
    ) -> CoreResult<bool> {
        if self
            .decide(user_id, notification_type, priority, now)
            .await?
            != DeliveryDecision::Deliver
        {
            return Ok(false);
        }
        let effective = self
            .effective_channels(
                user_id,
                notification_type,
                priority,
                ChannelMask::only(channel),
            )
            .await?;
        Ok(effective.contains(channel))
    }

    /// The channels a delivery may use: the requested mask intersected with
    /// the user's enabled channels, once the enabled and minimum-priority
    /// gates have passed. A disabled type or an unmet minimum yields the
    /// empty mask; emergency bypass keeps the requested mask untouched. An
    /// empty result is a value, not an error.
    pub async fn effective_channels(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        priority: NotificationPriority,
        requested: ChannelMask,
    ) -> CoreResult<ChannelMask> {
        if priority == NotificationPriority::Emergency && self.config.emergency_bypass {
            return Ok(requested);
        }
        let preference = self.preference_or_default(user_id, notification_type).await?;
        if !preference.is_enabled || priority < preference.minimum_priority {
            return Ok(ChannelMask::NONE);
        }
        Ok(requested & preference.enabled_channels)
    }

    /// Convenience wrapper taking the notification itself. Notifications
    /// without a recipient (broadcasts) always deliver.
    pub async fn decide_for(
        &self,
        notification: &Notification,
        now: DateTime<Utc>,
    ) -> CoreResult<DeliveryDecision> {
        match notification.recipient_id {
            Some(recipient) => {
                self.decide(
                    recipient,
                    notification.notification_type,
                    notification.priority,
                    now,
                )
                .await
            }
            None => Ok(DeliveryDecision::Deliver),
        }
    }
}

/// Preference row management on behalf of users.
pub struct PreferenceService {
    store: Arc<dyn PreferenceStore>,
}

impl PreferenceService {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    async fn load_or_default(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
    ) -> CoreResult<NotificationPreference> {
        Ok(self
            .store
            .get_preference(user_id, notification_type)
            .await?
            .unwrap_or_else(|| NotificationPreference::default_for(user_id, notification_type)))
    }

    /// The user's full preference matrix, synthesizing defaults for types
    /// without a stored row.
    pub async fn effective_preferences(
        &self,
        user_id: UserId,
    ) -> CoreResult<Vec<NotificationPreference>> {
        let stored = self.store.list_preferences(user_id).await?;
        let mut all = Vec::with_capacity(NotificationType::ALL.len());
        for notification_type in NotificationType::ALL {
            match stored
                .iter()
                .find(|p| p.notification_type == notification_type)
            {
                Some(row) => all.push(row.clone()),
                None => all.push(NotificationPreference::default_for(
                    user_id,
                    notification_type,
                )),
            }
        }
        Ok(all)
    }

    /// Applies one update row. Read-modify-write through the store's upsert.
    #[instrument(skip(self, dto), fields(user = %user_id))]
    pub async fn update(
        &self,
        user_id: UserId,
        dto: UpdatePreferenceDto,
    ) -> CoreResult<NotificationPreference> {
        dto.validate()
            .map_err(|e| CoreError::validation(e.to_string()))?;

        let mut preference = self.load_or_default(user_id, dto.notification_type).await?;
        preference.update_channels(dto.enabled_channels);
        if dto.is_enabled {
            preference.enable();
        } else {
            preference.disable();
        }
        preference.set_minimum_priority(dto.minimum_priority);
        preference.quiet_hours_start = dto.quiet_hours_start;
        preference.quiet_hours_end = dto.quiet_hours_end;
        if let Some(respect) = dto.respect_quiet_hours {
            preference.respect_quiet_hours = respect;
        }
        preference.batching_interval_minutes = dto.batching_interval_minutes;

        self.store.upsert_preference(preference).await
    }

    /// Applies several update rows atomically: one invalid row rejects the
    /// whole batch.
    #[instrument(skip(self, dtos), fields(user = %user_id, rows = dtos.len()))]
    pub async fn bulk_update(
        &self,
        user_id: UserId,
        dtos: Vec<UpdatePreferenceDto>,
    ) -> CoreResult<Vec<NotificationPreference>> {
        let mut rows = Vec::with_capacity(dtos.len());
        for dto in dtos {
            dto.validate()
                .map_err(|e| CoreError::validation(e.to_string()))?;
            let mut preference = self.load_or_default(user_id, dto.notification_type).await?;
            preference.update_channels(dto.enabled_channels);
            preference.is_enabled = dto.is_enabled;
            preference.minimum_priority = dto.minimum_priority;
            preference.quiet_hours_start = dto.quiet_hours_start;
            preference.quiet_hours_end = dto.quiet_hours_end;
            if let Some(respect) = dto.respect_quiet_hours {
                preference.respect_quiet_hours = respect;
            }
            preference.batching_interval_minutes = dto.batching_interval_minutes;
            rows.push(preference);
        }
        self.store.upsert_preferences(rows).await
    }

    // Field-level edits go through the store's atomic read-modify-write so
    // two racing edits cannot overwrite each other with stale full rows.

    #[instrument(skip(self))]
    pub async fn set_quiet_hours(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        start: NaiveTime,
        end: NaiveTime,
    ) -> CoreResult<NotificationPreference> {
        self.store
            .modify_preference(
                user_id,
                notification_type,
                PreferenceMutation::SetQuietHours(start, end),
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn clear_quiet_hours(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
    ) -> CoreResult<NotificationPreference> {
        self.store
            .modify_preference(user_id, notification_type, PreferenceMutation::ClearQuietHours)
            .await
    }

    #[instrument(skip(self))]
    pub async fn set_batching(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        interval_minutes: i32,
    ) -> CoreResult<NotificationPreference> {
        if !(1..=1440).contains(&interval_minutes) {
            return Err(CoreError::validation(
                "batching interval must be 1-1440 minutes",
            ));
        }
        self.store
            .modify_preference(
                user_id,
                notification_type,
                PreferenceMutation::SetBatching(interval_minutes),
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn clear_batching(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
    ) -> CoreResult<NotificationPreference> {
        self.store
            .modify_preference(user_id, notification_type, PreferenceMutation::ClearBatching)
            .await
    }

    #[instrument(skip(self))]
    pub async fn set_enabled(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        enabled: bool,
    ) -> CoreResult<NotificationPreference> {
        self.store
            .modify_preference(
                user_id,
                notification_type,
                PreferenceMutation::SetEnabled(enabled),
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn set_minimum_priority(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        priority: NotificationPriority,
    ) -> CoreResult<NotificationPreference> {
        self.store
            .modify_preference(
                user_id,
                notification_type,
                PreferenceMutation::SetMinimumPriority(priority),
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn add_channel(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        channel: Channel,
    ) -> CoreResult<NotificationPreference> {
        self.store
            .modify_preference(
                user_id,
                notification_type,
                PreferenceMutation::AddChannel(channel),
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn remove_channel(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        channel: Channel,
    ) -> CoreResult<NotificationPreference> {
        self.store
            .modify_preference(
                user_id,
                notification_type,
                PreferenceMutation::RemoveChannel(channel),
            )
            .await
    }

    /// Persists the default row for every notification type the user has no
    /// row for yet.
    #[instrument(skip(self))]
    pub async fn seed_defaults(&self, user_id: UserId) -> CoreResult<u32> {
        let mut created = 0;
        for notification_type in NotificationType::ALL {
            if self
                .store
                .get_preference(user_id, notification_type)
                .await?
                .is_none()
            {
                self.store
                    .upsert_preference(NotificationPreference::default_for(
                        user_id,
                        notification_type,
                    ))
                    .await?;
                created += 1;
            }
        }
        Ok(created)
    }

    /// Drops every stored row and re-seeds the defaults.
    #[instrument(skip(self))]
    pub async fn reset_to_defaults(&self, user_id: UserId) -> CoreResult<()> {
        self.store.delete_preferences_for_user(user_id).await?;
        self.seed_defaults(user_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_store::MemoryStore;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc::now()
            .date_naive()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
            .and_utc()
    }

    struct Fixture {
        resolver: PreferenceResolver,
        service: PreferenceService,
        user: UserId,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture {
            resolver: PreferenceResolver::new(store.clone(), NotifyConfig::default()),
            service: PreferenceService::new(store),
            user: UserId::new(),
        }
    }

    #[tokio::test]
    async fn absent_row_delivers_with_defaults() {
        let f = fixture();
        let decision = f
            .resolver
            .decide(
                f.user,
                NotificationType::StockAlert,
                NotificationPriority::Low,
                at(12),
            )
            .await
            .unwrap();
        assert_eq!(decision, DeliveryDecision::Deliver);

        let channels = f
            .resolver
            .effective_channels(
                f.user,
                NotificationType::StockAlert,
                NotificationPriority::Low,
                ChannelMask::ALL,
            )
            .await
            .unwrap();
        assert_eq!(channels, ChannelMask::IN_APP);
    }

    #[tokio::test]
    async fn disabled_type_suppresses() {
        let f = fixture();
        f.service
            .set_enabled(f.user, NotificationType::Invoice, false)
            .await
            .unwrap();

        let decision = f
            .resolver
            .decide(
                f.user,
                NotificationType::Invoice,
                NotificationPriority::Critical,
                at(12),
            )
            .await
            .unwrap();
        assert!(matches!(decision, DeliveryDecision::Suppress(_)));
    }

    #[tokio::test]
    async fn priority_gate_suppresses_below_minimum() {
        let f = fixture();
        let mut pref = NotificationPreference::default_for(f.user, NotificationType::Info);
        pref.set_minimum_priority(NotificationPriority::High);
        f.service.store.upsert_preference(pref).await.unwrap();

        for (priority, delivered) in [
            (NotificationPriority::Low, false),
            (NotificationPriority::Normal, false),
            (NotificationPriority::High, true),
            (NotificationPriority::Critical, true),
        ] {
            let got = f
                .resolver
                .should_deliver(f.user, NotificationType::Info, priority, Channel::InApp, at(12))
                .await
                .unwrap();
            assert_eq!(got, delivered, "{priority:?}");
        }
    }

    #[tokio::test]
    async fn quiet_hours_defer_and_critical_punches_through() {
        let f = fixture();
        f.service
            .set_quiet_hours(f.user, NotificationType::StockAlert, t(22, 0), t(6, 0))
            .await
            .unwrap();

        let night = f
            .resolver
            .decide(
                f.user,
                NotificationType::StockAlert,
                NotificationPriority::Normal,
                at(23),
            )
            .await
            .unwrap();
        assert_eq!(night, DeliveryDecision::DeferUntil(t(6, 0)));

        let critical = f
            .resolver
            .decide(
                f.user,
                NotificationType::StockAlert,
                NotificationPriority::Critical,
                at(23),
            )
            .await
            .unwrap();
        assert_eq!(critical, DeliveryDecision::Deliver);

        let day = f
            .resolver
            .decide(
                f.user,
                NotificationType::StockAlert,
                NotificationPriority::Normal,
                at(12),
            )
            .await
            .unwrap();
        assert_eq!(day, DeliveryDecision::Deliver);
    }

    #[tokio::test]
    async fn batching_applies_below_critical() {
        let f = fixture();
        f.service
            .set_batching(f.user, NotificationType::Report, 30)
            .await
            .unwrap();

        let normal = f
            .resolver
            .decide(
                f.user,
                NotificationType::Report,
                NotificationPriority::Normal,
                at(12),
            )
            .await
            .unwrap();
        assert_eq!(normal, DeliveryDecision::Batch { interval_minutes: 30 });

        let critical = f
            .resolver
            .decide(
                f.user,
                NotificationType::Report,
                NotificationPriority::Critical,
                at(12),
            )
            .await
            .unwrap();
        assert_eq!(critical, DeliveryDecision::Deliver);
    }

    #[tokio::test]
    async fn emergency_bypass_skips_every_gate() {
        let f = fixture();
        f.service
            .set_enabled(f.user, NotificationType::System, false)
            .await
            .unwrap();

        let decision = f
            .resolver
            .decide(
                f.user,
                NotificationType::System,
                NotificationPriority::Emergency,
                at(23),
            )
            .await
            .unwrap();
        assert_eq!(decision, DeliveryDecision::Deliver);

        let channels = f
            .resolver
            .effective_channels(
                f.user,
                NotificationType::System,
                NotificationPriority::Emergency,
                ChannelMask::ALL,
            )
            .await
            .unwrap();
        assert_eq!(channels, ChannelMask::ALL);
    }

    #[tokio::test]
    async fn emergency_without_bypass_obeys_gates() {
        let store = Arc::new(MemoryStore::new());
        let config = NotifyConfig {
            emergency_bypass: false,
            ..NotifyConfig::default()
        };
        let resolver = PreferenceResolver::new(store.clone(), config);
        let service = PreferenceService::new(store);
        let user = UserId::new();

        service
            .set_enabled(user, NotificationType::System, false)
            .await
            .unwrap();

        let decision = resolver
            .decide(
                user,
                NotificationType::System,
                NotificationPriority::Emergency,
                at(12),
            )
            .await
            .unwrap();
        assert!(matches!(decision, DeliveryDecision::Suppress(_)));
    }

    #[tokio::test]
    async fn effective_channels_intersect() {
        let f = fixture();
        let mut pref = NotificationPreference::default_for(f.user, NotificationType::Payment);
        pref.update_channels(ChannelMask::only(Channel::Email) | ChannelMask::only(Channel::Sms));
        f.service.store.upsert_preference(pref).await.unwrap();

        let requested = ChannelMask::only(Channel::Email) | ChannelMask::only(Channel::Push);
        let effective = f
            .resolver
            .effective_channels(
                f.user,
                NotificationType::Payment,
                NotificationPriority::Normal,
                requested,
            )
            .await
            .unwrap();
        assert_eq!(effective, ChannelMask::only(Channel::Email));

        // Disjoint masks leave nothing; that is a valid outcome.
        let none = f
            .resolver
            .effective_channels(
                f.user,
                NotificationType::Payment,
                NotificationPriority::Normal,
                ChannelMask::only(Channel::Push),
            )
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn effective_channels_empty_for_disabled_type() {
        let f = fixture();
        f.service
            .set_enabled(f.user, NotificationType::Invoice, false)
            .await
            .unwrap();

        let channels = f
            .resolver
            .effective_channels(
                f.user,
                NotificationType::Invoice,
                NotificationPriority::Normal,
                ChannelMask::ALL,
            )
            .await
            .unwrap();
        assert!(channels.is_empty());
    }

    #[tokio::test]
    async fn effective_channels_empty_below_minimum_priority() {
        let f = fixture();
        f.service
            .set_minimum_priority(f.user, NotificationType::Info, NotificationPriority::High)
            .await
            .unwrap();

        let below = f
            .resolver
            .effective_channels(
                f.user,
                NotificationType::Info,
                NotificationPriority::Normal,
                ChannelMask::ALL,
            )
            .await
            .unwrap();
        assert!(below.is_empty());

        let at_minimum = f
            .resolver
            .effective_channels(
                f.user,
                NotificationType::Info,
                NotificationPriority::High,
                ChannelMask::ALL,
            )
            .await
            .unwrap();
        assert_eq!(at_minimum, ChannelMask::IN_APP);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_preference_lookup_surfaces_timeout() {
        struct StalledPreferences;

        #[async_trait::async_trait]
        impl PreferenceStore for StalledPreferences {
            async fn get_preference(
                &self,
                _user_id: UserId,
                _notification_type: NotificationType,
            ) -> CoreResult<Option<NotificationPreference>> {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                Ok(None)
            }

            async fn list_preferences(
                &self,
                _user_id: UserId,
            ) -> CoreResult<Vec<NotificationPreference>> {
                Ok(Vec::new())
            }

            async fn upsert_preference(
                &self,
                preference: NotificationPreference,
            ) -> CoreResult<NotificationPreference> {
                Ok(preference)
            }

            async fn modify_preference(
                &self,
                user_id: UserId,
                notification_type: NotificationType,
                _mutation: PreferenceMutation,
            ) -> CoreResult<NotificationPreference> {
                Ok(NotificationPreference::default_for(user_id, notification_type))
            }

            async fn upsert_preferences(
                &self,
                preferences: Vec<NotificationPreference>,
            ) -> CoreResult<Vec<NotificationPreference>> {
                Ok(preferences)
            }

            async fn delete_preferences_for_user(&self, _user_id: UserId) -> CoreResult<u64> {
                Ok(0)
            }
        }

        let resolver =
            PreferenceResolver::new(Arc::new(StalledPreferences), NotifyConfig::default());
        let err = resolver
            .decide(
                UserId::new(),
                NotificationType::Info,
                NotificationPriority::Normal,
                at(12),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Timeout(_)));
        assert!(err.is_store_failure());
    }

    #[tokio::test]
    async fn racing_field_edits_both_survive() {
        let f = fixture();
        let (email, sms) = tokio::join!(
            f.service
                .add_channel(f.user, NotificationType::Payment, Channel::Email),
            f.service
                .add_channel(f.user, NotificationType::Payment, Channel::Sms),
        );
        email.unwrap();
        sms.unwrap();

        let stored = f
            .service
            .store
            .get_preference(f.user, NotificationType::Payment)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.has_channel(Channel::Email));
        assert!(stored.has_channel(Channel::Sms));
    }

    #[tokio::test]
    async fn seed_and_reset_round_trip() {
        let f = fixture();
        let created = f.service.seed_defaults(f.user).await.unwrap();
        assert_eq!(created as usize, NotificationType::ALL.len());
        assert_eq!(f.service.seed_defaults(f.user).await.unwrap(), 0);

        f.service
            .set_enabled(f.user, NotificationType::Invoice, false)
            .await
            .unwrap();
        f.service.reset_to_defaults(f.user).await.unwrap();

        let all = f.service.effective_preferences(f.user).await.unwrap();
        assert!(all.iter().all(|p| p.is_enabled));
    }

    #[tokio::test]
    async fn bulk_update_is_atomic() {
        let f = fixture();

        let good = UpdatePreferenceDto {
            notification_type: NotificationType::Invoice,
            enabled_channels: ChannelMask::ALL,
            is_enabled: true,
            minimum_priority: NotificationPriority::Low,
            quiet_hours_start: None,
            quiet_hours_end: None,
            respect_quiet_hours: None,
            batching_interval_minutes: None,
        };
        let bad = UpdatePreferenceDto {
            notification_type: NotificationType::Payment,
            enabled_channels: ChannelMask::ALL,
            is_enabled: true,
            minimum_priority: NotificationPriority::Low,
            quiet_hours_start: Some(t(22, 0)),
            quiet_hours_end: None,
            respect_quiet_hours: None,
            batching_interval_minutes: None,
        };

        let err = f.service.bulk_update(f.user, vec![good, bad]).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuietHours));

        // Nothing was applied.
        assert!(f
            .service
            .store
            .list_preferences(f.user)
            .await
            .unwrap()
            .is_empty());
    }
}
