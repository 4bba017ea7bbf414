//! Notification dispatch.
//!
//! Drives one notification through the decision pipeline and the lifecycle:
//! persists it, asks the resolver what to do, logs per-channel deliveries
//! idempotently, and records the resulting status transitions. Actual
//! channel transports (email, push, ...) are external collaborators; this
//! module stops at the delivery log.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use stockflow_config::NotifyConfig;
use stockflow_core::CoreResult;
use stockflow_models::{ChannelMask, Notification, NotificationId};
use stockflow_store::NotificationStore;

use crate::batch::{BatchQueue, DueBatch};
use crate::defer::DeferredQueue;
use crate::preferences::{DeliveryDecision, PreferenceResolver};

/// What happened to a dispatched notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Sent and logged on these channels.
    Delivered(ChannelMask),
    /// Dropped; the notification was cancelled.
    Suppressed(String),
    /// Held until this instant, when the recipient's quiet window closes;
    /// still pending.
    Deferred(DateTime<Utc>),
    /// Queued for digest delivery; still pending.
    Batched,
}

/// The next instant the given time of day comes around: later today, or
/// tomorrow when it has already passed (a window wrapping midnight ends on
/// the following day).
fn next_occurrence(time: NaiveTime, now: DateTime<Utc>) -> DateTime<Utc> {
    let candidate = now.date_naive().and_time(time).and_utc();
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

pub struct Dispatcher {
    resolver: PreferenceResolver,
    notifications: Arc<dyn NotificationStore>,
    batch: Arc<BatchQueue>,
    deferred: Arc<DeferredQueue>,
    config: NotifyConfig,
}

impl Dispatcher {
    pub fn new(
        resolver: PreferenceResolver,
        notifications: Arc<dyn NotificationStore>,
        batch: Arc<BatchQueue>,
        deferred: Arc<DeferredQueue>,
        config: NotifyConfig,
    ) -> Self {
        Self {
            resolver,
            notifications,
            batch,
            deferred,
            config,
        }
    }

    /// Persists and dispatches one pending notification.
    #[instrument(skip(self, notification), fields(id = %notification.id))]
    pub async fn dispatch(
        &self,
        notification: Notification,
        now: DateTime<Utc>,
    ) -> CoreResult<DispatchOutcome> {
        let mut notification = self.notifications.insert_notification(notification).await?;

        match self.resolver.decide_for(&notification, now).await? {
            DeliveryDecision::Deliver => self.deliver(&mut notification, now).await,
            DeliveryDecision::Suppress(reason) => {
                notification.cancel()?;
                self.notifications.update_notification(notification).await?;
                info!(%reason, "notification suppressed");
                Ok(DispatchOutcome::Suppressed(reason))
            }
            DeliveryDecision::DeferUntil(end) => {
                let due_at = next_occurrence(end, now);
                self.deferred.push(notification.id, due_at);
                info!(until = %due_at, "notification deferred past quiet hours");
                Ok(DispatchOutcome::Deferred(due_at))
            }
            DeliveryDecision::Batch { interval_minutes } => {
                self.batch.push(notification, interval_minutes, now);
                Ok(DispatchOutcome::Batched)
            }
        }
    }

    async fn deliver(
        &self,
        notification: &mut Notification,
        _now: DateTime<Utc>,
    ) -> CoreResult<DispatchOutcome> {
        let channels = match notification.recipient_id {
            Some(recipient) => {
                self.resolver
                    .effective_channels(
                        recipient,
                        notification.notification_type,
                        notification.priority,
                        notification.channels,
                    )
                    .await?
            }
            None => notification.channels,
        };

        if channels.is_empty() {
            notification.cancel()?;
            self.notifications
                .update_notification(notification.clone())
                .await?;
            return Ok(DispatchOutcome::Suppressed(
                "no enabled channels".to_string(),
            ));
        }

        notification.mark_sent()?;
        self.notifications
            .update_notification(notification.clone())
            .await?;

        for channel in channels.channels() {
            self.notifications
                .record_delivery(notification.id, channel)
                .await?;
        }

        notification.mark_delivered()?;
        self.notifications
            .update_notification(notification.clone())
            .await?;
        info!(?channels, "notification delivered");
        Ok(DispatchOutcome::Delivered(channels))
    }

    /// Delivers every batch whose interval has elapsed.
    #[instrument(skip(self))]
    pub async fn flush_batches(&self, now: DateTime<Utc>) -> CoreResult<Vec<DueBatch>> {
        let due = self.batch.flush_due(now);
        for batch in &due {
            for queued in &batch.notifications {
                if let Some(mut stored) = self.notifications.get_notification(queued.id).await? {
                    self.deliver(&mut stored, now).await?;
                }
            }
        }
        Ok(due)
    }

    /// Delivers every deferred notification whose quiet window has closed.
    #[instrument(skip(self))]
    pub async fn flush_deferred(&self, now: DateTime<Utc>) -> CoreResult<Vec<NotificationId>> {
        let due = self.deferred.flush_due(now);
        for id in &due {
            if let Some(mut stored) = self.notifications.get_notification(*id).await? {
                self.deliver(&mut stored, now).await?;
            }
        }
        Ok(due)
    }

    /// Records a failed delivery attempt. Returns whether another attempt
    /// is still allowed under the configured limit.
    #[instrument(skip(self))]
    pub async fn record_failure(
        &self,
        id: NotificationId,
        error: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<bool> {
        let mut notification = self
            .notifications
            .get_notification(id)
            .await?
            .ok_or_else(|| stockflow_core::CoreError::not_found(format!("notification {id}")))?;

        notification.mark_failed(error)?;
        let retryable = notification.can_retry_delivery(self.config.max_delivery_attempts, now);
        if !retryable {
            warn!(attempts = notification.delivery_attempts, "delivery attempts exhausted");
        }
        self.notifications.update_notification(notification).await?;
        Ok(retryable)
    }
}
