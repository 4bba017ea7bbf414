//! Batched-delivery accumulation.
//!
//! Notifications the resolver marks `Batch` land here, keyed by
//! (recipient, type). The queue does not run a timer; the dispatcher calls
//! [`BatchQueue::flush_due`] on its own schedule and delivers what comes
//! back as digests.

use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use chrono::{DateTime, Duration, Utc};
use stockflow_models::{Notification, NotificationType, UserId};

struct PendingBatch {
    first_queued_at: DateTime<Utc>,
    interval_minutes: i32,
    notifications: Vec<Notification>,
}

/// A batch ready for digest delivery.
#[derive(Debug)]
pub struct DueBatch {
    pub user_id: UserId,
    pub notification_type: NotificationType,
    pub notifications: Vec<Notification>,
}

/// In-process accumulation of batched notifications.
#[derive(Default)]
pub struct BatchQueue {
    pending: Mutex<HashMap<(UserId, NotificationType), PendingBatch>>,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a notification. The batch's deadline is set by the *first*
    /// push; later pushes join the open batch without extending it.
    pub fn push(&self, notification: Notification, interval_minutes: i32, now: DateTime<Utc>) {
        let Some(user_id) = notification.recipient_id else {
            debug!("batched notification without recipient dropped");
            return;
        };
        let key = (user_id, notification.notification_type);

        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending
            .entry(key)
            .or_insert_with(|| PendingBatch {
                first_queued_at: now,
                interval_minutes,
                notifications: Vec::new(),
            })
            .notifications
            .push(notification);
    }

    /// Removes and returns every batch whose interval has elapsed.
    pub fn flush_due(&self, now: DateTime<Utc>) -> Vec<DueBatch> {
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let due_keys: Vec<(UserId, NotificationType)> = pending
            .iter()
            .filter(|(_, batch)| {
                now >= batch.first_queued_at + Duration::minutes(batch.interval_minutes as i64)
            })
            .map(|(key, _)| *key)
            .collect();

        due_keys
            .into_iter()
            .filter_map(|key| {
                pending.remove(&key).map(|batch| DueBatch {
                    user_id: key.0,
                    notification_type: key.1,
                    notifications: batch.notifications,
                })
            })
            .collect()
    }

    /// Pending notification count across all open batches.
    pub fn len(&self) -> usize {
        match self.pending.lock() {
            Ok(guard) => guard.values().map(|b| b.notifications.len()).sum(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_models::NotificationType;

    fn notification(user: UserId, ty: NotificationType) -> Notification {
        let mut n = Notification::new("t", "m", ty);
        n.set_recipient(user);
        n
    }

    #[test]
    fn flush_respects_the_interval() {
        let queue = BatchQueue::new();
        let user = UserId::new();
        let start = Utc::now();

        queue.push(notification(user, NotificationType::Report), 30, start);
        queue.push(notification(user, NotificationType::Report), 30, start);

        assert!(queue.flush_due(start + Duration::minutes(29)).is_empty());
        assert_eq!(queue.len(), 2);

        let due = queue.flush_due(start + Duration::minutes(30));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].notifications.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn batches_are_keyed_by_user_and_type() {
        let queue = BatchQueue::new();
        let (a, b) = (UserId::new(), UserId::new());
        let start = Utc::now();

        queue.push(notification(a, NotificationType::Report), 10, start);
        queue.push(notification(a, NotificationType::Invoice), 10, start);
        queue.push(notification(b, NotificationType::Report), 10, start);

        let due = queue.flush_due(start + Duration::minutes(10));
        assert_eq!(due.len(), 3);
        assert!(due.iter().all(|d| d.notifications.len() == 1));
    }

    #[test]
    fn later_pushes_do_not_extend_the_deadline() {
        let queue = BatchQueue::new();
        let user = UserId::new();
        let start = Utc::now();

        queue.push(notification(user, NotificationType::Report), 30, start);
        queue.push(
            notification(user, NotificationType::Report),
            30,
            start + Duration::minutes(29),
        );

        let due = queue.flush_due(start + Duration::minutes(30));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].notifications.len(), 2);
    }

    #[test]
    fn recipientless_notifications_are_not_queued() {
        let queue = BatchQueue::new();
        queue.push(
            Notification::new("t", "m", NotificationType::System),
            10,
            Utc::now(),
        );
        assert!(queue.is_empty());
    }
}
