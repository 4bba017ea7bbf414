//! Quiet-hours deferral queue.
//!
//! Notifications the resolver defers land here with the absolute instant
//! the recipient's quiet window closes. Like [`crate::batch::BatchQueue`],
//! no timer runs; the dispatcher calls [`DeferredQueue::flush_due`] on its
//! own schedule and re-delivers what comes back.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use stockflow_models::NotificationId;

struct DeferredEntry {
    id: NotificationId,
    due_at: DateTime<Utc>,
}

/// In-process accumulation of quiet-hours-deferred notifications.
#[derive(Default)]
pub struct DeferredQueue {
    pending: Mutex<Vec<DeferredEntry>>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds a notification until the given instant.
    pub fn push(&self, id: NotificationId, due_at: DateTime<Utc>) {
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.push(DeferredEntry { id, due_at });
    }

    /// Removes and returns every notification whose hold has expired.
    pub fn flush_due(&self, now: DateTime<Utc>) -> Vec<NotificationId> {
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut due = Vec::new();
        pending.retain(|entry| {
            if entry.due_at <= now {
                due.push(entry.id);
                false
            } else {
                true
            }
        });
        due
    }

    pub fn len(&self) -> usize {
        match self.pending.lock() {
            Ok(guard) => guard.len(),
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
    use chrono::Duration;

    #[test]
    fn flush_returns_only_expired_holds() {
        let queue = DeferredQueue::new();
        let now = Utc::now();
        let (a, b) = (NotificationId::new(), NotificationId::new());

        queue.push(a, now + Duration::hours(1));
        queue.push(b, now + Duration::hours(8));

        assert!(queue.flush_due(now).is_empty());

        let due = queue.flush_due(now + Duration::hours(1));
        assert_eq!(due, vec![a]);
        assert_eq!(queue.len(), 1);

        let due = queue.flush_due(now + Duration::hours(8));
        assert_eq!(due, vec![b]);
        assert!(queue.is_empty());
    }

    #[test]
    fn flushed_entries_do_not_come_back() {
        let queue = DeferredQueue::new();
        let now = Utc::now();
        queue.push(NotificationId::new(), now);

        assert_eq!(queue.flush_due(now).len(), 1);
        assert!(queue.flush_due(now + Duration::days(1)).is_empty());
    }
}
