use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::{Alert, AlertLevel, AlertSink};

/// Bounded, newest-first alert list shared between the poller and the API.
#[derive(Debug)]
pub struct AlertFeed {
    capacity: usize,
    entries: Mutex<VecDeque<Alert>>,
}

impl AlertFeed {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<Alert>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current alerts, newest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Alert> {
        self.entries().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}

impl AlertSink for AlertFeed {
    fn notify(&self, level: AlertLevel, message: &str, timestamp: DateTime<Utc>) {
        match level {
            AlertLevel::Info => tracing::info!(%timestamp, "{message}"),
            AlertLevel::Warning | AlertLevel::Danger => {
                tracing::warn!(level = ?level, %timestamp, "{message}");
            }
        }

        let mut entries = self.entries();
        entries.push_front(Alert {
            id: Uuid::new_v4(),
            level,
            message: message.to_string(),
            timestamp,
        });
        entries.truncate(self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_newest_entries_first() {
        let feed = AlertFeed::new(3);
        let now = Utc::now();
        for i in 0..5 {
            feed.notify(AlertLevel::Warning, &format!("alert {i}"), now);
        }

        let messages: Vec<String> = feed.snapshot().into_iter().map(|a| a.message).collect();
        assert_eq!(messages, vec!["alert 4", "alert 3", "alert 2"]);
    }

    #[test]
    fn zero_capacity_still_keeps_one() {
        let feed = AlertFeed::new(0);
        feed.notify(AlertLevel::Info, "a", Utc::now());
        feed.notify(AlertLevel::Info, "b", Utc::now());
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.capacity(), 1);
    }
}
