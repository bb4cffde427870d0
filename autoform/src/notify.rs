//! User-facing error notifications.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str, detail: &str);
}

/// Default notifier: logs the notification.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_error(&self, message: &str, detail: &str) {
        tracing::error!(detail = %detail, "{}", message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub detail: String,
    pub at: DateTime<Utc>,
}

/// Keeps every notification in memory, for hosts that render their own
/// toasts and for tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    fn notify_error(&self, message: &str, detail: &str) {
        tracing::debug!(message = %message, detail = %detail, "Recording notification");
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Notification {
                message: message.to_string(),
                detail: detail.to_string(),
                at: Utc::now(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_shares_entries_across_clones() {
        let notifier = RecordingNotifier::new();
        let clone = notifier.clone();
        clone.notify_error("Save failed", "connection reset");

        assert_eq!(notifier.len(), 1);
        let entry = &notifier.notifications()[0];
        assert_eq!(entry.message, "Save failed");
        assert_eq!(entry.detail, "connection reset");
    }
}
