//! Process-wide notification channel (transient user-facing messages)

use tokio::sync::broadcast;
use tracing::trace;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// A transient message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

/// Fan-out of notifications to whoever renders them
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn publish(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            trace!("Notification dropped, no subscribers");
        }
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(Notification {
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(Notification {
            severity: Severity::Success,
            message: message.into(),
        });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}
