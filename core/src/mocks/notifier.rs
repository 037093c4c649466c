//! Recording notifier for testing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::NotifyError;
use crate::providers::{Notification, Notifier};

#[derive(Debug, Default)]
struct Behaviour {
    failure: Option<NotifyError>,
    delay: Option<Duration>,
}

/// Notifier that keeps every notification it was asked to send.
///
/// Can be told to fail or to stall, to exercise the dispatcher's error and
/// timeout handling.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    behaviour: Arc<Mutex<Behaviour>>,
}

impl RecordingNotifier {
    /// Create a notifier that succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications delivered so far.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Fail every following delivery with `error`.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn fail_with(&self, error: NotifyError) {
        self.behaviour.lock().unwrap().failure = Some(error);
    }

    /// Sleep for `delay` before every following delivery.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn stall_for(&self, delay: Duration) {
        self.behaviour.lock().unwrap().delay = Some(delay);
    }
}

impl Notifier for RecordingNotifier {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let (failure, delay) = {
            let behaviour = self.behaviour.lock().unwrap();
            (behaviour.failure.clone(), behaviour.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = failure {
            return Err(error);
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
