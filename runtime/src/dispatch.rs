//! Post-commit notification dispatch.
//!
//! Delivery is bounded by a timeout and never reports failure to the
//! caller: errors are logged and counted, then dropped.

use std::time::{Duration, Instant};

use guestlist_core::error::NotifyError;
use guestlist_core::providers::{Notification, Notifier};

use crate::metrics::NotificationMetrics;

/// Default bound on a single delivery.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(3);

/// How [`Dispatcher::dispatch`] runs a delivery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// Await the delivery (bounded by the timeout) before returning.
    #[default]
    Inline,
    /// Spawn the delivery and return immediately.
    Background,
}

/// Runs notifier deliveries after a commit.
#[derive(Clone, Debug)]
pub struct Dispatcher<N> {
    notifier: N,
    timeout: Duration,
    mode: DispatchMode,
}

impl<N> Dispatcher<N> {
    /// Inline dispatcher with the default timeout.
    #[must_use]
    pub const fn new(notifier: N) -> Self {
        Self { notifier, timeout: DEFAULT_DISPATCH_TIMEOUT, mode: DispatchMode::Inline }
    }

    /// Set the per-delivery timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the dispatch mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// The wrapped notifier.
    #[must_use]
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }
}

impl<N> Dispatcher<N>
where
    N: Notifier + Clone + 'static,
{
    /// Delivers `notification`, swallowing any failure.
    pub async fn dispatch(&self, notification: Notification) {
        match self.mode {
            DispatchMode::Inline => deliver(&self.notifier, &notification, self.timeout).await,
            DispatchMode::Background => {
                let notifier = self.notifier.clone();
                let timeout = self.timeout;
                tokio::spawn(async move {
                    deliver(&notifier, &notification, timeout).await;
                });
            }
        }
    }
}

async fn deliver<N: Notifier>(notifier: &N, notification: &Notification, timeout: Duration) {
    let started = Instant::now();
    let result = match tokio::time::timeout(timeout, notifier.notify(notification)).await {
        Ok(result) => result,
        Err(_) => Err(NotifyError::Timeout),
    };

    match result {
        Ok(()) => {
            NotificationMetrics::record_sent(started.elapsed());
            tracing::debug!(tag = %notification.tag, "Notification delivered");
        }
        Err(error) => {
            NotificationMetrics::record_failure(&error);
            tracing::warn!(tag = %notification.tag, error = %error, "Notification dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use guestlist_core::mocks::RecordingNotifier;

    use super::*;

    fn note() -> Notification {
        Notification {
            title: "t".into(),
            body: "b".into(),
            url: "/".into(),
            tag: "x".into(),
        }
    }

    #[tokio::test]
    async fn inline_dispatch_delivers_before_returning() {
        let notifier = RecordingNotifier::new();
        Dispatcher::new(notifier.clone()).dispatch(note()).await;
        assert_eq!(notifier.sent(), vec![note()]);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let notifier = RecordingNotifier::new();
        notifier.fail_with(NotifyError::Delivery("gateway down".into()));
        Dispatcher::new(notifier.clone()).dispatch(note()).await;
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn slow_notifier_is_cut_off() {
        let notifier = RecordingNotifier::new();
        notifier.stall_for(Duration::from_secs(60));
        let dispatcher = Dispatcher::new(notifier.clone()).with_timeout(Duration::from_millis(50));

        dispatcher.dispatch(note()).await;

        assert!(notifier.sent().is_empty());
    }
}
