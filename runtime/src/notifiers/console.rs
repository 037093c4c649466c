//! Notifier that only writes to the log.

use guestlist_core::error::NotifyError;
use guestlist_core::providers::{Notification, Notifier};
use tracing::info;

/// Logs notifications instead of delivering them.
///
/// The default for development, where no push gateway or SMTP relay is
/// around.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Notifier for ConsoleNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            tag = %notification.tag,
            url = %notification.url,
            title = %notification.title,
            body = %notification.body,
            "Organizer notification (console)"
        );
        Ok(())
    }
}
