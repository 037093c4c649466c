//! Organizer notification channel.

use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

/// A message for the event's organizers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Short headline.
    pub title: String,
    /// Message text.
    pub body: String,
    /// Link opened when the notification is clicked.
    pub url: String,
    /// Collapse key; a newer notification with the same tag replaces the
    /// previous one on the device.
    pub tag: String,
}

/// Delivers organizer notifications (web push, email, console).
///
/// Delivery is best effort. Callers log and count failures and never let
/// them affect the operation that produced the notification.
pub trait Notifier: Send + Sync {
    /// Sends one notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the transport fails or is misconfigured.
    fn notify(
        &self,
        notification: &Notification,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;
}
