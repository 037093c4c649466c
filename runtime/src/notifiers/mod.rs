//! Notifier adapters.
//!
//! [`ConfiguredNotifier`] picks one at startup from configuration, so the
//! services stay generic over a single concrete type.

mod console;
mod push;
mod smtp;

pub use console::ConsoleNotifier;
pub use push::PushGatewayNotifier;
pub use smtp::{SmtpNotifier, SmtpSettings};

use guestlist_core::error::NotifyError;
use guestlist_core::providers::{Notification, Notifier};

/// The notifier selected by configuration.
#[derive(Clone)]
pub enum ConfiguredNotifier {
    /// Log only.
    Console(ConsoleNotifier),
    /// Web push gateway.
    Push(PushGatewayNotifier),
    /// Email to the organizers.
    Email(SmtpNotifier),
    /// Push and email, sent concurrently.
    PushAndEmail(PushGatewayNotifier, SmtpNotifier),
}

impl Notifier for ConfiguredNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        match self {
            Self::Console(n) => n.notify(notification).await,
            Self::Push(n) => n.notify(notification).await,
            Self::Email(n) => n.notify(notification).await,
            Self::PushAndEmail(push, email) => {
                let (pushed, mailed) =
                    futures::future::join(push.notify(notification), email.notify(notification))
                        .await;
                pushed.and(mailed)
            }
        }
    }
}

impl Default for ConfiguredNotifier {
    fn default() -> Self {
        Self::Console(ConsoleNotifier)
    }
}
