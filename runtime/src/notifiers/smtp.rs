//! Email to the organizers over SMTP, using Lettre.

use std::sync::Arc;

use guestlist_core::error::NotifyError;
use guestlist_core::providers::{Notification, Notifier};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Connection and addressing for [`SmtpNotifier`].
#[derive(Clone, Debug)]
pub struct SmtpSettings {
    /// Relay host, e.g. `smtp.example.com`.
    pub host: String,
    /// Relay port, usually 587.
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Sender, e.g. `Guestlist <noreply@example.com>`.
    pub from: String,
    /// Organizer addresses receiving every notification.
    pub recipients: Vec<String>,
}

/// Sends each notification as a plain-text email to the organizers.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl SmtpNotifier {
    /// Create the notifier. No connection is opened until the first send.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Configuration`] if an address does not parse,
    /// no recipient is given, or the relay cannot be set up.
    pub fn new(settings: SmtpSettings) -> Result<Self, NotifyError> {
        let from = parse_mailbox(&settings.from)?;
        let recipients = settings
            .recipients
            .iter()
            .map(|r| parse_mailbox(r))
            .collect::<Result<Vec<_>, _>>()?;
        if recipients.is_empty() {
            return Err(NotifyError::Configuration("no notification recipients".into()));
        }

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|e| NotifyError::Configuration(format!("SMTP relay error: {e}")))?
            .port(settings.port)
            .credentials(Credentials::new(settings.username, settings.password))
            .build();

        Ok(Self { transport: Arc::new(transport), from, recipients })
    }

    fn message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let builder = self
            .recipients
            .iter()
            .fold(Message::builder().from(self.from.clone()), |b, to| b.to(to.clone()));
        builder
            .subject(&notification.title)
            .header(ContentType::TEXT_PLAIN)
            .body(format!("{}\n\n{}\n", notification.body, notification.url))
            .map_err(|e| NotifyError::Delivery(format!("Failed to build email: {e}")))
    }
}

impl Notifier for SmtpNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let email = self.message(notification)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Delivery(format!("Failed to send email: {e}")))?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse()
        .map_err(|e| NotifyError::Configuration(format!("Invalid address {address:?}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".into(),
            port: 587,
            username: "user".into(),
            password: "secret".into(),
            from: "Guestlist <noreply@example.com>".into(),
            recipients: vec!["host@example.com".into(), "desk@example.com".into()],
        }
    }

    #[test]
    fn message_goes_to_every_organizer() {
        let notifier = SmtpNotifier::new(settings()).unwrap();
        let note = Notification {
            title: "Ada Lovelace accepted".into(),
            body: "Sommerfest: 1 accepted, 0 declined, 4 pending".into(),
            url: "https://app.example.com/events/1/guests".into(),
            tag: "rsvp-1".into(),
        };

        let message = notifier.message(&note).unwrap();
        let to = message.envelope().to();

        assert_eq!(to.len(), 2);
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Ada Lovelace accepted"));
    }

    #[test]
    fn bad_sender_is_rejected() {
        let mut bad = settings();
        bad.from = "not an address".into();
        assert!(matches!(SmtpNotifier::new(bad), Err(NotifyError::Configuration(_))));
    }

    #[test]
    fn recipients_are_required() {
        let mut bad = settings();
        bad.recipients.clear();
        assert!(matches!(SmtpNotifier::new(bad), Err(NotifyError::Configuration(_))));
    }
}
