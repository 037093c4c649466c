//! Web push through an HTTP gateway.

use std::time::Duration;

use guestlist_core::error::NotifyError;
use guestlist_core::providers::{Notification, Notifier};

/// Posts notifications as JSON to a push gateway, which fans them out to
/// the organizers' subscribed devices.
///
/// The request body is the [`Notification`] itself:
/// `{"title": .., "body": .., "url": .., "tag": ..}`.
#[derive(Clone, Debug)]
pub struct PushGatewayNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl PushGatewayNotifier {
    /// Create a notifier posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Configuration`] if the endpoint is empty or
    /// the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(NotifyError::Configuration("push gateway URL is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| NotifyError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self { client, endpoint, api_key })
    }

    /// Gateway URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Notifier for PushGatewayNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.endpoint).json(notification);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(format!("push gateway unreachable: {e}")))?;
        response
            .error_for_status()
            .map_err(|e| NotifyError::Delivery(format!("push gateway rejected: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_endpoint_is_a_configuration_error() {
        let err = PushGatewayNotifier::new("  ", None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, NotifyError::Configuration(_)));
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_delivery_error() {
        let notifier =
            PushGatewayNotifier::new("http://127.0.0.1:1/push", None, Duration::from_secs(2)).unwrap();
        let note = Notification {
            title: "t".into(),
            body: "b".into(),
            url: "/".into(),
            tag: "x".into(),
        };

        let err = notifier.notify(&note).await.unwrap_err();

        assert!(matches!(err, NotifyError::Delivery(_)));
    }
}
