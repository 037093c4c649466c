//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for the guest list:
//! - RSVP outcomes
//! - Door check-ins and denials
//! - Reverts
//! - Notification delivery
//!
//! # Example
//!
//! ```rust,no_run
//! use guestlist_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Serve `server.render()` from an HTTP handler for Prometheus to scrape
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use guestlist_core::error::NotifyError;
use guestlist_core::rsvp::RsvpOutcome;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder plus the address its scrape endpoint is served on.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address the scrape endpoint will be bound to
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the scrape endpoint should listen on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests), this logs a
    /// warning and leaves [`MetricsServer::handle`] empty.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder hasn't been installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "guestlist_rsvp_total",
        "RSVP operations by outcome (accepted, declined, already_accepted, ...)"
    );
    describe_counter!(
        "guestlist_check_ins_total",
        "Successful door check-ins by kind (guest, accompanying) and first arrival"
    );
    describe_counter!(
        "guestlist_check_in_denied_total",
        "Check-in attempts with unknown or revoked tokens"
    );
    describe_counter!(
        "guestlist_reverted_total",
        "Records changed by revert operations, by kind"
    );
    describe_counter!(
        "guestlist_notifications_sent_total",
        "Organizer notifications delivered"
    );
    describe_counter!(
        "guestlist_notifications_failed_total",
        "Organizer notifications dropped, by reason"
    );
    describe_histogram!(
        "guestlist_notification_duration_seconds",
        "Time taken to deliver a notification"
    );
}

/// RSVP metrics recorder.
pub struct RsvpMetrics;

impl RsvpMetrics {
    /// Record the outcome of an RSVP command.
    pub fn record(outcome: RsvpOutcome) {
        let label = match outcome {
            RsvpOutcome::Accepted => "accepted",
            RsvpOutcome::Declined => "declined",
            RsvpOutcome::AlreadyAccepted => "already_accepted",
            RsvpOutcome::AlreadyDeclined => "already_declined",
            RsvpOutcome::Updated => "updated",
            RsvpOutcome::TokensRegenerated => "tokens_regenerated",
        };
        counter!("guestlist_rsvp_total", "outcome" => label).increment(1);
    }
}

/// Check-in metrics recorder.
pub struct CheckInMetrics;

impl CheckInMetrics {
    /// Record an admitted check-in.
    pub fn record_admitted(kind: &'static str, first_arrival: bool) {
        let first = if first_arrival { "true" } else { "false" };
        counter!("guestlist_check_ins_total", "kind" => kind, "first" => first).increment(1);
    }

    /// Record a denied check-in.
    pub fn record_denied() {
        counter!("guestlist_check_in_denied_total").increment(1);
    }
}

/// Revert metrics recorder.
pub struct RevertMetrics;

impl RevertMetrics {
    /// Record how many records a revert changed.
    pub fn record(kind: &'static str, reverted: u64) {
        counter!("guestlist_reverted_total", "kind" => kind).increment(reverted);
    }
}

/// Notification metrics recorder.
pub struct NotificationMetrics;

impl NotificationMetrics {
    /// Record a delivered notification.
    pub fn record_sent(duration: Duration) {
        counter!("guestlist_notifications_sent_total").increment(1);
        histogram!("guestlist_notification_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a dropped notification.
    pub fn record_failure(error: &NotifyError) {
        let reason = match error {
            NotifyError::Delivery(_) => "delivery",
            NotifyError::Configuration(_) => "configuration",
            NotifyError::Timeout => "timeout",
        };
        counter!("guestlist_notifications_failed_total", "reason" => reason).increment(1);
    }
}
