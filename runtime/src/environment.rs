//! Dependencies shared by every service.

use std::sync::Arc;

use guestlist_core::environment::{Clock, SystemClock};
use guestlist_core::settings::RsvpSettings;

use crate::dispatch::Dispatcher;

/// Injected dependencies for the guest list services.
///
/// # Type Parameters
///
/// - `R`: Relational store
/// - `N`: Organizer notification channel
#[derive(Clone)]
pub struct GuestlistEnvironment<R, N> {
    /// Relational store.
    pub repository: R,

    /// Post-commit notification dispatch.
    pub dispatcher: Dispatcher<N>,

    /// Time source.
    pub clock: Arc<dyn Clock>,

    /// RSVP and revert limits.
    pub settings: RsvpSettings,

    /// Base URL of the organizer UI, used for notification links.
    pub public_base_url: String,
}

impl<R, N> GuestlistEnvironment<R, N> {
    /// Creates an environment on the system clock with default settings.
    #[must_use]
    pub fn new(repository: R, dispatcher: Dispatcher<N>) -> Self {
        Self {
            repository,
            dispatcher,
            clock: Arc::new(SystemClock),
            settings: RsvpSettings::default(),
            public_base_url: String::new(),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the limits.
    #[must_use]
    pub fn with_settings(mut self, settings: RsvpSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the organizer UI base URL (no trailing slash).
    #[must_use]
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into().trim_end_matches('/').to_owned();
        self
    }
}
