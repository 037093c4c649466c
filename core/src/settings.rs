//! Tunables for the RSVP state machine and the revert engine.

/// Limits applied by the RSVP operations.
///
/// # Examples
///
/// ```
/// use guestlist_core::settings::RsvpSettings;
///
/// let settings = RsvpSettings::default().with_max_accompanying_guests(4);
/// assert_eq!(settings.max_accompanying_guests, 4);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsvpSettings {
    /// Largest party a guest may declare (excluding themselves).
    pub max_accompanying_guests: u32,
    /// Window used by the column revert when none is given.
    pub default_revert_window_hours: u32,
    /// Largest window the column revert accepts.
    pub max_revert_window_hours: u32,
}

impl Default for RsvpSettings {
    fn default() -> Self {
        Self {
            max_accompanying_guests: 10,
            default_revert_window_hours: 24,
            max_revert_window_hours: 24 * 30,
        }
    }
}

impl RsvpSettings {
    /// Set the party size limit.
    #[must_use]
    pub const fn with_max_accompanying_guests(mut self, max: u32) -> Self {
        self.max_accompanying_guests = max;
        self
    }

    /// Set the default column revert window.
    #[must_use]
    pub const fn with_default_revert_window_hours(mut self, hours: u32) -> Self {
        self.default_revert_window_hours = hours;
        self
    }

    /// Set the largest column revert window.
    #[must_use]
    pub const fn with_max_revert_window_hours(mut self, hours: u32) -> Self {
        self.max_revert_window_hours = hours;
        self
    }
}
