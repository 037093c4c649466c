//! Error types for guest list operations.

use thiserror::Error;

/// Result type alias for guest list operations.
pub type Result<T> = std::result::Result<T, GuestlistError>;

/// Failures surfaced by the RSVP, check-in and revert operations.
///
/// Notification failures are deliberately absent: the side channel has its
/// own [`NotifyError`] and never fails the operation that triggered it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuestlistError {
    // ═══════════════════════════════════════════════════════════
    // Lookup Errors
    // ═══════════════════════════════════════════════════════════

    /// No entity matches the given identifier or token.
    #[error("{entity} not found")]
    NotFound {
        /// Kind of entity that was looked up
        entity: &'static str,
    },

    // ═══════════════════════════════════════════════════════════
    // State Errors
    // ═══════════════════════════════════════════════════════════

    /// The requested transition is not allowed from the current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The request payload is malformed or out of range.
    #[error("Validation failed: {0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════

    /// The actor may not touch this event.
    #[error("Access denied: {0}")]
    Forbidden(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Persistence failed; the enclosing transaction was rolled back.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl GuestlistError {
    /// Shorthand for [`GuestlistError::NotFound`].
    #[must_use]
    pub const fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    /// Returns `true` if this error is due to the caller's input or state.
    ///
    /// # Examples
    ///
    /// ```
    /// # use guestlist_core::GuestlistError;
    /// assert!(GuestlistError::not_found("invitation").is_user_error());
    /// assert!(!GuestlistError::Persistence("pool closed".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Persistence(_))
    }

    /// Stable machine-readable classification.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }
}

/// Failure of a notification adapter.
///
/// Only ever logged and counted; callers of the RSVP and check-in
/// operations never see it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The transport rejected or failed to deliver the message.
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    /// The adapter is misconfigured (bad address, missing key).
    #[error("Notifier misconfigured: {0}")]
    Configuration(String),

    /// Delivery did not finish within the dispatch timeout.
    #[error("Notification timed out")]
    Timeout,
}
