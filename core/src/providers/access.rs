//! Access checks for administrative operations.

use crate::error::Result;
use crate::types::{Actor, EventId};

/// Decides whether an organizer may act on an event.
///
/// Token-based operations (accept, decline, check-in, open tracking) are
/// authorized by possession of the token and never consult this trait.
pub trait AccessControl: Send + Sync {
    /// Requires that `actor` may manage `event_id`.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if not, `Persistence` if the check itself fails.
    fn require_event_access(
        &self,
        actor: &Actor,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Requires that `actor` is a system administrator.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if not, `Persistence` if the check itself fails.
    fn require_admin(&self, actor: &Actor) -> impl std::future::Future<Output = Result<()>> + Send;
}
