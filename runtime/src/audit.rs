//! Audit log retention.

use chrono::Duration;
use guestlist_core::providers::Repository;
use guestlist_core::types::Actor;
use guestlist_core::{GuestlistError, Result};

use crate::environment::GuestlistEnvironment;

/// Administrative access to the audit log.
#[derive(Clone)]
pub struct AuditTrail<R, N> {
    env: GuestlistEnvironment<R, N>,
}

impl<R: Repository, N> AuditTrail<R, N> {
    /// Creates the trail.
    #[must_use]
    pub const fn new(env: GuestlistEnvironment<R, N>) -> Self {
        Self { env }
    }

    /// Deletes entries older than `older_than_days` days and returns how
    /// many were removed.
    ///
    /// Pruning also shrinks what the column revert can undo.
    ///
    /// # Errors
    ///
    /// - `Validation` if `older_than_days` is zero
    /// - `Persistence` if the delete fails
    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn prune(&self, older_than_days: u32, actor: &Actor) -> Result<u64> {
        if older_than_days == 0 {
            return Err(GuestlistError::Validation("olderThanDays must be at least 1".into()));
        }
        let cutoff = self.env.clock.now() - Duration::days(i64::from(older_than_days));
        let deleted = self.env.repository.prune_audit_log(cutoff).await?;
        tracing::info!(%cutoff, deleted, "Audit log pruned");
        Ok(deleted)
    }
}
