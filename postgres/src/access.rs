//! Role checks backed by the `administrators` and `event_members` tables.

use guestlist_core::providers::AccessControl;
use guestlist_core::types::{Actor, EventId, UserId};
use guestlist_core::{GuestlistError, Result};
use sqlx::PgPool;

use crate::repository::persistence;

/// [`AccessControl`] reading grants from `PostgreSQL`.
///
/// Administrators may act on every event. Other organizers need an
/// `event_members` row for the event.
#[derive(Clone, Debug)]
pub struct PostgresAccessControl {
    pool: PgPool,
}

impl PostgresAccessControl {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn is_admin(&self, user_id: UserId) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM administrators WHERE user_id = $1)",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(persistence("check administrator"))
    }

    /// Adds `user_id` to the organizers of `event_id`.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the insert fails.
    pub async fn grant(&self, user_id: UserId, event_id: EventId) -> Result<()> {
        sqlx::query(
            "INSERT INTO event_members (event_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(persistence("grant event access"))?;
        Ok(())
    }

    /// Makes `user_id` a system administrator.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the insert fails.
    pub async fn make_admin(&self, user_id: UserId) -> Result<()> {
        sqlx::query("INSERT INTO administrators (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(persistence("grant administrator"))?;
        Ok(())
    }
}

impl AccessControl for PostgresAccessControl {
    async fn require_event_access(&self, actor: &Actor, event_id: EventId) -> Result<()> {
        let allowed = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM administrators WHERE user_id = $1) \
             OR EXISTS (SELECT 1 FROM event_members WHERE user_id = $1 AND event_id = $2)",
        )
        .bind(actor.user_id.as_uuid())
        .bind(event_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(persistence("check event access"))?;

        if allowed {
            Ok(())
        } else {
            tracing::debug!(user_id = %actor.user_id, %event_id, "event access denied");
            Err(GuestlistError::Forbidden(format!("no access to event {event_id}")))
        }
    }

    async fn require_admin(&self, actor: &Actor) -> Result<()> {
        if self.is_admin(actor.user_id).await? {
            Ok(())
        } else {
            Err(GuestlistError::Forbidden("administrator role required".into()))
        }
    }
}
