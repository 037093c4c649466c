//! Audit log retention.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use guestlist_core::providers::{AccessControl, Notifier, Repository};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::AuthenticatedActor;
use crate::state::AppState;

/// Query of `DELETE /api/audit-logs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneQuery {
    /// Remove entries older than this many days.
    pub older_than_days: u32,
}

/// Reply of `DELETE /api/audit-logs`.
#[derive(Debug, Serialize)]
pub struct PruneResponse {
    /// Number of entries removed.
    pub deleted: u64,
}

/// `DELETE /api/audit-logs?olderThanDays=N`
///
/// Administrators only.
///
/// # Errors
///
/// 401 without an actor, 403 for non-administrators, 422 for zero days.
pub async fn prune_audit_log<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    actor: AuthenticatedActor,
    Query(query): Query<PruneQuery>,
) -> Result<Json<PruneResponse>, AppError>
where
    R: Repository + Clone + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    state.access.require_admin(&actor.0).await?;
    let deleted = state.audit.prune(query.older_than_days, &actor.0).await?;
    Ok(Json(PruneResponse { deleted }))
}
