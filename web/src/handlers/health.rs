//! Health check endpoints.
//!
//! Used by load balancers and monitoring systems to verify service health.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use guestlist_core::providers::{Notifier, Repository};
use serde::Serialize;

use crate::state::AppState;

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running. Does not check the
/// database.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness report.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Readiness {
    /// `ready` or `unavailable`.
    pub status: &'static str,
}

/// Readiness check against the database.
///
/// # Status Codes
///
/// - 200 OK: the store answers
/// - 503 Service Unavailable: it does not
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
pub async fn readiness_check<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
) -> (StatusCode, Json<Readiness>)
where
    R: Repository + 'static,
    N: Notifier + 'static,
    A: Send + Sync + 'static,
{
    match state.repository.ping().await {
        Ok(()) => (StatusCode::OK, Json(Readiness { status: "ready" })),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(Readiness { status: "unavailable" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
