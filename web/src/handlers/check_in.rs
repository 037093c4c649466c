//! Door scanner endpoint.

use std::sync::Arc;

use axum::extract::{State, rejection::JsonRejection};
use axum::{Json, http::StatusCode};
use guestlist_core::GuestlistError;
use guestlist_core::providers::{AccessControl, Notifier, Repository};
use guestlist_core::tokens::{CheckInToken, OpaqueToken};
use guestlist_runtime::{CheckInKind, CheckInReceipt};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Scanner request body.
#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    /// The scanned check-in token.
    #[serde(default)]
    pub token: String,
}

/// Scanner response body.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    /// Whether the person was admitted.
    pub success: bool,
    /// `main` or `accompanying`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    /// Display name of the admitted person.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Event title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_title: Option<String>,
    /// Whether this was a repeat scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_checked_in: Option<bool>,
    /// Reason for a denial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckInResponse {
    fn admitted(receipt: CheckInReceipt) -> Self {
        let kind = match receipt.kind {
            CheckInKind::Guest => "main",
            CheckInKind::AccompanyingGuest => "accompanying",
        };
        Self {
            success: true,
            kind: Some(kind),
            name: Some(receipt.name),
            event_title: receipt.event_title,
            already_checked_in: Some(receipt.already_checked_in),
            error: None,
        }
    }

    fn denied(error: &str) -> Self {
        Self {
            success: false,
            kind: None,
            name: None,
            event_title: None,
            already_checked_in: None,
            error: Some(error.to_owned()),
        }
    }
}

/// `POST /checkin`
///
/// Answers 200 on admission, 400 for a missing token or unreadable body,
/// 404 for any token that admits nobody and 500 when the store fails. The
/// body always has the scanner shape.
pub async fn check_in<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    body: Result<Json<CheckInRequest>, JsonRejection>,
) -> (StatusCode, Json<CheckInResponse>)
where
    R: Repository + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Unreadable check-in request");
            return (StatusCode::BAD_REQUEST, Json(CheckInResponse::denied("Token is required")));
        }
    };
    if request.token.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(CheckInResponse::denied("Token is required")));
    }
    let result = match CheckInToken::parse(&request.token) {
        Ok(token) => state.check_in.check_in(&token).await,
        Err(_) => Err(GuestlistError::not_found("check-in token")),
    };

    match result {
        Ok(receipt) => (StatusCode::OK, Json(CheckInResponse::admitted(receipt))),
        Err(GuestlistError::Persistence(detail)) => {
            tracing::error!(error = %detail, "Check-in failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(CheckInResponse::denied("Check-in failed")))
        }
        Err(_) => (StatusCode::NOT_FOUND, Json(CheckInResponse::denied("Invalid check-in code"))),
    }
}
