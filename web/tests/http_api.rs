//! End-to-end tests of the router over in-memory providers.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum_test::{TestRequest, TestServer};
use guestlist_core::mocks::{InMemoryRepository, MockAccessControl, RecordingNotifier};
use guestlist_core::tokens::OpaqueToken;
use guestlist_core::types::{Event, RsvpResponse, UserId};
use guestlist_runtime::{Dispatcher, GuestlistEnvironment};
use guestlist_testing::fixtures::{self, Seeded};
use guestlist_testing::{ManualClock, init_test_tracing, test_epoch};
use guestlist_web::handlers::rsvp::TRACKING_PIXEL;
use guestlist_web::{ACTOR_ID_HEADER, AppState, CORRELATION_ID_HEADER, router};
use serde_json::{Value, json};

struct App {
    server: TestServer,
    repo: InMemoryRepository,
    access: MockAccessControl,
    event: Event,
    organizer: UserId,
}

impl App {
    async fn new() -> Self {
        Self::build(None).await
    }

    async fn with_landing(url: &str) -> Self {
        Self::build(Some(url)).await
    }

    async fn build(landing: Option<&str>) -> Self {
        init_test_tracing();
        let repo = InMemoryRepository::new();
        let clock = ManualClock::new(test_epoch());
        let env = GuestlistEnvironment::new(repo.clone(), Dispatcher::new(RecordingNotifier::new()))
            .with_clock(Arc::new(clock))
            .with_public_base_url("https://app.example.com/");
        let event = fixtures::seed_event(&repo, "Sommerfest").await;

        let access = MockAccessControl::deny_all();
        let organizer = UserId::new();
        access.grant(organizer, event.id);

        let mut state = AppState::new(env, access.clone());
        if let Some(url) = landing {
            state = state.with_landing_url(url);
        }
        let server = TestServer::new(router(state)).unwrap();

        Self { server, repo, access, event, organizer }
    }

    async fn invite(&self, name: &str, accompanying: u32) -> Seeded {
        fixtures::seed_invitation(&self.repo, self.event.id, name, accompanying, test_epoch())
            .await
            .unwrap()
    }
}

fn as_user(request: TestRequest, user: UserId) -> TestRequest {
    request.add_header(
        HeaderName::from_static("x-actor-id"),
        HeaderValue::from_str(&user.as_uuid().to_string()).unwrap(),
    )
}

// ═══════════════════════════════════════════════════════════
// Public links
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn accept_link_answers_with_json_without_landing_page() {
    let app = App::new().await;
    let seeded = app.invite("Ada Lovelace", 0).await;

    let response = app
        .server
        .get(&format!("/rsvp/accept/{}", seeded.invitation.accept_token.as_str()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["invitation"]["invitation"]["response"], "ACCEPTED");
    assert!(body["invitation"]["guest"]["checkInToken"].is_string());
}

#[tokio::test]
async fn accept_link_redirects_to_landing_page() {
    let app = App::with_landing("https://rsvp.example.com/thanks").await;
    let seeded = app.invite("Ada Lovelace", 0).await;
    let path = format!("/rsvp/accept/{}", seeded.invitation.accept_token.as_str());

    let first = app.server.get(&path).await;
    let second = app.server.get(&path).await;

    assert_eq!(first.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(first.header(header::LOCATION), "https://rsvp.example.com/thanks?status=accepted");
    assert_eq!(
        second.header(header::LOCATION),
        "https://rsvp.example.com/thanks?status=already-accepted"
    );
}

#[tokio::test]
async fn unknown_token_redirects_as_not_found() {
    let app = App::with_landing("https://rsvp.example.com/thanks").await;

    let response = app.server.get("/rsvp/decline/no-such-token").await;

    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "https://rsvp.example.com/thanks?status=not-found");
}

#[tokio::test]
async fn unknown_and_malformed_tokens_are_both_404() {
    let app = App::new().await;

    let unknown = app.server.post("/rsvp/accept/no-such-token").await;
    let malformed = app.server.post("/rsvp/accept/not%20a%20token!").await;

    assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(malformed.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(unknown.json::<Value>()["code"], "NOT_FOUND");
}

#[tokio::test]
async fn accept_form_declares_the_party() {
    let app = App::new().await;
    let seeded = app.invite("Ada Lovelace", 0).await;

    let response = app
        .server
        .post(&format!("/rsvp/accept/{}", seeded.invitation.accept_token.as_str()))
        .json(&json!({
            "accompanyingGuestsCount": 2,
            "accompanyingGuests": [{ "firstName": "Charles", "lastName": "Babbage" }]
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let party = app.repo.party(seeded.invitation.id).await;
    assert_eq!(party.len(), 2);
    let invitation = app.repo.invitation(seeded.invitation.id).await.unwrap();
    assert_eq!(invitation.accompanying_guests_count, 2);
}

#[tokio::test]
async fn oversized_party_is_rejected_with_422() {
    let app = App::new().await;
    let seeded = app.invite("Ada Lovelace", 0).await;

    let response = app
        .server
        .post(&format!("/rsvp/accept/{}", seeded.invitation.accept_token.as_str()))
        .json(&json!({ "accompanyingGuestsCount": 11 }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let invitation = app.repo.invitation(seeded.invitation.id).await.unwrap();
    assert_eq!(invitation.response, RsvpResponse::Pending);
}

#[tokio::test]
async fn decline_submit_answers_with_json() {
    let app = App::new().await;
    let seeded = app.invite("Ada Lovelace", 0).await;

    let response = app
        .server
        .post(&format!("/rsvp/decline/{}", seeded.invitation.decline_token.as_str()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "declined");
}

#[tokio::test]
async fn tracking_pixel_is_served_for_any_token() {
    let app = App::new().await;
    let seeded = app.invite("Ada Lovelace", 0).await;

    let known = app
        .server
        .get(&format!("/rsvp/open/{}", seeded.invitation.tracking_token.as_str()))
        .await;
    let unknown = app.server.get("/rsvp/open/no-such-token").await;

    for response in [&known, &unknown] {
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header(header::CONTENT_TYPE), "image/gif");
        assert_eq!(response.as_bytes().as_ref(), TRACKING_PIXEL.as_slice());
    }
    let invitation = app.repo.invitation(seeded.invitation.id).await.unwrap();
    assert_eq!(invitation.opened_at, Some(test_epoch()));
}

// ═══════════════════════════════════════════════════════════
// Check-in
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn check_in_admits_an_accepted_guest() {
    let app = App::new().await;
    let seeded = app.invite("Ada Lovelace", 0).await;
    app.server
        .post(&format!("/rsvp/accept/{}", seeded.invitation.accept_token.as_str()))
        .await;
    let token = app.repo.guest(seeded.guest.id).await.unwrap().check_in_token.unwrap();

    let first = app.server.post("/checkin").json(&json!({ "token": token.as_str() })).await;
    let second = app.server.post("/checkin").json(&json!({ "token": token.as_str() })).await;

    assert_eq!(first.status_code(), StatusCode::OK);
    let body: Value = first.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["type"], "main");
    assert_eq!(body["name"], "Ada Lovelace");
    assert_eq!(body["eventTitle"], "Sommerfest");
    assert_eq!(body["alreadyCheckedIn"], false);
    assert!(body.get("error").is_none());

    assert_eq!(second.json::<Value>()["alreadyCheckedIn"], true);
}

#[tokio::test]
async fn check_in_rejects_unknown_and_missing_tokens() {
    let app = App::new().await;

    let unknown = app.server.post("/checkin").json(&json!({ "token": "no-such-token" })).await;
    let missing = app.server.post("/checkin").json(&json!({})).await;

    assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        unknown.json::<Value>(),
        json!({ "success": false, "error": "Invalid check-in code" })
    );
    assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(missing.json::<Value>()["error"], "Token is required");
}

#[tokio::test]
async fn check_in_answers_unreadable_bodies_in_scanner_shape() {
    let app = App::new().await;

    let broken = app
        .server
        .post("/checkin")
        .bytes("{oops".into())
        .content_type("application/json")
        .await;
    let plain = app.server.post("/checkin").text("token=abc").await;

    for response in [broken, plain] {
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>(),
            json!({ "success": false, "error": "Token is required" })
        );
    }
}

// ═══════════════════════════════════════════════════════════
// Organizer routes
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn organizer_routes_require_an_actor() {
    let app = App::new().await;
    let seeded = app.invite("Ada Lovelace", 0).await;

    let response = app.server.get(&format!("/api/invitations/{}", seeded.invitation.id)).await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn organizer_without_grant_is_forbidden() {
    let app = App::new().await;
    let seeded = app.invite("Ada Lovelace", 0).await;
    let path = format!("/api/invitations/{}", seeded.invitation.id);

    let stranger = as_user(app.server.get(&path), UserId::new()).await;
    let organizer = as_user(app.server.get(&path), app.organizer).await;

    assert_eq!(stranger.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(organizer.status_code(), StatusCode::OK);
    assert_eq!(organizer.json::<Value>()["guest"]["name"], "Ada Lovelace");
}

#[tokio::test]
async fn accept_on_behalf_of_an_answered_invitation_conflicts() {
    let app = App::new().await;
    let seeded = app.invite("Ada Lovelace", 0).await;
    let path = format!("/api/invitations/{}/accept-on-behalf", seeded.invitation.id);

    let first = as_user(app.server.post(&path), app.organizer).await;
    let second = as_user(app.server.post(&path), app.organizer).await;

    assert_eq!(first.status_code(), StatusCode::OK);
    assert_eq!(first.json::<Value>()["invitation"]["response"], "ACCEPTED");
    assert_eq!(second.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(second.json::<Value>()["code"], "CONFLICT");
}

#[tokio::test]
async fn manual_update_patches_the_invitation() {
    let app = App::new().await;
    let seeded = app.invite("Ada Lovelace", 0).await;

    let response = as_user(
        app.server
            .patch(&format!("/api/invitations/{}", seeded.invitation.id))
            .json(&json!({ "response": "DECLINED" })),
        app.organizer,
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let invitation = app.repo.invitation(seeded.invitation.id).await.unwrap();
    assert_eq!(invitation.response, RsvpResponse::Declined);
}

#[tokio::test]
async fn generating_twice_returns_the_existing_invitation() {
    let app = App::new().await;
    let seeded = app.invite("Ada Lovelace", 0).await;
    let path = format!("/api/events/{}/invitations", app.event.id);
    let body = json!({ "guestId": seeded.guest.id, "accompanyingGuestsCount": 1 });

    let response = as_user(app.server.post(&path).json(&body), app.organizer).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["id"], json!(seeded.invitation.id));
}

#[tokio::test]
async fn walk_in_is_created() {
    let app = App::new().await;

    let response = as_user(
        app.server
            .post(&format!("/api/events/{}/walk-ins", app.event.id))
            .json(&json!({ "name": "Grace Hopper", "checkInNow": true, "accompanyingGuestsCount": 1 })),
        app.organizer,
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["guest"]["name"], "Grace Hopper");
    assert_eq!(body["invitation"]["response"], "ACCEPTED");
    assert_eq!(body["invitation"]["accompanyingGuestsCount"], 1);
    assert_eq!(body["accompanyingGuests"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn revert_responses_reports_the_count() {
    let app = App::new().await;
    let ada = app.invite("Ada Lovelace", 0).await;
    let grace = app.invite("Grace Hopper", 0).await;
    app.invite("Alan Turing", 0).await;
    app.server.post(&format!("/rsvp/accept/{}", ada.invitation.accept_token.as_str())).await;
    app.server.post(&format!("/rsvp/decline/{}", grace.invitation.decline_token.as_str())).await;

    let response = as_user(
        app.server.post(&format!("/api/events/{}/revert-responses", app.event.id)),
        app.organizer,
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({ "message": "Reverted 2 responses", "reverted": 2 })
    );
}

#[tokio::test]
async fn revert_column_changes_validates_the_window() {
    let app = App::new().await;
    let path = format!("/api/events/{}/revert-column-changes", app.event.id);

    let zero = as_user(app.server.post(&path).json(&json!({ "sinceHours": 0 })), app.organizer).await;
    let default = as_user(app.server.post(&path), app.organizer).await;

    assert_eq!(zero.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(default.status_code(), StatusCode::OK);
    assert_eq!(default.json::<Value>()["reverted"], 0);
}

#[tokio::test]
async fn attendance_toggle_is_scoped_to_the_guests_event() {
    let app = App::new().await;
    let seeded = app.invite("Ada Lovelace", 0).await;
    let path = format!("/api/guests/{}/attendance", seeded.guest.id);

    let stranger =
        as_user(app.server.put(&path).json(&json!({ "present": true })), UserId::new()).await;
    let organizer =
        as_user(app.server.put(&path).json(&json!({ "present": true })), app.organizer).await;

    assert_eq!(stranger.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(organizer.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn audit_pruning_is_for_administrators() {
    let app = App::new().await;
    let admin = UserId::new();
    app.access.make_admin(admin);

    let organizer = as_user(
        app.server.delete("/api/audit-logs").add_query_param("olderThanDays", 30),
        app.organizer,
    )
    .await;
    let administrator =
        as_user(app.server.delete("/api/audit-logs").add_query_param("olderThanDays", 30), admin)
            .await;

    assert_eq!(organizer.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(administrator.status_code(), StatusCode::OK);
    assert_eq!(administrator.json::<Value>(), json!({ "deleted": 0 }));
}

// ═══════════════════════════════════════════════════════════
// Probes and middleware
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn probes_report_healthy() {
    let app = App::new().await;

    let health = app.server.get("/health").await;
    let ready = app.server.get("/ready").await;

    assert_eq!(health.text(), "ok");
    assert_eq!(ready.status_code(), StatusCode::OK);
    assert_eq!(ready.json::<Value>(), json!({ "status": "ready" }));
}

#[tokio::test]
async fn correlation_id_is_echoed() {
    let app = App::new().await;
    let id = "0b5c9a3e-4f1d-4e0a-9a6b-2f6d1c3e8b7a";

    let response = app
        .server
        .get("/health")
        .add_header(HeaderName::from_static("x-correlation-id"), HeaderValue::from_static(id))
        .await;

    assert_eq!(response.header(CORRELATION_ID_HEADER), id);
    assert_eq!(ACTOR_ID_HEADER.to_lowercase(), "x-actor-id");
}
