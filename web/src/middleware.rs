//! Request-context middleware.
//!
//! Wraps every request in an `http_request` span carrying what the logs of
//! this service need to be read after the fact:
//!
//! - `correlation_id`: the client's `X-Correlation-ID` if it is a UUID, a
//!   fresh v4 otherwise; also stored in the request extensions for
//!   [`CorrelationId`](crate::extractors::CorrelationId) and echoed on the
//!   response
//! - `audience`: `guest`, `organizer` or `probe`, from the path
//! - `route`: the path with RSVP link tokens masked, so that a log line
//!   never carries a working accept or decline link
//! - `actor_id`: the organizer header, on `/api` routes only
//! - `status`: filled in once the handler answered
//!
//! ```ignore
//! use guestlist_web::middleware::request_context_layer;
//!
//! let app = Router::new()
//!     .route("/checkin", post(check_in))
//!     .layer(request_context_layer());
//! ```

use std::borrow::Cow;
use std::task::{Context, Poll};

use axum::{extract::Request, http::HeaderValue, response::Response};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

use crate::extractors::ACTOR_ID_HEADER;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

const TOKEN_PLACEHOLDER: &str = ":token";

/// Who a request is from, judged by its path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    /// Token links and the door scanner.
    Guest,
    /// `/api` routes.
    Organizer,
    /// Liveness and readiness checks.
    Probe,
}

impl Audience {
    /// Classifies a request path.
    #[must_use]
    pub fn of(path: &str) -> Self {
        if path == "/api" || path.starts_with("/api/") {
            Self::Organizer
        } else if matches!(path, "/health" | "/ready") {
            Self::Probe
        } else {
            Self::Guest
        }
    }

    /// Span and log spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Organizer => "organizer",
            Self::Probe => "probe",
        }
    }
}

/// `path` with the token segment of `/rsvp/{accept,decline,open}/...`
/// replaced by `:token`.
#[must_use]
pub fn loggable_route(path: &str) -> Cow<'_, str> {
    let mut segments = path.trim_start_matches('/').splitn(3, '/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some("rsvp"), Some(action @ ("accept" | "decline" | "open")), Some(_)) => {
            Cow::Owned(format!("/rsvp/{action}/{TOKEN_PLACEHOLDER}"))
        }
        _ => Cow::Borrowed(path),
    }
}

/// Create the layer that attaches the request context to all requests.
#[must_use]
pub const fn request_context_layer() -> RequestContextLayer {
    RequestContextLayer
}

/// Layer for the request context.
#[derive(Clone, Debug)]
pub struct RequestContextLayer;

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContextMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestContextMiddleware { inner }
    }
}

/// Middleware service for the request context.
#[derive(Clone, Debug)]
pub struct RequestContextMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for RequestContextMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);
        req.extensions_mut().insert(correlation_id);

        let path = req.uri().path();
        let audience = Audience::of(path);
        let span = tracing::info_span!(
            "http_request",
            %correlation_id,
            method = %req.method(),
            route = %loggable_route(path),
            audience = audience.as_str(),
            actor_id = tracing::field::Empty,
            status = tracing::field::Empty,
        );
        let actor = req.headers().get(ACTOR_ID_HEADER).and_then(|v| v.to_str().ok());
        if let Some(actor) = actor.filter(|_| audience == Audience::Organizer) {
            span.record("actor_id", actor);
        }

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span.clone()).await?;
            span.record("status", response.status().as_u16());

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::extractors::CorrelationId;
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/test", get(|CorrelationId(id): CorrelationId| async move { id.to_string() }))
            .layer(request_context_layer())
    }

    #[tokio::test]
    async fn correlation_id_is_generated_if_missing() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app().oneshot(request).await.unwrap();

        let correlation_id = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present");
        assert!(Uuid::parse_str(correlation_id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn handler_sees_the_same_id_as_the_response() {
        let request = Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        let header =
            response.headers().get(CORRELATION_ID_HEADER).unwrap().to_str().unwrap().to_owned();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_ne!(header, "not-a-uuid");
        assert_eq!(body, header.as_bytes());
    }

    #[test]
    fn rsvp_link_tokens_are_masked() {
        assert_eq!(loggable_route("/rsvp/accept/abc123"), "/rsvp/accept/:token");
        assert_eq!(loggable_route("/rsvp/open/abc123"), "/rsvp/open/:token");
        assert_eq!(loggable_route("/rsvp/decline/a/b"), "/rsvp/decline/:token");
        assert_eq!(loggable_route("/rsvp/accept"), "/rsvp/accept");
        assert_eq!(loggable_route("/checkin"), "/checkin");
    }

    #[test]
    fn audience_follows_the_path() {
        assert_eq!(Audience::of("/api/invitations/1"), Audience::Organizer);
        assert_eq!(Audience::of("/ready"), Audience::Probe);
        assert_eq!(Audience::of("/rsvp/accept/x"), Audience::Guest);
        assert_eq!(Audience::of("/apiary"), Audience::Guest);
    }
}
