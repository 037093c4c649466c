//! Axum HTTP surface for Guestlist.
//!
//! Two audiences share one router:
//!
//! - **Guests** follow unauthenticated token links: accept, decline, the
//!   email open pixel, and the door check-in scanner.
//! - **Organizers** call `/api/*` routes identified by the `X-Actor-Id`
//!   header and authorized per event through
//!   [`AccessControl`](guestlist_core::providers::AccessControl).
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives and receives a correlation id
//! 2. **Extract data** from the request (path token, JSON, actor header)
//! 3. **Authorize** organizer routes against the event
//! 4. **Call the service** in [`guestlist_runtime`]
//! 5. **Map the result** to a status code and JSON body via [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use guestlist_web::{AppState, router};
//!
//! let state = AppState::new(environment, access).with_landing_url(landing);
//! axum::serve(listener, router(state)).await?;
//! ```

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{ACTOR_ID_HEADER, AuthenticatedActor, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, request_context_layer};
pub use router::router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
