//! HTTP request handlers.
//!
//! Organized by audience: public token links (`rsvp`, `check_in`) and
//! organizer endpoints (`invitations`, `events`, `guests`, `audit`).

pub mod audit;
pub mod check_in;
pub mod events;
pub mod guests;
pub mod health;
pub mod invitations;
pub mod rsvp;

pub use health::{health_check, readiness_check};
