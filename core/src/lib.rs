//! # Guestlist Core
//!
//! Domain types and the RSVP state machine for event guest lists.
//!
//! An event organizer invites guests. Each guest receives an [`Invitation`]
//! carrying three opaque tokens: one to accept, one to decline and one to
//! track opens. Accepting mints a check-in token for the guest (and one per
//! accompanying guest) which is later presented at the door.
//!
//! ## Layout
//!
//! - [`types`]: identifiers, entities and request payloads
//! - [`tokens`]: typed opaque tokens and the [`TokenIssuer`]
//! - [`attributes`]: the free-form per-guest [`AttributeBag`]
//! - [`audit`]: before/after snapshots of every mutation
//! - [`rsvp`]: the pure [`RsvpReducer`] that decides every RSVP transition
//! - [`providers`]: traits for persistence, notifications and access control
//! - [`mocks`]: in-memory providers (feature `test-utils`)
//!
//! The reducer never performs I/O. Services in `guestlist-runtime` lock the
//! affected rows, run the reducer, persist the diff and dispatch side effects
//! after commit.
//!
//! [`Invitation`]: types::Invitation
//! [`TokenIssuer`]: tokens::TokenIssuer
//! [`AttributeBag`]: attributes::AttributeBag
//! [`RsvpReducer`]: rsvp::RsvpReducer

pub use chrono::{DateTime, Utc};

pub mod attributes;
pub mod audit;
pub mod environment;
pub mod error;
pub mod providers;
pub mod rsvp;
pub mod settings;
pub mod tokens;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod mocks;

pub use error::{GuestlistError, Result};
