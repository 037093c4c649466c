//! `PostgreSQL` persistence for Guestlist.
//!
//! Implements the [`Repository`] and [`AccessControl`] provider traits from
//! `guestlist-core` on top of a sqlx connection pool.
//!
//! - Every mutation runs in one database transaction; `lock_*` reads take
//!   `FOR UPDATE` row locks, so concurrent RSVPs on the same invitation
//!   serialize.
//! - The `(guest_id, event_id)` unique constraint on invitations surfaces as
//!   [`GuestlistError::Conflict`].
//! - Schema migrations ship with the crate and run through
//!   [`PostgresRepository::migrate`].
//!
//! # Example
//!
//! ```no_run
//! use guestlist_postgres::PostgresRepository;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repository = PostgresRepository::connect("postgres://localhost/guestlist", 10).await?;
//! repository.migrate().await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Repository`]: guestlist_core::providers::Repository
//! [`AccessControl`]: guestlist_core::providers::AccessControl
//! [`GuestlistError::Conflict`]: guestlist_core::GuestlistError::Conflict

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod repository;
mod rows;

pub use access::PostgresAccessControl;
pub use repository::{PostgresRepository, PostgresTx};
