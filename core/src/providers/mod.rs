//! Guest list providers.
//!
//! Traits for every external dependency the services use: the relational
//! store, the organizer notification channel and the access check for
//! administrative operations.
//!
//! # Unit of Work
//!
//! [`Repository::begin`] opens a [`RepositoryTx`]. All `lock_*` reads inside
//! it take row locks that are held until [`RepositoryTx::commit`] or until
//! the transaction is dropped, which rolls back. Rows are always locked in
//! the order invitation, guest, accompanying guest.
//!
//! ```text
//!  begin ─► lock invitation ─► lock guest ─► lock party ─► reduce
//!                                                            │
//!              dispatch notification ◄── commit ◄── write ◄──┘
//! ```
//!
//! Notifications are only ever dispatched after a successful commit.

pub mod access;
pub mod notifier;
pub mod repository;

pub use access::AccessControl;
pub use notifier::{Notification, Notifier};
pub use repository::{Repository, RepositoryTx};
