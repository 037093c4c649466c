//! # Guestlist Runtime
//!
//! The imperative shell around [`guestlist_core`]: services that open a
//! transaction, lock rows, run the pure reducer, write the diff together
//! with its audit entries, commit, and only then notify organizers.
//!
//! | Service | Operations |
//! |---|---|
//! | [`RsvpService`] | accept, decline, accept on behalf, manual update, regenerate tokens |
//! | [`CheckInService`] | door check-in, attendance toggle |
//! | [`RevertEngine`] | revert responses, revert column changes |
//! | [`InvitationService`] | generate, walk-in, details, open tracking |
//! | [`AuditTrail`] | audit retention |
//!
//! Notifications go through a [`Dispatcher`], which bounds every delivery
//! with a timeout and swallows failures after logging and counting them.

pub mod audit;
pub mod check_in;
pub mod dispatch;
pub mod environment;
pub mod invitations;
pub mod messages;
pub mod metrics;
pub mod notifiers;
mod persist;
pub mod revert;
pub mod rsvp;

pub use audit::AuditTrail;
pub use check_in::{CheckInKind, CheckInReceipt, CheckInService};
pub use dispatch::{DispatchMode, Dispatcher};
pub use environment::GuestlistEnvironment;
pub use invitations::{Generated, InvitationService};
pub use revert::{RevertEngine, RevertSummary};
pub use rsvp::{RsvpReceipt, RsvpService};
