//! # Guestlist Testing
//!
//! Testing utilities and helpers for Guestlist.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - Row builders and repository seeding ([`fixtures`])
//! - A Given-When-Then harness for the RSVP reducer ([`TransitionTest`])
//! - proptest strategies for RSVP commands ([`properties`])
//!
//! ## Example
//!
//! ```ignore
//! use guestlist_core::mocks::InMemoryRepository;
//! use guestlist_testing::{fixtures, test_clock};
//!
//! #[tokio::test]
//! async fn accept_confirms_the_guest() {
//!     let repo = InMemoryRepository::new();
//!     let event = fixtures::seed_event(&repo, "Sommerfest").await;
//!     let seeded = fixtures::seed_invitation(&repo, event.id, "Ada", 0, test_clock().now())
//!         .await
//!         .unwrap();
//!     // ... run the service under test
//! }
//! ```

use chrono::{DateTime, Utc};
use guestlist_core::environment::Clock;

pub mod fixtures;
pub mod transition_test;

pub use transition_test::TransitionTest;

/// Mock implementations of Environment traits
pub mod mocks {
    use std::sync::{Arc, Mutex};

    use chrono::Duration;

    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use guestlist_testing::mocks::FixedClock;
    /// use guestlist_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the service under test.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self { time: Arc::new(Mutex::new(time)) }
        }

        /// Move the clock forward by `by`
        #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap();
            *time += by;
        }

        /// Jump to `time`
        #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap() = time;
        }
    }

    impl Clock for ManualClock {
        #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap()
        }
    }

    /// The instant every test clock starts at (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use guestlist_core::types::{InvitationPatch, PartyDeclaration, PartyMember, RsvpResponse};
    use guestlist_core::rsvp::RsvpCommand;
    use proptest::prelude::*;

    /// Any RSVP response.
    pub fn arb_response() -> impl Strategy<Value = RsvpResponse> {
        prop_oneof![
            Just(RsvpResponse::Pending),
            Just(RsvpResponse::Accepted),
            Just(RsvpResponse::Declined),
        ]
    }

    /// Party declarations within `max` seats, some of them invalid.
    pub fn arb_party(max: u32) -> impl Strategy<Value = PartyDeclaration> {
        (proptest::option::of(0..=max + 2), 0..=3usize).prop_map(|(count, named)| {
            PartyDeclaration {
                count,
                members: (0..named)
                    .map(|i| PartyMember {
                        first_name: format!("Gast {i}"),
                        ..PartyMember::default()
                    })
                    .collect(),
            }
        })
    }

    /// Any RSVP command.
    pub fn arb_command(max: u32) -> impl Strategy<Value = RsvpCommand> {
        prop_oneof![
            arb_party(max).prop_map(RsvpCommand::Accept),
            Just(RsvpCommand::Decline),
            Just(RsvpCommand::AcceptOnBehalf),
            Just(RsvpCommand::RegenerateTokens),
            proptest::option::of(arb_response()).prop_map(|response| {
                RsvpCommand::ManualUpdate(InvitationPatch { response, ..InvitationPatch::default() })
            }),
        ]
    }
}

/// Installs a test subscriber that prints `tracing` output for failing tests.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock, test_epoch};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(test_epoch());
        let handle = clock.clone();
        handle.advance(chrono::Duration::hours(3));
        assert_eq!(clock.now(), test_epoch() + chrono::Duration::hours(3));
    }
}
