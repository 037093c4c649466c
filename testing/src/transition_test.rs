//! Ergonomic testing utilities for the RSVP reducer
//!
//! A fluent API for testing RSVP transitions with readable Given-When-Then
//! syntax.

#![allow(clippy::module_name_repetitions)] // TransitionTest is the natural name

use chrono::{DateTime, Utc};
use guestlist_core::GuestlistError;
use guestlist_core::rsvp::{RsvpCommand, RsvpReducer, RsvpState, Transition};

use crate::mocks::test_epoch;

/// Type alias for state assertion functions
type StateAssertion = Box<dyn FnOnce(&RsvpState)>;

/// Type alias for transition assertion functions
type TransitionAssertion = Box<dyn FnOnce(&Transition)>;

/// Type alias for error assertion functions
type ErrorAssertion = Box<dyn FnOnce(&GuestlistError)>;

/// Fluent API for testing the RSVP reducer with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use guestlist_testing::{TransitionTest, fixtures};
///
/// TransitionTest::new(RsvpReducer::default())
///     .given_state(fixtures::pending_state(1))
///     .when_command(RsvpCommand::Decline)
///     .then_state(|state| {
///         assert_eq!(state.invitation.response, RsvpResponse::Declined);
///     })
///     .then_transition(|transition| {
///         assert_eq!(transition.effects.len(), 1);
///     })
///     .run();
/// ```
pub struct TransitionTest {
    reducer: RsvpReducer,
    now: DateTime<Utc>,
    initial_state: Option<RsvpState>,
    command: Option<RsvpCommand>,
    state_assertions: Vec<StateAssertion>,
    transition_assertions: Vec<TransitionAssertion>,
    error_assertion: Option<ErrorAssertion>,
}

impl TransitionTest {
    /// Create a new test for the given reducer, at the test epoch
    #[must_use]
    pub fn new(reducer: RsvpReducer) -> Self {
        Self {
            reducer,
            now: test_epoch(),
            initial_state: None,
            command: None,
            state_assertions: Vec::new(),
            transition_assertions: Vec::new(),
            error_assertion: None,
        }
    }

    /// Run the command at `now` instead of the test epoch
    #[must_use]
    pub const fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: RsvpState) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Set the command to test (When)
    #[must_use]
    pub fn when_command(mut self, command: RsvpCommand) -> Self {
        self.command = Some(command);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&RsvpState) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the transition (Then)
    #[must_use]
    pub fn then_transition<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&Transition) + 'static,
    {
        self.transition_assertions.push(Box::new(assertion));
        self
    }

    /// Expect the command to fail (Then)
    ///
    /// The state must also come back unchanged.
    #[must_use]
    pub fn then_error<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&GuestlistError) + 'static,
    {
        self.error_assertion = Some(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state or command is not set, if the command
    /// succeeds or fails against expectation, or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let initial = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let command = self.command.expect("Command must be set with when_command()");

        let mut state = initial.clone();
        let result = self.reducer.reduce(&mut state, command, self.now);

        match (result, self.error_assertion) {
            (Ok(transition), None) => {
                for assertion in self.transition_assertions {
                    assertion(&transition);
                }
            }
            (Err(error), Some(assertion)) => {
                assert_eq!(state, initial, "state must not change on error");
                assertion(&error);
            }
            (Ok(transition), Some(_)) => {
                panic!("Expected an error, but the command produced {transition:?}")
            }
            (Err(error), None) => panic!("Unexpected error: {error}"),
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
    }
}
