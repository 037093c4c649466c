//! Shared wiring for the service integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use guestlist_core::mocks::{InMemoryRepository, RecordingNotifier};
use guestlist_core::types::{Actor, Event, UserId};
use guestlist_runtime::{Dispatcher, GuestlistEnvironment};
use guestlist_testing::fixtures::{self, Seeded};
use guestlist_testing::{ManualClock, init_test_tracing, test_epoch};

pub type TestEnv = GuestlistEnvironment<InMemoryRepository, RecordingNotifier>;

pub struct Harness {
    pub repo: InMemoryRepository,
    pub notifier: RecordingNotifier,
    pub clock: ManualClock,
    pub env: TestEnv,
    pub event: Event,
    pub actor: Actor,
}

impl Harness {
    pub async fn new() -> Self {
        init_test_tracing();
        let repo = InMemoryRepository::new();
        let notifier = RecordingNotifier::new();
        let clock = ManualClock::new(test_epoch());
        let env = GuestlistEnvironment::new(repo.clone(), Dispatcher::new(notifier.clone()))
            .with_clock(Arc::new(clock.clone()))
            .with_public_base_url("https://app.example.com/");
        let event = fixtures::seed_event(&repo, "Sommerfest").await;

        Self { repo, notifier, clock, env, event, actor: Actor::new(UserId::new()) }
    }

    pub async fn invite(&self, name: &str, accompanying: u32) -> Seeded {
        fixtures::seed_invitation(&self.repo, self.event.id, name, accompanying, self.clock_now())
            .await
            .unwrap()
    }

    pub fn clock_now(&self) -> chrono::DateTime<chrono::Utc> {
        guestlist_core::environment::Clock::now(&self.clock)
    }
}
