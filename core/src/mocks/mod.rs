//! Mock provider implementations for testing.
//!
//! Simple in-memory implementations of every provider trait, for unit and
//! integration tests across the workspace.

pub mod access;
pub mod notifier;
pub mod repository;

pub use access::MockAccessControl;
pub use notifier::RecordingNotifier;
pub use repository::{InMemoryRepository, InMemoryTx};
