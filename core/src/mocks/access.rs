//! Mock access control for testing.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::{GuestlistError, Result};
use crate::providers::AccessControl;
use crate::types::{Actor, EventId, UserId};

#[derive(Debug, Default)]
struct Grants {
    allow_all: bool,
    members: HashSet<(UserId, EventId)>,
    admins: HashSet<UserId>,
}

/// Access control backed by an in-memory grant list.
#[derive(Debug, Clone, Default)]
pub struct MockAccessControl {
    grants: Arc<Mutex<Grants>>,
}

impl MockAccessControl {
    /// Denies everything until grants are added.
    #[must_use]
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Allows every actor on every event, including admin operations.
    #[must_use]
    pub fn allow_all() -> Self {
        let access = Self::default();
        access.set_allow_all(true);
        access
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    fn set_allow_all(&self, allow: bool) {
        self.grants.lock().unwrap().allow_all = allow;
    }

    /// Lets `user_id` manage `event_id`.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn grant(&self, user_id: UserId, event_id: EventId) {
        self.grants.lock().unwrap().members.insert((user_id, event_id));
    }

    /// Makes `user_id` a system administrator.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn make_admin(&self, user_id: UserId) {
        self.grants.lock().unwrap().admins.insert(user_id);
    }
}

impl AccessControl for MockAccessControl {
    async fn require_event_access(&self, actor: &Actor, event_id: EventId) -> Result<()> {
        let allowed = {
            let grants = self
                .grants
                .lock()
                .map_err(|_| GuestlistError::Persistence("Mutex lock failed".to_string()))?;
            grants.allow_all
                || grants.admins.contains(&actor.user_id)
                || grants.members.contains(&(actor.user_id, event_id))
        };
        if allowed {
            Ok(())
        } else {
            Err(GuestlistError::Forbidden(format!("no access to event {event_id}")))
        }
    }

    async fn require_admin(&self, actor: &Actor) -> Result<()> {
        let allowed = {
            let grants = self
                .grants
                .lock()
                .map_err(|_| GuestlistError::Persistence("Mutex lock failed".to_string()))?;
            grants.allow_all || grants.admins.contains(&actor.user_id)
        };
        if allowed {
            Ok(())
        } else {
            Err(GuestlistError::Forbidden("administrator role required".into()))
        }
    }
}
