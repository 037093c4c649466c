//! Time abstraction shared by the reducer and the services.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
///
/// Every timestamp the system writes (`respondedAt`, `Zusage Datum`,
/// `arrivedAt`, audit `createdAt`) is read from a `Clock`, so tests can pin
/// or advance time.
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
