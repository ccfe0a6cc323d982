//! Clock port: injected time source so stall/backoff/deadline logic can
//! be driven deterministically in tests.

use chrono::{DateTime, Utc};

/// A source of the current time.
///
/// The rest of the ports in this module are modeled directly on an
/// existing port in the swarm this orchestrator was adapted from; this
/// one is not - it falls out of the testability requirement that stall
/// detection, backoff windows, and deadline checks be exercisable
/// without real sleeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation backed by `Utc::now()`.
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
