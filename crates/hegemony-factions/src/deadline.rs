//! Cooperative per-task deadlines.

use std::time::{Duration, Instant};

/// A point in time after which a decision task must give up.
///
/// Decision work is synchronous, so the deadline is polled rather than
/// enforced by a timer.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget: Some(budget),
        }
    }

    /// A deadline that never expires.
    pub fn never() -> Self {
        Self {
            started: Instant::now(),
            budget: None,
        }
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.budget
            .is_some_and(|budget| self.started.elapsed() >= budget)
    }

    /// Time left before expiry (`None` when unbounded).
    pub fn remaining(&self) -> Option<Duration> {
        self.budget
            .map(|budget| budget.saturating_sub(self.started.elapsed()))
    }

    /// The configured budget in whole milliseconds (0 when unbounded).
    pub fn budget_ms(&self) -> u64 {
        self.budget
            .map_or(0, |b| u64::try_from(b.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_budget_is_immediately_expired() {
        assert!(Deadline::after(Duration::ZERO).is_expired());
    }

    #[test]
    fn unbounded_never_expires() {
        let deadline = Deadline::never();
        assert!(!deadline.is_expired());
        assert_eq!(deadline.remaining(), None);
    }

    #[test]
    fn generous_budget_is_not_expired() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(!deadline.is_expired());
        assert_eq!(deadline.budget_ms(), 60_000);
    }
}
