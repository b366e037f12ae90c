//! Waiting primitives shared by the queue and the readiness latch.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep a readiness waiter takes before re-checking state.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Soft deadline given to the engine to consume pending input before a
/// readiness wait starts observing the latch.
pub const DRAIN_DEADLINE: Duration = Duration::from_secs(1);

/// Reason a readiness wait ended without observing READY.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitError {
    /// [`ReadyLatch::interrupt`](crate::ReadyLatch::interrupt) was called while waiting.
    Interrupted,
    /// The latch was closed; the engine will not become ready again.
    Closed,
    /// The caller-supplied timeout elapsed.
    TimedOut,
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitError::Interrupted => f.write_str("readiness wait interrupted"),
            WaitError::Closed => f.write_str("readiness latch closed"),
            WaitError::TimedOut => f.write_str("readiness wait timed out"),
        }
    }
}

impl std::error::Error for WaitError {}

/// Yields the current thread until `done` holds or `deadline` passes.
///
/// Returns the final value of `done`.
pub fn spin_until(deadline: Instant, mut done: impl FnMut() -> bool) -> bool {
    loop {
        if done() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn spin_until_stops_on_condition() {
        let calls = Cell::new(0);
        let done = spin_until(Instant::now() + Duration::from_secs(5), || {
            calls.set(calls.get() + 1);
            calls.get() == 3
        });
        assert!(done);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn spin_until_reports_expired_deadline() {
        assert!(!spin_until(Instant::now(), || false));
    }
}
