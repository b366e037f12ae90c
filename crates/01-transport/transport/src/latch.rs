//! Readiness latch: tells waiters whether the engine is parked on input.
//!
//! The engine thread flips the flag; any thread may wait on it. Each
//! BUSY→READY transition bumps an epoch so a waiter woken by `set_ready`
//! still returns even if `set_busy` runs before it reacquires the monitor.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::wait::WaitError;

#[derive(Debug, Default)]
struct LatchState {
    ready: bool,
    ready_epoch: u64,
    interrupts: u64,
    closed: bool,
}

/// Interrupt count observed at some instant. A wait started from a mark
/// fails with [`WaitError::Interrupted`] if any interrupt landed after it,
/// even one raised before the wait itself began.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterruptMark(u64);

/// Binary BUSY/READY flag guarded by a single monitor.
#[derive(Debug, Default)]
pub struct ReadyLatch {
    state: Mutex<LatchState>,
    changed: Condvar,
}

impl ReadyLatch {
    /// Creates a latch in the BUSY state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the engine READY and wakes every waiter.
    ///
    /// Returns `true` when the flag changed. A closed latch stays BUSY.
    pub fn set_ready(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        let transitioned = !state.ready;
        if transitioned {
            state.ready = true;
            state.ready_epoch = state.ready_epoch.wrapping_add(1);
        }
        drop(state);
        self.changed.notify_all();
        transitioned
    }

    /// Marks the engine BUSY. Returns `true` when the flag changed.
    pub fn set_busy(&self) -> bool {
        let mut state = self.state.lock();
        let transitioned = state.ready;
        state.ready = false;
        drop(state);
        if transitioned {
            self.changed.notify_all();
        }
        transitioned
    }

    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Wakes current waiters with [`WaitError::Interrupted`].
    pub fn interrupt(&self) {
        let mut state = self.state.lock();
        state.interrupts = state.interrupts.wrapping_add(1);
        drop(state);
        self.changed.notify_all();
    }

    pub fn interrupt_mark(&self) -> InterruptMark {
        InterruptMark(self.state.lock().interrupts)
    }

    pub fn interrupted_since(&self, mark: InterruptMark) -> bool {
        self.state.lock().interrupts != mark.0
    }

    /// Permanently closes the latch; current and future waits fail with
    /// [`WaitError::Closed`]. The ready flag drops to BUSY.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.ready = false;
        drop(state);
        self.changed.notify_all();
    }

    /// Blocks until the engine is READY, sleeping at most `poll_interval`
    /// between checks.
    pub fn await_ready(&self, poll_interval: Duration) -> Result<(), WaitError> {
        self.await_ready_by(poll_interval, self.interrupt_mark(), None)
    }

    /// Like [`await_ready`](Self::await_ready) but gives up after `timeout`.
    pub fn await_ready_timeout(
        &self,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<(), WaitError> {
        self.await_ready_by(
            poll_interval,
            self.interrupt_mark(),
            Some(Instant::now() + timeout),
        )
    }

    /// Blocks until the engine is READY, an interrupt newer than `since`
    /// arrives, the latch closes, or `deadline` passes.
    ///
    /// Readiness counts only from the moment this call takes the monitor;
    /// interrupts count from `since`.
    pub fn await_ready_by(
        &self,
        poll_interval: Duration,
        since: InterruptMark,
        deadline: Option<Instant>,
    ) -> Result<(), WaitError> {
        let mut state = self.state.lock();
        let start_epoch = state.ready_epoch;
        loop {
            if state.ready || state.ready_epoch != start_epoch {
                return Ok(());
            }
            if state.closed {
                return Err(WaitError::Closed);
            }
            if state.interrupts != since.0 {
                return Err(WaitError::Interrupted);
            }
            let sleep = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(WaitError::TimedOut);
                    }
                    poll_interval.min(deadline - now)
                }
                None => poll_interval,
            };
            self.changed.wait_for(&mut state, sleep);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const POLL: Duration = Duration::from_millis(10);

    #[test]
    fn starts_busy_and_reports_transitions() {
        let latch = ReadyLatch::new();
        assert!(!latch.is_ready());
        assert!(latch.set_ready());
        assert!(!latch.set_ready(), "second ready is not a transition");
        assert!(latch.is_ready());
        assert!(latch.set_busy());
        assert!(!latch.set_busy());
        assert!(!latch.is_ready());
    }

    #[test]
    fn await_returns_immediately_when_ready() {
        let latch = ReadyLatch::new();
        latch.set_ready();
        assert_eq!(latch.await_ready(POLL), Ok(()));
    }

    #[test]
    fn await_wakes_on_ready() {
        let latch = Arc::new(ReadyLatch::new());
        let engine = {
            let latch = Arc::clone(&latch);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                latch.set_ready();
            })
        };
        assert_eq!(
            latch.await_ready_timeout(POLL, Duration::from_secs(5)),
            Ok(())
        );
        engine.join().unwrap();
    }

    #[test]
    fn ready_then_busy_is_not_lost() {
        let latch = Arc::new(ReadyLatch::new());
        let waiter = {
            let latch = Arc::clone(&latch);
            thread::spawn(move || {
                latch.await_ready_timeout(Duration::from_secs(1), Duration::from_secs(5))
            })
        };
        // Give the waiter time to park, then pulse READY and BUSY back to back.
        thread::sleep(Duration::from_millis(30));
        latch.set_ready();
        latch.set_busy();
        assert_eq!(waiter.join().unwrap(), Ok(()));
    }

    #[test]
    fn interrupt_is_reported() {
        let latch = Arc::new(ReadyLatch::new());
        let waiter = {
            let latch = Arc::clone(&latch);
            thread::spawn(move || latch.await_ready(POLL))
        };
        thread::sleep(Duration::from_millis(30));
        latch.interrupt();
        assert_eq!(waiter.join().unwrap(), Err(WaitError::Interrupted));
    }

    #[test]
    fn interrupt_before_the_wait_is_kept_by_its_mark() {
        let latch = ReadyLatch::new();
        let mark = latch.interrupt_mark();
        assert!(!latch.interrupted_since(mark));
        latch.interrupt();
        assert!(latch.interrupted_since(mark));
        assert_eq!(
            latch.await_ready_by(POLL, mark, None),
            Err(WaitError::Interrupted)
        );
        assert_eq!(
            latch.await_ready_by(POLL, latch.interrupt_mark(), Some(Instant::now())),
            Err(WaitError::TimedOut),
            "a fresh mark ignores older interrupts"
        );
    }

    #[test]
    fn closed_latch_fails_all_waits() {
        let latch = ReadyLatch::new();
        latch.set_ready();
        latch.close();
        assert!(!latch.is_ready());
        assert!(latch.is_closed());
        assert!(!latch.set_ready());
        assert!(!latch.is_ready());
        assert_eq!(latch.await_ready(POLL), Err(WaitError::Closed));
    }

    #[test]
    fn timeout_elapses_while_busy() {
        let latch = ReadyLatch::new();
        assert_eq!(
            latch.await_ready_timeout(POLL, Duration::from_millis(25)),
            Err(WaitError::TimedOut)
        );
    }
}
