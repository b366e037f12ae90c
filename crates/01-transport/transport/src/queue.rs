//! Unbounded MPSC command queue between UI producers and the engine thread.
//!
//! Producers hold a cloneable [`CommandQueue`]; the engine thread owns the
//! single [`CommandCursor`]. The cursor can peek at the head so prompt
//! specific pulls may leave commands of another kind in place. A shared
//! pending counter tracks commands that the engine has not taken yet,
//! including a peeked head, so producers can wait for the engine to catch up.
//! A second counter tracks queued [`Command::Abort`]s so the consumer knows
//! an escape is on its way without scanning the channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::trace;

use crate::command::Command;
use crate::wait::spin_until;

/// Creates a connected producer/consumer pair.
pub fn command_queue() -> (CommandQueue, CommandCursor) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let counts = Arc::new(Counts::default());
    (
        CommandQueue {
            tx,
            counts: Arc::clone(&counts),
        },
        CommandCursor {
            rx,
            head: None,
            counts,
        },
    )
}

#[derive(Debug, Default)]
struct Counts {
    pending: AtomicUsize,
    aborts: AtomicUsize,
}

impl Counts {
    fn add(&self, cmd: &Command) {
        if matches!(cmd, Command::Abort) {
            self.aborts.fetch_add(1, Ordering::AcqRel);
        }
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    fn remove(&self, cmd: &Command) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
        if matches!(cmd, Command::Abort) {
            self.aborts.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// Producer side of the command queue.
#[derive(Clone, Debug)]
pub struct CommandQueue {
    tx: Sender<Command>,
    counts: Arc<Counts>,
}

impl CommandQueue {
    /// Appends a command. Never blocks and never fails.
    ///
    /// Commands enqueued after the consumer went away are discarded.
    pub fn enqueue(&self, cmd: Command) {
        // Count before publishing so the consumer never decrements below zero.
        self.counts.add(&cmd);
        if let Err(err) = self.tx.send(cmd) {
            self.counts.remove(&err.0);
            trace!("command queue: consumer gone, dropping {:?}", err.0.kind());
        }
    }

    /// Commands enqueued but not yet taken by the consumer.
    pub fn len(&self) -> usize {
        self.counts.pending.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Yields the current thread until the consumer has taken every pending
    /// command or `deadline` passes. Returns `true` when the queue drained.
    pub fn drain_within(&self, deadline: Instant) -> bool {
        self.drain_unless(deadline, || false)
    }

    /// Like [`drain_within`](Self::drain_within) but gives up as soon as
    /// `stop` holds. Returns `true` only when the queue drained.
    pub fn drain_unless(&self, deadline: Instant, mut stop: impl FnMut() -> bool) -> bool {
        spin_until(deadline, || self.is_empty() || stop());
        self.is_empty()
    }
}

/// Consumer side of the command queue, owned by the engine thread.
#[derive(Debug)]
pub struct CommandCursor {
    rx: Receiver<Command>,
    head: Option<Command>,
    counts: Arc<Counts>,
}

impl CommandCursor {
    /// Returns the oldest command without taking it.
    pub fn peek(&mut self) -> Option<&Command> {
        if self.head.is_none() {
            self.head = match self.rx.try_recv() {
                Ok(cmd) => Some(cmd),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
            };
        }
        self.head.as_ref()
    }

    /// Takes the oldest command, if any.
    pub fn try_pop(&mut self) -> Option<Command> {
        self.peek()?;
        let cmd = self.head.take()?;
        self.counts.remove(&cmd);
        Some(cmd)
    }

    /// Takes the oldest command only when `accept` approves it.
    pub fn pop_if(&mut self, accept: impl FnOnce(&Command) -> bool) -> Option<Command> {
        if accept(self.peek()?) {
            self.try_pop()
        } else {
            None
        }
    }

    /// Commands enqueued but not yet taken, including a peeked head.
    pub fn len(&self) -> usize {
        self.counts.pending.load(Ordering::Acquire)
    }

    /// Whether an [`Command::Abort`] is waiting anywhere in the queue.
    pub fn abort_queued(&self) -> bool {
        self.counts.aborts.load(Ordering::Acquire) > 0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
