//! Input transport primitives shared by every connection backend.
//!
//! * [`Command`] – one input event travelling from the UI to the engine.
//! * [`CommandQueue`] / [`CommandCursor`] – unbounded MPSC FIFO with a
//!   peekable consumer owned by the engine thread.
//! * [`ReadyLatch`] – BUSY/READY flag the engine publishes and UI threads
//!   wait on.
//! * [`WindowId`] / [`WindowType`] / [`TextAttr`] – engine output handles.

mod command;
mod latch;
mod queue;
pub mod wait;
mod window;

pub use command::{Command, CommandKind, MenuSelection, ESC, NO_INPUT};
pub use latch::{InterruptMark, ReadyLatch};
pub use queue::{command_queue, CommandCursor, CommandQueue};
pub use wait::{WaitError, DRAIN_DEADLINE, READY_POLL_INTERVAL};
pub use window::{TextAttr, WindowId, WindowType};
