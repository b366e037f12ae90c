//! Test doubles for driving connections without a native game: a scripted
//! engine, a self-running echo engine, and a sink that records callbacks.

mod echo;
mod scripted;
mod sink;

pub use echo::{EchoEngine, EchoLoader, ECHO_WINDOW};
pub use scripted::{scripted_engine, MockController, MockLoader, Reply};
pub use sink::{recording_sink, RecordingSink, SinkEvent, SinkEvents};

use std::time::Duration;

/// Upper bound for any single mock round trip.
pub const MOCK_TIMEOUT: Duration = Duration::from_secs(5);
