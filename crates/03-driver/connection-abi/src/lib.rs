//! Connection ABI shared by the transports and their embedders.
//!
//! This crate defines the boundary between the UI shell and any transport
//! (local engine or remote host): the [`Connection`] control surface, the
//! [`EventSink`] callbacks, configuration records, and errors.

mod config;
mod connection;
mod error;
mod sink;

pub use config::{ConnectionConfig, DEFAULT_SSH_PORT};
pub use connection::{Connection, ConnectionType, SessionState};
pub use error::{ConnectionError, ConnectionResult};
pub use sink::{EventSink, SinkSlot};

// Output handle types carried by sink callbacks.
pub use transport::{TextAttr, WindowId, WindowType};
