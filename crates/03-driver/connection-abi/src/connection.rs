//! The uniform control surface every transport implements.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConnectionError, ConnectionResult};
use crate::sink::EventSink;

/// Transport families a connection can be built from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionType {
    /// Engine loaded in-process from a native library.
    #[default]
    Local,
    /// Remote host reached over SSH.
    Ssh,
    /// Remote host reached over telnet.
    Telnet,
}

impl ConnectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionType::Local => "local",
            ConnectionType::Ssh => "ssh",
            ConnectionType::Telnet => "telnet",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(ConnectionType::Local),
            "ssh" => Ok(ConnectionType::Ssh),
            "telnet" => Ok(ConnectionType::Telnet),
            _ => Err(ConnectionError::UnknownConnectionType(s.to_owned())),
        }
    }
}

/// Lifecycle of the single session a connection hosts.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle = 0,
    Starting = 1,
    Running = 2,
    Ending = 3,
    Dead = 4,
}

impl SessionState {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(SessionState::Idle),
            1 => Some(SessionState::Starting),
            2 => Some(SessionState::Running),
            3 => Some(SessionState::Ending),
            4 => Some(SessionState::Dead),
            _ => None,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, SessionState::Ending | SessionState::Dead)
    }
}

/// Control surface shared by local and remote transports.
///
/// Every method takes `&self`; a connection is shared between UI threads
/// behind an `Arc`. `start` and `disconnect` must not race each other or
/// other calls on the same instance; everything else may run concurrently.
pub trait Connection: Send + Sync {
    /// Attaches the session. Succeeds at most once.
    fn start(&self, data_dir: &Path) -> ConnectionResult<()>;

    /// Queues a keystroke. Never blocks.
    fn send_key(&self, key: char);
    /// Queues a keystroke from a directional control. Never blocks.
    fn send_directional_key(&self, key: char);
    /// Queues a map click. Never blocks.
    fn send_position(&self, x: i32, y: i32);
    /// Queues a text line. Never blocks.
    fn send_line(&self, line: &str);
    /// Queues a menu result. Never blocks.
    fn send_menu_selection(&self, selected: &[i32]);
    /// Asks the engine to snapshot the game.
    fn save_state(&self);
    /// Queues an ESC that unwinds the current prompt.
    fn abort(&self);

    /// Attached and the engine is still alive.
    fn is_connected(&self) -> bool;
    /// The engine is parked waiting for input.
    fn is_ready(&self) -> bool;
    /// Blocks until the engine is ready for input.
    fn wait_ready(&self) -> ConnectionResult<()>;
    /// Like [`wait_ready`](Self::wait_ready) with an upper bound.
    fn wait_ready_timeout(&self, timeout: Duration) -> ConnectionResult<()>;

    fn connection_type(&self) -> ConnectionType;
    fn session_state(&self) -> SessionState;

    /// Aborts, detaches, and notifies the sink. Idempotent.
    fn disconnect(&self);

    /// Replaces the event sink; `None` clears it. The connection keeps a
    /// non-owning reference.
    fn set_handler(&self, sink: Option<&Arc<dyn EventSink>>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_type_names_case_insensitively() {
        assert_eq!("local".parse::<ConnectionType>().unwrap(), ConnectionType::Local);
        assert_eq!(" SSH ".parse::<ConnectionType>().unwrap(), ConnectionType::Ssh);
        assert_eq!("Telnet".parse::<ConnectionType>().unwrap(), ConnectionType::Telnet);
        let err = "mosh".parse::<ConnectionType>().unwrap_err();
        assert!(matches!(&err, ConnectionError::UnknownConnectionType(name) if name == "mosh"));
        assert_eq!(err.to_string(), "unknown connection type: mosh");
    }

    #[test]
    fn session_state_round_trips_through_u8() {
        for state in [
            SessionState::Idle,
            SessionState::Starting,
            SessionState::Running,
            SessionState::Ending,
            SessionState::Dead,
        ] {
            assert_eq!(SessionState::from_u8(state as u8), Some(state));
        }
        assert_eq!(SessionState::from_u8(5), None);
    }
}
