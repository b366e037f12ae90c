//! Remote transport placeholder.
//!
//! Holds the SSH endpoint and credentials so callers can already build and
//! configure remote connections; attaching is not supported yet and input
//! is logged and dropped.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use connection_abi::{
    Connection, ConnectionError, ConnectionResult, ConnectionType, EventSink, SessionState,
    SinkSlot,
};
use log::{info, warn};
use transport::ESC;

/// Key a remote game understands as "save".
const SAVE_KEY: char = 'S';

pub struct RemoteConnection {
    kind: ConnectionType,
    host: String,
    port: u16,
    username: String,
    password: String,
    connected: AtomicBool,
    sink: SinkSlot,
}

impl RemoteConnection {
    pub fn ssh(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            kind: ConnectionType::Ssh,
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            connected: AtomicBool::new(false),
            sink: SinkSlot::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    fn unsupported(&self, what: &str) {
        warn!("remote {what} to {}:{}: not implemented", self.host, self.port);
    }
}

impl Connection for RemoteConnection {
    fn start(&self, _data_dir: &Path) -> ConnectionResult<()> {
        info!("remote start requested for {}@{}:{}", self.username, self.host, self.port);
        Err(ConnectionError::NotYetImplemented(
            "Remote connections not yet implemented".into(),
        ))
    }

    fn send_key(&self, _key: char) {
        self.unsupported("send_key");
    }

    fn send_directional_key(&self, _key: char) {
        self.unsupported("send_directional_key");
    }

    fn send_position(&self, _x: i32, _y: i32) {
        self.unsupported("send_position");
    }

    fn send_line(&self, _line: &str) {
        self.unsupported("send_line");
    }

    fn send_menu_selection(&self, _selected: &[i32]) {
        self.unsupported("send_menu_selection");
    }

    fn save_state(&self) {
        self.send_key(SAVE_KEY);
    }

    fn abort(&self) {
        self.send_key(ESC);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn is_ready(&self) -> bool {
        self.is_connected()
    }

    fn wait_ready(&self) -> ConnectionResult<()> {
        Ok(())
    }

    fn wait_ready_timeout(&self, _timeout: Duration) -> ConnectionResult<()> {
        Ok(())
    }

    fn connection_type(&self) -> ConnectionType {
        self.kind
    }

    fn session_state(&self) -> SessionState {
        if self.is_connected() {
            SessionState::Running
        } else {
            SessionState::Idle
        }
    }

    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            self.sink.dispatch(|sink| sink.on_disconnected());
        }
    }

    fn set_handler(&self, sink: Option<&Arc<dyn EventSink>>) {
        self.sink.set(sink);
    }
}

impl fmt::Debug for RemoteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConnection")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
