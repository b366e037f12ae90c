//! Connection configuration records and their TOML file form.
//!
//! ```toml
//! type = "ssh"
//! host = "nethack.alt.org"
//! port = 22
//! username = "player"
//! variant = "nethack"
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::connection::ConnectionType;
use crate::error::{ConnectionError, ConnectionResult};

/// Default SSH port substituted for non-positive values.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Everything needed to build a connection. Validation happens in the
/// factory, not here, so partially filled records can be passed around.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub kind: ConnectionType,
    /// Native engine library name, local connections only.
    pub library_name: Option<String>,
    pub host: Option<String>,
    pub port: i32,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Game variant tag (`nethack`, `slashem`, ...); opaque to the transports.
    pub variant: String,
}

impl ConnectionConfig {
    pub fn for_local(library_name: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            kind: ConnectionType::Local,
            library_name: Some(library_name.into()),
            variant: variant.into(),
            ..Self::default()
        }
    }

    pub fn for_ssh(
        host: impl Into<String>,
        port: i32,
        username: Option<&str>,
        password: Option<&str>,
        variant: impl Into<String>,
    ) -> Self {
        Self {
            kind: ConnectionType::Ssh,
            host: Some(host.into()),
            port,
            username: username.map(str::to_owned),
            password: password.map(str::to_owned),
            variant: variant.into(),
            ..Self::default()
        }
    }

    pub fn for_telnet(host: impl Into<String>, port: i32, variant: impl Into<String>) -> Self {
        Self {
            kind: ConnectionType::Telnet,
            host: Some(host.into()),
            port,
            variant: variant.into(),
            ..Self::default()
        }
    }

    /// Parses a TOML document. The `type` key names the transport.
    pub fn from_toml_str(text: &str) -> ConnectionResult<Self> {
        let raw: RawConfig = toml::from_str(text)
            .map_err(|err| ConnectionError::invalid_config(format!("malformed config: {err}")))?;
        Ok(Self {
            kind: raw.kind.parse()?,
            library_name: raw.library_name,
            host: raw.host,
            port: raw.port.unwrap_or(0),
            username: raw.username,
            password: raw.password,
            variant: raw.variant.unwrap_or_default(),
        })
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: &Path) -> ConnectionResult<Self> {
        debug!("loading connection config from {}", path.display());
        let text = fs::read_to_string(path).map_err(|err| {
            ConnectionError::invalid_config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("kind", &self.kind)
            .field("library_name", &self.library_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("variant", &self.variant)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(rename = "type")]
    kind: String,
    library_name: Option<String>,
    host: Option<String>,
    port: Option<i32>,
    username: Option<String>,
    password: Option<String>,
    variant: Option<String>,
}
