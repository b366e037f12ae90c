//! Connection factory: turns a [`ConnectionConfig`] into a live transport.

use std::sync::Arc;

use log::debug;

pub use connection_abi::{
    Connection, ConnectionConfig, ConnectionError, ConnectionResult, ConnectionType, EventSink,
    SessionState, TextAttr, WindowId, WindowType, DEFAULT_SSH_PORT,
};
pub use connection_local::LocalConnection;
pub use connection_remote::RemoteConnection;
pub use runtime_native::{EngineLoader, ExitPolicy, InputMode, NativeLoader};

/// Builds connections with a shared engine loader and exit policy.
#[derive(Clone)]
pub struct ConnectionFactory {
    loader: Arc<dyn EngineLoader>,
    exit_policy: ExitPolicy,
}

impl ConnectionFactory {
    /// Creates a new builder for constructing a factory.
    pub fn builder() -> ConnectionFactoryBuilder {
        ConnectionFactoryBuilder::new()
    }

    /// Local connection hosting the engine found in `library_name`.
    pub fn create_local_connection(&self, library_name: &str) -> LocalConnection {
        LocalConnection::with_loader(library_name, Arc::clone(&self.loader))
            .exit_policy(self.exit_policy)
    }

    /// Remote connection over SSH.
    pub fn create_ssh_connection(
        &self,
        host: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> RemoteConnection {
        RemoteConnection::ssh(host, port, username, password)
    }

    /// Validates `config` and builds the matching transport.
    pub fn create_connection(
        &self,
        config: &ConnectionConfig,
    ) -> ConnectionResult<Box<dyn Connection>> {
        debug!("creating {} connection ({})", config.kind, config.variant);
        match config.kind {
            ConnectionType::Local => Ok(Box::new(self.local_from_config(config)?)),
            ConnectionType::Ssh => Ok(Box::new(self.ssh_from_config(config)?)),
            ConnectionType::Telnet => Err(ConnectionError::UnsupportedTransport(
                "Telnet connections not yet supported".into(),
            )),
        }
    }

    /// Local connection for a config naming an engine library.
    pub fn local_from_config(&self, config: &ConnectionConfig) -> ConnectionResult<LocalConnection> {
        let library = non_empty(config.library_name.as_deref()).ok_or_else(|| {
            ConnectionError::invalid_config("Library name required for local connection")
        })?;
        Ok(self.create_local_connection(library))
    }

    /// SSH connection for a config naming a host. Missing credentials
    /// become empty strings.
    pub fn ssh_from_config(&self, config: &ConnectionConfig) -> ConnectionResult<RemoteConnection> {
        let host = non_empty(config.host.as_deref())
            .ok_or_else(|| ConnectionError::invalid_config("Host required for SSH connection"))?;
        let port = ssh_port(config.port)?;
        Ok(self.create_ssh_connection(
            host,
            port,
            config.username.as_deref().unwrap_or_default(),
            config.password.as_deref().unwrap_or_default(),
        ))
    }
}

impl Default for ConnectionFactory {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("exit_policy", &self.exit_policy)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`ConnectionFactory`]. Unset parts fall back to the
/// platform loader and [`ExitPolicy::Process`].
pub struct ConnectionFactoryBuilder {
    loader: Option<Arc<dyn EngineLoader>>,
    exit_policy: ExitPolicy,
}

impl ConnectionFactoryBuilder {
    pub fn new() -> Self {
        Self {
            loader: None,
            exit_policy: ExitPolicy::default(),
        }
    }

    /// Sets the loader local connections resolve engines through.
    pub fn loader(mut self, loader: Arc<dyn EngineLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Sets what local connections do to the process when the engine ends.
    pub fn exit_policy(mut self, policy: ExitPolicy) -> Self {
        self.exit_policy = policy;
        self
    }

    pub fn build(self) -> ConnectionFactory {
        ConnectionFactory {
            loader: self.loader.unwrap_or_else(|| Arc::new(NativeLoader)),
            exit_policy: self.exit_policy,
        }
    }
}

impl Default for ConnectionFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Local connection using the platform loader.
pub fn create_local_connection(library_name: &str) -> LocalConnection {
    ConnectionFactory::default().create_local_connection(library_name)
}

/// Remote SSH connection.
pub fn create_ssh_connection(
    host: &str,
    port: u16,
    username: &str,
    password: &str,
) -> RemoteConnection {
    RemoteConnection::ssh(host, port, username, password)
}

/// Builds a connection from `config` using the platform loader.
pub fn create_connection(config: &ConnectionConfig) -> ConnectionResult<Box<dyn Connection>> {
    ConnectionFactory::default().create_connection(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Non-positive ports select the SSH default.
fn ssh_port(port: i32) -> ConnectionResult<u16> {
    if port <= 0 {
        return Ok(DEFAULT_SSH_PORT);
    }
    u16::try_from(port)
        .map_err(|_| ConnectionError::invalid_config(format!("Port out of range: {port}")))
}
