use std::io;

use thiserror::Error;
use transport::WaitError;

pub type ConnectionResult<T> = Result<T, ConnectionError>;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("already connected")]
    AlreadyConnected,

    #[error("{0}")]
    InvalidConfig(String),

    #[error("{0}")]
    UnsupportedTransport(String),

    #[error("unknown connection type: {0}")]
    UnknownConnectionType(String),

    #[error("{0}")]
    NotYetImplemented(String),

    #[error("failed to start local game: {0}")]
    StartFailed(#[source] io::Error),

    #[error("wait for readiness interrupted")]
    Interrupted,

    #[error("wait for readiness timed out")]
    TimedOut,

    #[error("connection closed")]
    Disconnected,
}

impl ConnectionError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        ConnectionError::InvalidConfig(msg.into())
    }
}

impl From<WaitError> for ConnectionError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Interrupted => ConnectionError::Interrupted,
            WaitError::TimedOut => ConnectionError::TimedOut,
            WaitError::Closed => ConnectionError::Disconnected,
        }
    }
}
