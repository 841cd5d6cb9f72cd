//! Client error types.

use thiserror::Error;

/// Errors that can occur while establishing or using a connection.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level connect failure, or a failed database-selection
    /// handshake. Not retried internally.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The server rejected the configured credential during the handshake.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The server closed the connection mid-exchange.
    #[error("connection closed")]
    ConnectionClosed,

    /// A bounded exchange did not complete in time. The connection's session
    /// state is unknown afterwards, so it is marked broken.
    #[error("operation timed out")]
    Timeout,

    /// Malformed or unexpected reply shape, or an error reply from the
    /// server. The connection is marked broken: a reply the client cannot
    /// account for means request/reply pairing can no longer be trusted.
    #[error("protocol error: {0}")]
    Protocol(#[from] resp_protocol::ProtocolError),

    /// IO error on the transport.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration (bad URL, bad port, ...).
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error came out of connection establishment — transport
    /// connect, authentication, or database selection.
    #[must_use]
    pub fn is_connect_error(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Auth(_))
    }

    /// Whether the connection that produced this error can still be trusted.
    ///
    /// Timeouts, transport faults, and protocol surprises all leave the
    /// session in an unknown state; such a connection must be discarded
    /// rather than reused.
    #[must_use]
    pub(crate) fn poisons_connection(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::Timeout | Self::Protocol(_) | Self::Io(_)
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
