//! Client error types.

use mysqlx_codec::CodecError;
use thiserror::Error;

use crate::crud::CrudError;
use crate::result::ErrorInfo;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The server broke the protocol. The connection is unusable.
    #[error("protocol error: {0}")]
    Protocol(#[from] mysqlx_protocol::ProtocolError),

    /// Framing or IO failure.
    #[error("codec error: {0}")]
    Codec(CodecError),

    /// A field could not be decoded or converted.
    #[error("type error: {0}")]
    Type(#[from] mysqlx_types::TypeError),

    /// Server returned an error.
    #[error("server error {code} ({sql_state}): {message}")]
    Server {
        /// MySQL error code.
        code: u32,
        /// SQLSTATE.
        sql_state: String,
        /// Error message.
        message: String,
        /// Whether the server is about to drop the connection.
        fatal: bool,
    },

    /// A command builder was misused.
    #[error("invalid command: {0}")]
    Crud(#[from] CrudError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection closed by the peer or by an earlier `close`.
    #[error("connection closed")]
    ConnectionClosed,

    /// An earlier protocol error left the session unusable.
    #[error("session is poisoned by an earlier protocol error")]
    Poisoned,

    /// Authentication failed before the server reported an error.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Staging an outbound frame failed to allocate.
    #[error("out of memory staging {requested} bytes")]
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
    },

    /// A handler stopped the exchange.
    #[error("exchange aborted: {0}")]
    Aborted(String),
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Protocol(e) => Self::Protocol(e),
            CodecError::ConnectionClosed => Self::ConnectionClosed,
            CodecError::OutOfMemory { requested } => Self::OutOfMemory { requested },
            other => Self::Codec(other),
        }
    }
}

impl From<ErrorInfo> for Error {
    fn from(info: ErrorInfo) -> Self {
        Self::Server {
            code: info.code,
            sql_state: info.sql_state,
            message: info.message,
            fatal: info.fatal,
        }
    }
}

impl Error {
    /// Check if this error indicates the server broke the protocol.
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// Check if this is a server error with a specific code.
    #[must_use]
    pub fn is_server_error(&self, code: u32) -> bool {
        matches!(self, Self::Server { code: c, .. } if *c == code)
    }

    /// Check if the connection must be abandoned after this error.
    ///
    /// Server-reported errors leave the session usable unless the server
    /// marked them fatal. Builder and configuration errors never touch the
    /// connection.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Protocol(_)
            | Self::Codec(_)
            | Self::OutOfMemory { .. }
            | Self::ConnectionClosed
            | Self::Poisoned => true,
            Self::Server { fatal, .. } => *fatal,
            _ => false,
        }
    }

    /// SQLSTATE if this is a server error.
    #[must_use]
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Server { sql_state, .. } => Some(sql_state),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
