//! Codec error types.

use mysqlx_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised while framing or moving X Protocol frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Underlying stream failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame header or payload violated the protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A frame exceeded the configured maximum.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Frame payload size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// Staging an outbound frame could not allocate its buffer.
    #[error("out of memory staging a {requested} byte frame")]
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
    },
}
