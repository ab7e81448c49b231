//! Protocol error types.

use thiserror::Error;

/// Errors raised while framing or decoding X Protocol messages.
///
/// Every variant is fatal to the exchange that produced it. Callers should
/// consider the connection unusable once one of these surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The frame carried a message type outside the server message enumeration.
    #[error("unknown server message type: {0}")]
    UnknownMessageType(u8),

    /// A varint ran past ten bytes or past the end of its buffer.
    #[error("malformed varint")]
    MalformedVarint,

    /// A fixed-size field or length-delimited payload was truncated.
    #[error("unexpected end of data: need {needed} bytes, have {available}")]
    UnexpectedEof {
        /// Bytes required.
        needed: usize,
        /// Bytes remaining.
        available: usize,
    },

    /// A field arrived with a wire type its message does not allow.
    #[error("field {field} has unexpected wire type {wire_type}")]
    InvalidWireType {
        /// Protobuf field number.
        field: u32,
        /// Raw wire type.
        wire_type: u8,
    },

    /// A required field was absent.
    #[error("{message} is missing required field `{field}`")]
    MissingField {
        /// Message shape being decoded.
        message: &'static str,
        /// Field name.
        field: &'static str,
    },

    /// An enumeration field held a value with no known meaning.
    #[error("invalid {kind} value: {value}")]
    InvalidEnumValue {
        /// Enumeration name.
        kind: &'static str,
        /// Raw value received.
        value: u64,
    },

    /// A numeric field does not fit its declared width.
    #[error("field {field} value {value} out of range")]
    ValueOutOfRange {
        /// Protobuf field number.
        field: u32,
        /// Raw value received.
        value: u64,
    },

    /// A string field was not valid UTF-8.
    #[error("invalid UTF-8 in field {0}")]
    InvalidUtf8(u32),

    /// The frame length prefix is zero, so there is no type byte.
    #[error("invalid frame length: {0}")]
    InvalidFrameLength(u32),

    /// The frame exceeds the configured maximum size.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Announced frame size.
        size: usize,
        /// Configured limit.
        max: usize,
    },
}
