//! # mysqlx-protocol
//!
//! Pure implementation of the MySQL X Protocol wire format.
//!
//! Every X Protocol message travels in a frame made of a 4-byte little-endian
//! length, a 1-byte message type and a protobuf-encoded payload. This crate
//! holds the frame header, a minimal protobuf field reader and writer, and
//! the message structures a client sends or receives.
//!
//! ## Design Philosophy
//!
//! This crate is IO-agnostic. It contains no networking logic; the codec and
//! client crates build on it.
//!
//! ## Example
//!
//! ```rust
//! use mysqlx_protocol::{ClientMessage, Encode, StmtExecute, FrameHeader};
//!
//! let stmt = StmtExecute::sql("SELECT 1");
//! let payload = stmt.encode_to_bytes();
//! let header = FrameHeader::new(StmtExecute::MESSAGE_TYPE as u8, payload.len())?;
//! assert_eq!(header.total_length(), 4 + 1 + payload.len());
//! # Ok::<(), mysqlx_protocol::ProtocolError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

/// Define a message without fields.
macro_rules! empty_message {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl $crate::wire::Encode for $name {
            fn encode(&self, _dst: &mut ::bytes::BytesMut) {}
        }

        impl $crate::wire::Decode for $name {
            fn decode(src: ::bytes::Bytes) -> Result<Self, $crate::error::ProtocolError> {
                let mut fields = $crate::wire::FieldReader::new(src);
                while fields.next_field()?.is_some() {}
                Ok(Self)
            }
        }
    };
}

pub mod connection;
pub mod crud;
pub mod datatypes;
pub mod error;
pub mod expr;
pub mod frame;
pub mod message;
pub mod notice;
pub mod resultset;
pub mod session;
pub mod sql;
pub mod status;
pub mod wire;

pub use connection::{Capabilities, CapabilitiesGet, CapabilitiesSet, Capability, ConnectionClose};
pub use crud::{Collection, DataModel, Direction, Find, Limit, Order, Projection, RowLock, RowLockOptions};
pub use datatypes::{Any, ObjectField, Scalar, ScalarType};
pub use error::ProtocolError;
pub use expr::{ColumnIdentifier, DocumentPathItem, Expr, ExprObjectField, FunctionCall, Identifier, Operator};
pub use frame::{DEFAULT_MAX_FRAME_SIZE, FRAME_HEADER_SIZE, FrameHeader, LENGTH_PREFIX_SIZE, MAX_PAYLOAD_SIZE};
pub use message::{ClientMessage, ClientMessageType, ServerMessage, ServerMessageType};
pub use notice::{
    Frame as NoticeFrame, NoticeScope, NoticeType, SessionStateChanged, SessionVariableChanged,
    StateParameter, Warning, WarningLevel,
};
pub use resultset::{ColumnFlags, ColumnMetaData, ContentType, FieldType, Row};
pub use session::{AuthenticateContinue, AuthenticateOk, AuthenticateStart};
pub use sql::{StmtExecute, StmtExecuteOk};
pub use status::{ErrorMessage, OkMessage, Severity};
pub use wire::{Decode, Encode};
