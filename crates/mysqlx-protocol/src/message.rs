//! Message type identifiers and the decoded server message union.

use bytes::{Bytes, BytesMut};

use crate::connection::Capabilities;
use crate::error::ProtocolError;
use crate::notice::Frame;
use crate::resultset::{
    ColumnMetaData, FetchDone, FetchDoneMoreOutParams, FetchDoneMoreResultsets, FetchSuspended,
    Row,
};
use crate::session::{AuthenticateContinue, AuthenticateOk};
use crate::sql::StmtExecuteOk;
use crate::status::{ErrorMessage, OkMessage};
use crate::wire::{Decode, Encode};

/// Server-to-client message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServerMessageType {
    /// Generic success.
    Ok = 0,
    /// Error report.
    Error = 1,
    /// Capability list.
    ConnCapabilities = 2,
    /// Authentication challenge.
    SessAuthenticateContinue = 3,
    /// Authentication succeeded.
    SessAuthenticateOk = 4,
    /// Out-of-band notice.
    Notice = 11,
    /// Column metadata.
    ResultsetColumnMetaData = 12,
    /// Result row.
    ResultsetRow = 13,
    /// All result sets sent.
    ResultsetFetchDone = 14,
    /// Cursor suspended.
    ResultsetFetchSuspended = 15,
    /// Another result set follows.
    ResultsetFetchDoneMoreResultsets = 16,
    /// Statement finished.
    SqlStmtExecuteOk = 17,
    /// Output parameters follow.
    ResultsetFetchDoneMoreOutParams = 18,
}

impl ServerMessageType {
    /// Number of distinct server message types.
    pub const COUNT: usize = 13;

    /// Create a message type from its wire value.
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Self::Ok),
            1 => Ok(Self::Error),
            2 => Ok(Self::ConnCapabilities),
            3 => Ok(Self::SessAuthenticateContinue),
            4 => Ok(Self::SessAuthenticateOk),
            11 => Ok(Self::Notice),
            12 => Ok(Self::ResultsetColumnMetaData),
            13 => Ok(Self::ResultsetRow),
            14 => Ok(Self::ResultsetFetchDone),
            15 => Ok(Self::ResultsetFetchSuspended),
            16 => Ok(Self::ResultsetFetchDoneMoreResultsets),
            17 => Ok(Self::SqlStmtExecuteOk),
            18 => Ok(Self::ResultsetFetchDoneMoreOutParams),
            _ => Err(ProtocolError::UnknownMessageType(value)),
        }
    }

    /// Dense index in `0..COUNT`, for handler tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
            Self::ConnCapabilities => 2,
            Self::SessAuthenticateContinue => 3,
            Self::SessAuthenticateOk => 4,
            Self::Notice => 5,
            Self::ResultsetColumnMetaData => 6,
            Self::ResultsetRow => 7,
            Self::ResultsetFetchDone => 8,
            Self::ResultsetFetchSuspended => 9,
            Self::ResultsetFetchDoneMoreResultsets => 10,
            Self::SqlStmtExecuteOk => 11,
            Self::ResultsetFetchDoneMoreOutParams => 12,
        }
    }

    /// Protocol name of the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::ConnCapabilities => "CONN_CAPABILITIES",
            Self::SessAuthenticateContinue => "SESS_AUTHENTICATE_CONTINUE",
            Self::SessAuthenticateOk => "SESS_AUTHENTICATE_OK",
            Self::Notice => "NOTICE",
            Self::ResultsetColumnMetaData => "RESULTSET_COLUMN_META_DATA",
            Self::ResultsetRow => "RESULTSET_ROW",
            Self::ResultsetFetchDone => "RESULTSET_FETCH_DONE",
            Self::ResultsetFetchSuspended => "RESULTSET_FETCH_SUSPENDED",
            Self::ResultsetFetchDoneMoreResultsets => "RESULTSET_FETCH_DONE_MORE_RESULTSETS",
            Self::SqlStmtExecuteOk => "SQL_STMT_EXECUTE_OK",
            Self::ResultsetFetchDoneMoreOutParams => "RESULTSET_FETCH_DONE_MORE_OUT_PARAMS",
        }
    }
}

/// Client-to-server message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ClientMessageType {
    /// Ask for capabilities.
    ConCapabilitiesGet = 1,
    /// Change capabilities.
    ConCapabilitiesSet = 2,
    /// Close the connection.
    ConClose = 3,
    /// Start authentication.
    SessAuthenticateStart = 4,
    /// Answer an authentication challenge.
    SessAuthenticateContinue = 5,
    /// Reset the session.
    SessReset = 6,
    /// Close the session.
    SessClose = 7,
    /// Execute a statement.
    SqlStmtExecute = 12,
    /// Find documents or rows.
    CrudFind = 17,
    /// Insert documents or rows.
    CrudInsert = 18,
    /// Update documents or rows.
    CrudUpdate = 19,
    /// Delete documents or rows.
    CrudDelete = 20,
}

/// A message the client sends, tied to its wire type.
pub trait ClientMessage: Encode {
    /// Type byte written in the frame header.
    const MESSAGE_TYPE: ClientMessageType;
}

/// A decoded server message.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ServerMessage {
    /// `OK`.
    Ok(OkMessage),
    /// `ERROR`.
    Error(ErrorMessage),
    /// `CONN_CAPABILITIES`.
    Capabilities(Capabilities),
    /// `SESS_AUTHENTICATE_CONTINUE`.
    AuthenticateContinue(AuthenticateContinue),
    /// `SESS_AUTHENTICATE_OK`.
    AuthenticateOk(AuthenticateOk),
    /// `NOTICE`.
    Notice(Frame),
    /// `RESULTSET_COLUMN_META_DATA`.
    ColumnMetaData(ColumnMetaData),
    /// `RESULTSET_ROW`.
    Row(Row),
    /// `RESULTSET_FETCH_DONE`.
    FetchDone(FetchDone),
    /// `RESULTSET_FETCH_SUSPENDED`.
    FetchSuspended(FetchSuspended),
    /// `RESULTSET_FETCH_DONE_MORE_RESULTSETS`.
    FetchDoneMoreResultsets(FetchDoneMoreResultsets),
    /// `SQL_STMT_EXECUTE_OK`.
    StmtExecuteOk(StmtExecuteOk),
    /// `RESULTSET_FETCH_DONE_MORE_OUT_PARAMS`.
    FetchDoneMoreOutParams(FetchDoneMoreOutParams),
}

impl ServerMessage {
    /// Decode a payload of the given type.
    pub fn decode(message_type: ServerMessageType, payload: Bytes) -> Result<Self, ProtocolError> {
        use ServerMessageType as T;
        Ok(match message_type {
            T::Ok => Self::Ok(OkMessage::decode(payload)?),
            T::Error => Self::Error(ErrorMessage::decode(payload)?),
            T::ConnCapabilities => Self::Capabilities(Capabilities::decode(payload)?),
            T::SessAuthenticateContinue => {
                Self::AuthenticateContinue(AuthenticateContinue::decode(payload)?)
            }
            T::SessAuthenticateOk => Self::AuthenticateOk(AuthenticateOk::decode(payload)?),
            T::Notice => Self::Notice(Frame::decode(payload)?),
            T::ResultsetColumnMetaData => Self::ColumnMetaData(ColumnMetaData::decode(payload)?),
            T::ResultsetRow => Self::Row(Row::decode(payload)?),
            T::ResultsetFetchDone => Self::FetchDone(FetchDone::decode(payload)?),
            T::ResultsetFetchSuspended => Self::FetchSuspended(FetchSuspended::decode(payload)?),
            T::ResultsetFetchDoneMoreResultsets => {
                Self::FetchDoneMoreResultsets(FetchDoneMoreResultsets::decode(payload)?)
            }
            T::SqlStmtExecuteOk => Self::StmtExecuteOk(StmtExecuteOk::decode(payload)?),
            T::ResultsetFetchDoneMoreOutParams => {
                Self::FetchDoneMoreOutParams(FetchDoneMoreOutParams::decode(payload)?)
            }
        })
    }

    /// Wire type of this message.
    #[must_use]
    pub fn message_type(&self) -> ServerMessageType {
        use ServerMessageType as T;
        match self {
            Self::Ok(_) => T::Ok,
            Self::Error(_) => T::Error,
            Self::Capabilities(_) => T::ConnCapabilities,
            Self::AuthenticateContinue(_) => T::SessAuthenticateContinue,
            Self::AuthenticateOk(_) => T::SessAuthenticateOk,
            Self::Notice(_) => T::Notice,
            Self::ColumnMetaData(_) => T::ResultsetColumnMetaData,
            Self::Row(_) => T::ResultsetRow,
            Self::FetchDone(_) => T::ResultsetFetchDone,
            Self::FetchSuspended(_) => T::ResultsetFetchSuspended,
            Self::FetchDoneMoreResultsets(_) => T::ResultsetFetchDoneMoreResultsets,
            Self::StmtExecuteOk(_) => T::SqlStmtExecuteOk,
            Self::FetchDoneMoreOutParams(_) => T::ResultsetFetchDoneMoreOutParams,
        }
    }
}

impl Encode for ServerMessage {
    fn encode(&self, dst: &mut BytesMut) {
        match self {
            Self::Ok(m) => m.encode(dst),
            Self::Error(m) => m.encode(dst),
            Self::Capabilities(m) => m.encode(dst),
            Self::AuthenticateContinue(m) => m.encode(dst),
            Self::AuthenticateOk(m) => m.encode(dst),
            Self::Notice(m) => m.encode(dst),
            Self::ColumnMetaData(m) => m.encode(dst),
            Self::Row(m) => m.encode(dst),
            Self::FetchDone(m) => m.encode(dst),
            Self::FetchSuspended(m) => m.encode(dst),
            Self::FetchDoneMoreResultsets(m) => m.encode(dst),
            Self::StmtExecuteOk(m) => m.encode(dst),
            Self::FetchDoneMoreOutParams(m) => m.encode(dst),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_server_type_gaps_are_unknown() {
        for value in 5..=10u8 {
            assert_eq!(
                ServerMessageType::from_u8(value),
                Err(ProtocolError::UnknownMessageType(value))
            );
        }
        assert!(ServerMessageType::from_u8(19).is_err());
    }

    #[test]
    fn test_index_is_dense() {
        let mut seen = [false; ServerMessageType::COUNT];
        for value in 0..=u8::MAX {
            if let Ok(t) = ServerMessageType::from_u8(value) {
                assert!(!seen[t.index()], "duplicate index for {}", t.name());
                seen[t.index()] = true;
                assert_eq!(t as u8, value);
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_decode_tags_message() {
        let err = ErrorMessage {
            code: Some(1045),
            msg: Some("denied".into()),
            ..ErrorMessage::default()
        };
        let msg = ServerMessage::decode(ServerMessageType::Error, err.encode_to_bytes()).unwrap();
        assert_eq!(msg.message_type(), ServerMessageType::Error);
        assert_eq!(msg, ServerMessage::Error(err));
    }

    #[test]
    fn test_empty_payload_markers() {
        let msg = ServerMessage::decode(ServerMessageType::ResultsetFetchDone, Bytes::new()).unwrap();
        assert!(matches!(msg, ServerMessage::FetchDone(_)));
        assert!(msg.encode_to_bytes().is_empty());
    }
}
