//! Server frame fixtures.
//!
//! Each function returns one complete server [`Message`] ready to be
//! scripted into a [`MockTransport`](crate::mock_transport::MockTransport).
//! The `field_*` helpers produce raw row field payloads in the encoding the
//! server uses for each column type.

use bytes::{BufMut, Bytes, BytesMut};
use mysqlx_codec::Message;
use mysqlx_protocol::notice::{Frame, SessionVariableChanged, Warning};
use mysqlx_protocol::wire::{write_varint, zigzag_encode};
use mysqlx_protocol::{
    Any, AuthenticateContinue, AuthenticateOk, Capabilities, Capability, ColumnMetaData, Encode,
    ErrorMessage, FieldType, NoticeType, OkMessage, Row, Scalar, ServerMessageType,
    SessionStateChanged, StateParameter,
};

fn message(message_type: ServerMessageType, payload: &impl Encode) -> Message {
    Message::new(message_type as u8, payload.encode_to_bytes())
}

fn empty(message_type: ServerMessageType) -> Message {
    Message::new(message_type as u8, Bytes::new())
}

/// A frame with an arbitrary type byte and payload.
pub fn raw(message_type: u8, payload: impl Into<Bytes>) -> Message {
    Message::new(message_type, payload)
}

/// `OK` without text.
#[must_use]
pub fn ok() -> Message {
    message(ServerMessageType::Ok, &OkMessage::default())
}

/// `OK` with informational text.
pub fn ok_with(msg: impl Into<String>) -> Message {
    message(
        ServerMessageType::Ok,
        &OkMessage {
            msg: Some(msg.into()),
        },
    )
}

/// `ERROR` with every field present.
pub fn error(code: u32, sql_state: &str, msg: &str) -> Message {
    message(
        ServerMessageType::Error,
        &ErrorMessage {
            severity: Some(0),
            code: Some(code),
            sql_state: Some(sql_state.to_string()),
            msg: Some(msg.to_string()),
        },
    )
}

/// `ERROR` with fatal severity.
pub fn fatal_error(code: u32, sql_state: &str, msg: &str) -> Message {
    message(
        ServerMessageType::Error,
        &ErrorMessage {
            severity: Some(1),
            code: Some(code),
            sql_state: Some(sql_state.to_string()),
            msg: Some(msg.to_string()),
        },
    )
}

/// `ERROR` with no fields at all.
#[must_use]
pub fn error_empty() -> Message {
    empty(ServerMessageType::Error)
}

/// `CONN_CAPABILITIES` from name/value pairs.
pub fn capabilities<I, K>(pairs: I) -> Message
where
    I: IntoIterator<Item = (K, Any)>,
    K: Into<String>,
{
    let capabilities = pairs
        .into_iter()
        .map(|(name, value)| Capability::new(name, value))
        .collect();
    message(
        ServerMessageType::ConnCapabilities,
        &Capabilities { capabilities },
    )
}

/// `SESS_AUTHENTICATE_CONTINUE` carrying a challenge.
pub fn auth_continue(challenge: impl Into<Bytes>) -> Message {
    message(
        ServerMessageType::SessAuthenticateContinue,
        &AuthenticateContinue {
            auth_data: challenge.into(),
        },
    )
}

/// `SESS_AUTHENTICATE_OK`.
#[must_use]
pub fn auth_ok() -> Message {
    message(ServerMessageType::SessAuthenticateOk, &AuthenticateOk::default())
}

/// A `NOTICE` frame built from its raw parts.
#[must_use]
pub fn notice(frame: &Frame) -> Message {
    message(ServerMessageType::Notice, frame)
}

/// Local warning notice.
pub fn notice_warning(level: u32, code: u32, msg: &str) -> Message {
    notice(&Frame::local(
        NoticeType::Warning,
        &Warning {
            level: Some(level),
            code: Some(code),
            msg: Some(msg.to_string()),
        },
    ))
}

/// Local warning notice with every field left out.
#[must_use]
pub fn notice_warning_empty() -> Message {
    notice(&Frame::local(NoticeType::Warning, &Warning::default()))
}

/// Global-scope warning, which local exchanges ignore.
pub fn notice_warning_global(code: u32, msg: &str) -> Message {
    let mut frame = Frame::local(
        NoticeType::Warning,
        &Warning {
            level: Some(2),
            code: Some(code),
            msg: Some(msg.to_string()),
        },
    );
    frame.scope = Some(1);
    notice(&frame)
}

/// Local session variable change.
pub fn notice_variable_changed(param: &str, value: Scalar) -> Message {
    notice(&Frame::local(
        NoticeType::SessionVariableChanged,
        &SessionVariableChanged {
            param: Some(param.to_string()),
            value: Some(value),
        },
    ))
}

/// Local session state change.
#[must_use]
pub fn notice_state_changed(param: StateParameter, value: Scalar) -> Message {
    notice(&Frame::local(
        NoticeType::SessionStateChanged,
        &SessionStateChanged::new(param, value),
    ))
}

/// `ROWS_AFFECTED` state change.
#[must_use]
pub fn rows_affected(count: u64) -> Message {
    notice_state_changed(StateParameter::RowsAffected, Scalar::Uint(count))
}

/// `GENERATED_INSERT_ID` state change.
#[must_use]
pub fn last_insert_id(id: u64) -> Message {
    notice_state_changed(StateParameter::GeneratedInsertId, Scalar::Uint(id))
}

/// Compact column metadata: type and name only.
pub fn column(field_type: FieldType, name: &str) -> Message {
    column_meta(ColumnMetaData::new(field_type, Bytes::copy_from_slice(name.as_bytes())))
}

/// Column metadata with a fractional digits hint.
pub fn column_with_digits(field_type: FieldType, name: &str, fractional_digits: u32) -> Message {
    let mut meta = ColumnMetaData::new(field_type, Bytes::copy_from_slice(name.as_bytes()));
    meta.fractional_digits = Some(fractional_digits);
    column_meta(meta)
}

/// Column metadata as given.
#[must_use]
pub fn column_meta(meta: ColumnMetaData) -> Message {
    message(ServerMessageType::ResultsetColumnMetaData, &meta)
}

/// A row from already encoded field payloads.
pub fn row<I, B>(fields: I) -> Message
where
    I: IntoIterator<Item = B>,
    B: Into<Bytes>,
{
    message(
        ServerMessageType::ResultsetRow,
        &Row {
            fields: fields.into_iter().map(Into::into).collect(),
        },
    )
}

/// `RESULTSET_FETCH_DONE`.
#[must_use]
pub fn fetch_done() -> Message {
    empty(ServerMessageType::ResultsetFetchDone)
}

/// `RESULTSET_FETCH_SUSPENDED`.
#[must_use]
pub fn fetch_suspended() -> Message {
    empty(ServerMessageType::ResultsetFetchSuspended)
}

/// `RESULTSET_FETCH_DONE_MORE_RESULTSETS`.
#[must_use]
pub fn fetch_done_more_resultsets() -> Message {
    empty(ServerMessageType::ResultsetFetchDoneMoreResultsets)
}

/// `RESULTSET_FETCH_DONE_MORE_OUT_PARAMS`.
#[must_use]
pub fn fetch_done_more_out_params() -> Message {
    empty(ServerMessageType::ResultsetFetchDoneMoreOutParams)
}

/// `SQL_STMT_EXECUTE_OK`.
#[must_use]
pub fn stmt_execute_ok() -> Message {
    empty(ServerMessageType::SqlStmtExecuteOk)
}

/// A complete single-column result: metadata, one row per value, fetch
/// done and execute OK.
pub fn single_column_result<I, B>(field_type: FieldType, name: &str, values: I) -> Vec<Message>
where
    I: IntoIterator<Item = B>,
    B: Into<Bytes>,
{
    let mut frames = vec![column(field_type, name)];
    frames.extend(values.into_iter().map(|v| row([v])));
    frames.push(fetch_done());
    frames.push(stmt_execute_ok());
    frames
}

/// `SINT` field payload.
#[must_use]
pub fn field_sint(value: i64) -> Bytes {
    let mut buf = BytesMut::new();
    write_varint(&mut buf, zigzag_encode(value));
    buf.freeze()
}

/// `UINT` field payload.
#[must_use]
pub fn field_uint(value: u64) -> Bytes {
    let mut buf = BytesMut::new();
    write_varint(&mut buf, value);
    buf.freeze()
}

/// `DOUBLE` field payload.
#[must_use]
pub fn field_double(value: f64) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_f64_le(value);
    buf.freeze()
}

/// `BYTES` field payload: the text plus the trailing zero byte.
#[must_use]
pub fn field_string(value: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(value.len() + 1);
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
    buf.freeze()
}

/// SQL `NULL` field payload.
#[must_use]
pub fn field_null() -> Bytes {
    Bytes::new()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mysqlx_protocol::{Decode, ServerMessage};

    fn decode(message: &Message) -> ServerMessage {
        let message_type = ServerMessageType::from_u8(message.message_type).unwrap();
        ServerMessage::decode(message_type, message.payload.clone()).unwrap()
    }

    #[test]
    fn test_error_fixture_decodes() {
        match decode(&error(1146, "42S02", "Table 'x' doesn't exist")) {
            ServerMessage::Error(e) => {
                assert_eq!(e.code, Some(1146));
                assert_eq!(e.sql_state.as_deref(), Some("42S02"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_notice_fixture_is_local() {
        match decode(&rows_affected(3)) {
            ServerMessage::Notice(frame) => {
                assert_eq!(frame.scope, Some(2));
                assert_eq!(frame.notice_type, Some(3));
                let changed = SessionStateChanged::decode(frame.payload.unwrap()).unwrap();
                assert_eq!(changed.parameter(), Some(StateParameter::RowsAffected));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_field_payloads() {
        assert_eq!(&field_sint(-1)[..], &[0x01]);
        assert_eq!(&field_uint(300)[..], &[0xAC, 0x02]);
        assert_eq!(&field_string("ab")[..], b"ab\0");
        assert!(field_null().is_empty());
        assert_eq!(single_column_result(FieldType::Sint, "n", [field_sint(1)]).len(), 4);
    }
}
