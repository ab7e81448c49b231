//! `Mysqlx.Notice`: out-of-band notices and their payloads.
//!
//! A notice frame wraps one of three payload messages. Decoding is lenient:
//! enumeration fields are kept as raw numbers so an unknown value can be
//! logged and skipped by the consumer instead of failing the whole frame.

use bytes::{Bytes, BytesMut};

use crate::datatypes::Scalar;
use crate::error::ProtocolError;
use crate::wire::{Decode, Encode, FieldReader, put_bytes, put_message, put_uint};

/// Notice scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NoticeScope {
    /// Applies to the whole session.
    Global = 1,
    /// Applies to the current message exchange.
    Local = 2,
}

impl NoticeScope {
    /// Create a scope from its wire value.
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Global),
            2 => Some(Self::Local),
            _ => None,
        }
    }
}

/// Payload kind carried in a notice frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NoticeType {
    /// [`Warning`].
    Warning = 1,
    /// [`SessionVariableChanged`].
    SessionVariableChanged = 2,
    /// [`SessionStateChanged`].
    SessionStateChanged = 3,
}

impl NoticeType {
    /// Create a notice type from its wire value.
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Warning),
            2 => Some(Self::SessionVariableChanged),
            3 => Some(Self::SessionStateChanged),
            _ => None,
        }
    }
}

/// Notice envelope (`NOTICE`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Raw payload type.
    pub notice_type: Option<u32>,
    /// Raw scope.
    pub scope: Option<u32>,
    /// Encoded payload message.
    pub payload: Option<Bytes>,
}

impl Frame {
    /// Wrap an encoded payload in a local-scope frame.
    pub fn local(notice_type: NoticeType, payload: &impl Encode) -> Self {
        Self {
            notice_type: Some(notice_type as u32),
            scope: Some(NoticeScope::Local as u32),
            payload: Some(payload.encode_to_bytes()),
        }
    }

    /// Scope, when present and known.
    #[must_use]
    pub fn scope(&self) -> Option<NoticeScope> {
        self.scope.and_then(NoticeScope::from_u32)
    }
}

impl Encode for Frame {
    fn encode(&self, dst: &mut BytesMut) {
        if let Some(notice_type) = self.notice_type {
            put_uint(dst, 1, u64::from(notice_type));
        }
        if let Some(scope) = self.scope {
            put_uint(dst, 2, u64::from(scope));
        }
        if let Some(payload) = &self.payload {
            put_bytes(dst, 3, payload);
        }
    }
}

impl Decode for Frame {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut frame = Self::default();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => frame.notice_type = Some(field.as_u32()?),
                2 => frame.scope = Some(field.as_u32()?),
                3 => frame.payload = Some(field.as_bytes()?),
                _ => {}
            }
        }
        Ok(frame)
    }
}

/// Warning level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum WarningLevel {
    /// Note.
    Note = 1,
    /// Warning.
    #[default]
    Warning = 2,
    /// Error.
    Error = 3,
}

impl WarningLevel {
    /// Create a level from its wire value.
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Note),
            2 => Some(Self::Warning),
            3 => Some(Self::Error),
            _ => None,
        }
    }
}

/// Warning notice payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warning {
    /// Raw level.
    pub level: Option<u32>,
    /// Warning code.
    pub code: Option<u32>,
    /// Warning text.
    pub msg: Option<String>,
}

impl Encode for Warning {
    fn encode(&self, dst: &mut BytesMut) {
        if let Some(level) = self.level {
            put_uint(dst, 1, u64::from(level));
        }
        if let Some(code) = self.code {
            put_uint(dst, 2, u64::from(code));
        }
        if let Some(msg) = &self.msg {
            put_bytes(dst, 3, msg.as_bytes());
        }
    }
}

impl Decode for Warning {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut warning = Self::default();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => warning.level = Some(field.as_u32()?),
                2 => warning.code = Some(field.as_u32()?),
                3 => warning.msg = Some(field.as_string()?),
                _ => {}
            }
        }
        Ok(warning)
    }
}

/// A session variable changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionVariableChanged {
    /// Variable name.
    pub param: Option<String>,
    /// New value.
    pub value: Option<Scalar>,
}

impl Encode for SessionVariableChanged {
    fn encode(&self, dst: &mut BytesMut) {
        if let Some(param) = &self.param {
            put_bytes(dst, 1, param.as_bytes());
        }
        if let Some(value) = &self.value {
            put_message(dst, 2, value);
        }
    }
}

impl Decode for SessionVariableChanged {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut changed = Self::default();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => changed.param = Some(field.as_string()?),
                2 => changed.value = Some(field.as_message::<Scalar>()?),
                _ => {}
            }
        }
        Ok(changed)
    }
}

/// Parameter reported by a [`SessionStateChanged`] notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateParameter {
    /// Default schema changed.
    CurrentSchema = 1,
    /// Account password expired.
    AccountExpired = 2,
    /// Last `AUTO_INCREMENT` value.
    GeneratedInsertId = 3,
    /// Rows affected by the statement.
    RowsAffected = 4,
    /// Rows found by the statement.
    RowsFound = 5,
    /// Rows matched by the statement.
    RowsMatched = 6,
    /// Transaction committed.
    TrxCommitted = 7,
    /// Transaction rolled back.
    TrxRolledback = 9,
    /// Informational message.
    ProducedMessage = 10,
    /// Server assigned a client id.
    ClientIdAssigned = 11,
}

impl StateParameter {
    /// Create a parameter from its wire value.
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::CurrentSchema),
            2 => Some(Self::AccountExpired),
            3 => Some(Self::GeneratedInsertId),
            4 => Some(Self::RowsAffected),
            5 => Some(Self::RowsFound),
            6 => Some(Self::RowsMatched),
            7 => Some(Self::TrxCommitted),
            9 => Some(Self::TrxRolledback),
            10 => Some(Self::ProducedMessage),
            11 => Some(Self::ClientIdAssigned),
            _ => None,
        }
    }
}

/// Session state changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStateChanged {
    /// Raw parameter.
    pub param: Option<u32>,
    /// Reported value.
    pub value: Option<Scalar>,
}

impl SessionStateChanged {
    /// Build a notice for `param` carrying `value`.
    #[must_use]
    pub fn new(param: StateParameter, value: Scalar) -> Self {
        Self {
            param: Some(param as u32),
            value: Some(value),
        }
    }

    /// Parameter, when present and known.
    #[must_use]
    pub fn parameter(&self) -> Option<StateParameter> {
        self.param.and_then(StateParameter::from_u32)
    }
}

impl Encode for SessionStateChanged {
    fn encode(&self, dst: &mut BytesMut) {
        if let Some(param) = self.param {
            put_uint(dst, 1, u64::from(param));
        }
        if let Some(value) = &self.value {
            put_message(dst, 2, value);
        }
    }
}

impl Decode for SessionStateChanged {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut changed = Self::default();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => changed.param = Some(field.as_u32()?),
                2 => changed.value = Some(field.as_message::<Scalar>()?),
                _ => {}
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_local_frame_wraps_payload() {
        let warning = Warning {
            level: Some(WarningLevel::Note as u32),
            code: Some(1287),
            msg: Some("deprecated".into()),
        };
        let frame = Frame::local(NoticeType::Warning, &warning);
        let decoded = Frame::decode(frame.encode_to_bytes()).unwrap();
        assert_eq!(decoded.scope(), Some(NoticeScope::Local));
        assert_eq!(decoded.notice_type, Some(1));
        let inner = Warning::decode(decoded.payload.unwrap()).unwrap();
        assert_eq!(inner, warning);
    }

    #[test]
    fn test_state_parameter_gap() {
        assert_eq!(StateParameter::from_u32(8), None);
        assert_eq!(
            StateParameter::from_u32(9),
            Some(StateParameter::TrxRolledback)
        );
    }

    #[test]
    fn test_unknown_scope_is_preserved_raw() {
        let frame = Frame {
            notice_type: Some(1),
            scope: Some(7),
            payload: None,
        };
        let decoded = Frame::decode(frame.encode_to_bytes()).unwrap();
        assert_eq!(decoded.scope, Some(7));
        assert_eq!(decoded.scope(), None);
    }
}
