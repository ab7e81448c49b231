//! `Mysqlx.Ok` and `Mysqlx.Error`.

use bytes::{Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::wire::{Decode, Encode, FieldReader, put_bytes, put_uint};

/// Generic success acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OkMessage {
    /// Optional informational text.
    pub msg: Option<String>,
}

impl Encode for OkMessage {
    fn encode(&self, dst: &mut BytesMut) {
        if let Some(msg) = &self.msg {
            put_bytes(dst, 1, msg.as_bytes());
        }
    }
}

impl Decode for OkMessage {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut ok = Self::default();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            if field.number == 1 {
                ok.msg = Some(field.as_string()?);
            }
        }
        Ok(ok)
    }
}

/// Severity attached to a server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Severity {
    /// The statement failed; the session is still usable.
    #[default]
    Error = 0,
    /// The server is about to close the connection.
    Fatal = 1,
}

impl Severity {
    /// Create a severity from its wire value.
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Error),
            1 => Some(Self::Fatal),
            _ => None,
        }
    }
}

/// Server-reported error.
///
/// Every field is decoded as optional; consumers substitute the documented
/// defaults for whatever the server left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMessage {
    /// Raw severity.
    pub severity: Option<u32>,
    /// MySQL error code.
    pub code: Option<u32>,
    /// SQLSTATE.
    pub sql_state: Option<String>,
    /// Human-readable message.
    pub msg: Option<String>,
}

impl Encode for ErrorMessage {
    fn encode(&self, dst: &mut BytesMut) {
        if let Some(severity) = self.severity {
            put_uint(dst, 1, u64::from(severity));
        }
        if let Some(code) = self.code {
            put_uint(dst, 2, u64::from(code));
        }
        if let Some(msg) = &self.msg {
            put_bytes(dst, 3, msg.as_bytes());
        }
        if let Some(sql_state) = &self.sql_state {
            put_bytes(dst, 4, sql_state.as_bytes());
        }
    }
}

impl Decode for ErrorMessage {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut error = Self::default();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => error.severity = Some(field.as_u32()?),
                2 => error.code = Some(field.as_u32()?),
                3 => error.msg = Some(field.as_string()?),
                4 => error.sql_state = Some(field.as_string()?),
                _ => {}
            }
        }
        Ok(error)
    }
}
