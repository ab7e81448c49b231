//! `Mysqlx.Session`: authentication and session lifecycle.

use bytes::{Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::message::{ClientMessage, ClientMessageType};
use crate::wire::{Decode, Encode, FieldReader, put_bytes};

/// First step of an authentication exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticateStart {
    /// Mechanism name (`PLAIN`, `MYSQL41`, ...).
    pub mech_name: String,
    /// Mechanism-specific initial data.
    pub auth_data: Option<Bytes>,
    /// Initial response for mechanisms that send one up front.
    pub initial_response: Option<Bytes>,
}

impl AuthenticateStart {
    /// Create a start message carrying `auth_data`.
    pub fn new(mech_name: impl Into<String>, auth_data: impl Into<Bytes>) -> Self {
        Self {
            mech_name: mech_name.into(),
            auth_data: Some(auth_data.into()),
            initial_response: None,
        }
    }
}

impl Encode for AuthenticateStart {
    fn encode(&self, dst: &mut BytesMut) {
        put_bytes(dst, 1, self.mech_name.as_bytes());
        if let Some(data) = &self.auth_data {
            put_bytes(dst, 2, data);
        }
        if let Some(response) = &self.initial_response {
            put_bytes(dst, 3, response);
        }
    }
}

impl Decode for AuthenticateStart {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut mech_name = None;
        let mut start = Self::default();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => mech_name = Some(field.as_string()?),
                2 => start.auth_data = Some(field.as_bytes()?),
                3 => start.initial_response = Some(field.as_bytes()?),
                _ => {}
            }
        }
        start.mech_name = mech_name.ok_or(ProtocolError::MissingField {
            message: "AuthenticateStart",
            field: "mech_name",
        })?;
        Ok(start)
    }
}

impl ClientMessage for AuthenticateStart {
    const MESSAGE_TYPE: ClientMessageType = ClientMessageType::SessAuthenticateStart;
}

/// Challenge/response step. The server sends it as a challenge, the client
/// answers with the same shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticateContinue {
    /// Mechanism-specific data.
    pub auth_data: Bytes,
}

impl Encode for AuthenticateContinue {
    fn encode(&self, dst: &mut BytesMut) {
        put_bytes(dst, 1, &self.auth_data);
    }
}

impl Decode for AuthenticateContinue {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut auth_data = None;
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            if field.number == 1 {
                auth_data = Some(field.as_bytes()?);
            }
        }
        Ok(Self {
            auth_data: auth_data.ok_or(ProtocolError::MissingField {
                message: "AuthenticateContinue",
                field: "auth_data",
            })?,
        })
    }
}

impl ClientMessage for AuthenticateContinue {
    const MESSAGE_TYPE: ClientMessageType = ClientMessageType::SessAuthenticateContinue;
}

/// Authentication succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticateOk {
    /// Optional final mechanism data.
    pub auth_data: Option<Bytes>,
}

impl Encode for AuthenticateOk {
    fn encode(&self, dst: &mut BytesMut) {
        if let Some(data) = &self.auth_data {
            put_bytes(dst, 1, data);
        }
    }
}

impl Decode for AuthenticateOk {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut ok = Self::default();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            if field.number == 1 {
                ok.auth_data = Some(field.as_bytes()?);
            }
        }
        Ok(ok)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_start_fields() {
        let start = AuthenticateStart::new("MYSQL41", Bytes::from_static(b"db\0root\0"));
        let decoded = AuthenticateStart::decode(start.encode_to_bytes()).unwrap();
        assert_eq!(decoded.mech_name, "MYSQL41");
        assert_eq!(decoded.auth_data.as_deref(), Some(&b"db\0root\0"[..]));
        assert!(decoded.initial_response.is_none());
    }

    #[test]
    fn test_authenticate_continue_requires_data() {
        assert!(matches!(
            AuthenticateContinue::decode(Bytes::new()),
            Err(ProtocolError::MissingField { field: "auth_data", .. })
        ));
    }
}
