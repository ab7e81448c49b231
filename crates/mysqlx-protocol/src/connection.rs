//! `Mysqlx.Connection`: capability negotiation and connection close.

use bytes::{Bytes, BytesMut};

use crate::datatypes::Any;
use crate::error::ProtocolError;
use crate::message::{ClientMessage, ClientMessageType};
use crate::wire::{Decode, Encode, FieldReader, put_bytes, put_message};

/// A named capability and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Capability {
    /// Capability name (for example `tls` or `authentication.mechanisms`).
    pub name: String,
    /// Capability value.
    pub value: Any,
}

impl Capability {
    /// Create a capability.
    pub fn new(name: impl Into<String>, value: impl Into<Any>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Encode for Capability {
    fn encode(&self, dst: &mut BytesMut) {
        put_bytes(dst, 1, self.name.as_bytes());
        put_message(dst, 2, &self.value);
    }
}

impl Decode for Capability {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut name = None;
        let mut value = None;
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => name = Some(field.as_string()?),
                2 => value = Some(field.as_message::<Any>()?),
                _ => {}
            }
        }
        Ok(Self {
            name: name.ok_or(ProtocolError::MissingField {
                message: "Capability",
                field: "name",
            })?,
            value: value.ok_or(ProtocolError::MissingField {
                message: "Capability",
                field: "value",
            })?,
        })
    }
}

/// The server's capability list (`CONN_CAPABILITIES`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    /// Capabilities in wire order.
    pub capabilities: Vec<Capability>,
}

impl Encode for Capabilities {
    fn encode(&self, dst: &mut BytesMut) {
        for capability in &self.capabilities {
            put_message(dst, 1, capability);
        }
    }
}

impl Decode for Capabilities {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut capabilities = Vec::new();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            if field.number == 1 {
                capabilities.push(field.as_message::<Capability>()?);
            }
        }
        Ok(Self { capabilities })
    }
}

empty_message! {
    /// Request for the server's capability list.
    CapabilitiesGet
}

impl ClientMessage for CapabilitiesGet {
    const MESSAGE_TYPE: ClientMessageType = ClientMessageType::ConCapabilitiesGet;
}

/// Request to change capabilities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilitiesSet {
    /// Capabilities to set.
    pub capabilities: Capabilities,
}

impl CapabilitiesSet {
    /// Build a request from `(name, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Any>,
    {
        Self {
            capabilities: Capabilities {
                capabilities: pairs
                    .into_iter()
                    .map(|(name, value)| Capability::new(name, value))
                    .collect(),
            },
        }
    }
}

impl Encode for CapabilitiesSet {
    fn encode(&self, dst: &mut BytesMut) {
        put_message(dst, 1, &self.capabilities);
    }
}

impl Decode for CapabilitiesSet {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut capabilities = None;
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            if field.number == 1 {
                capabilities = Some(field.as_message::<Capabilities>()?);
            }
        }
        Ok(Self {
            capabilities: capabilities.ok_or(ProtocolError::MissingField {
                message: "CapabilitiesSet",
                field: "capabilities",
            })?,
        })
    }
}

impl ClientMessage for CapabilitiesSet {
    const MESSAGE_TYPE: ClientMessageType = ClientMessageType::ConCapabilitiesSet;
}

empty_message! {
    /// Close the connection without closing the session first.
    ConnectionClose
}

impl ClientMessage for ConnectionClose {
    const MESSAGE_TYPE: ClientMessageType = ClientMessageType::ConClose;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::datatypes::Scalar;

    #[test]
    fn test_capabilities_set_from_pairs() {
        let request = CapabilitiesSet::from_pairs([
            ("tls", Any::Scalar(Scalar::Bool(true))),
            ("client.pwd_expire_ok", Any::Scalar(Scalar::Bool(false))),
        ]);
        let decoded = CapabilitiesSet::decode(request.encode_to_bytes()).unwrap();
        assert_eq!(decoded.capabilities.capabilities.len(), 2);
        assert_eq!(decoded.capabilities.capabilities[0].name, "tls");
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_empty_messages_encode_nothing() {
        assert!(CapabilitiesGet.encode_to_bytes().is_empty());
        assert!(ConnectionClose.encode_to_bytes().is_empty());
        assert_eq!(
            CapabilitiesGet::MESSAGE_TYPE,
            ClientMessageType::ConCapabilitiesGet
        );
    }
}
