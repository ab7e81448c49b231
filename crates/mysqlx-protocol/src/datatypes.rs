//! `Mysqlx.Datatypes`: scalars and the `Any` container.

use bytes::{Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::wire::{
    Decode, Encode, FieldReader, put_bool, put_bytes, put_f32, put_f64, put_message, put_sint,
    put_uint,
};

/// `Scalar.Type` discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScalarType {
    /// Signed integer.
    Sint = 1,
    /// Unsigned integer.
    Uint = 2,
    /// Null.
    Null = 3,
    /// Opaque octets with an optional content type.
    Octets = 4,
    /// Double.
    Double = 5,
    /// Float.
    Float = 6,
    /// Boolean.
    Bool = 7,
    /// Character string with an optional collation.
    String = 8,
}

impl ScalarType {
    /// Create a scalar type from its wire value.
    pub fn from_u64(value: u64) -> Result<Self, ProtocolError> {
        match value {
            1 => Ok(Self::Sint),
            2 => Ok(Self::Uint),
            3 => Ok(Self::Null),
            4 => Ok(Self::Octets),
            5 => Ok(Self::Double),
            6 => Ok(Self::Float),
            7 => Ok(Self::Bool),
            8 => Ok(Self::String),
            _ => Err(ProtocolError::InvalidEnumValue {
                kind: "Scalar.Type",
                value,
            }),
        }
    }
}

/// A typed scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// `V_SINT`.
    Sint(i64),
    /// `V_UINT`.
    Uint(u64),
    /// `V_NULL`.
    Null,
    /// `V_OCTETS`.
    Octets {
        /// Raw bytes.
        value: Bytes,
        /// Content type hint (JSON, XML, geometry ...).
        content_type: Option<u32>,
    },
    /// `V_DOUBLE`.
    Double(f64),
    /// `V_FLOAT`.
    Float(f32),
    /// `V_BOOL`.
    Bool(bool),
    /// `V_STRING`.
    String {
        /// Encoded string bytes.
        value: Bytes,
        /// Collation id.
        collation: Option<u64>,
    },
}

impl Scalar {
    /// A `V_STRING` scalar without collation.
    pub fn string(value: impl Into<String>) -> Self {
        Self::String {
            value: Bytes::from(value.into()),
            collation: None,
        }
    }

    /// A `V_OCTETS` scalar without content type.
    pub fn octets(value: impl Into<Bytes>) -> Self {
        Self::Octets {
            value: value.into(),
            content_type: None,
        }
    }

    /// Wire discriminant of this scalar.
    #[must_use]
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Self::Sint(_) => ScalarType::Sint,
            Self::Uint(_) => ScalarType::Uint,
            Self::Null => ScalarType::Null,
            Self::Octets { .. } => ScalarType::Octets,
            Self::Double(_) => ScalarType::Double,
            Self::Float(_) => ScalarType::Float,
            Self::Bool(_) => ScalarType::Bool,
            Self::String { .. } => ScalarType::String,
        }
    }

    /// Coerce to an unsigned integer the way execution-state notices are
    /// read: integers as-is, booleans as 0/1, floats truncated, text parsed
    /// as decimal digits, anything unparsable as 0.
    #[must_use]
    pub fn to_uint(&self) -> u64 {
        match self {
            Self::Sint(v) => *v as u64,
            Self::Uint(v) => *v,
            Self::Null => 0,
            Self::Double(v) => *v as u64,
            Self::Float(v) => *v as u64,
            Self::Bool(v) => u64::from(*v),
            Self::Octets { value, .. } | Self::String { value, .. } => std::str::from_utf8(value)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0),
        }
    }

    /// Borrow string or octet contents as UTF-8 text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Octets { value, .. } | Self::String { value, .. } => {
                std::str::from_utf8(value).ok()
            }
            _ => None,
        }
    }
}

impl Encode for Scalar {
    fn encode(&self, dst: &mut BytesMut) {
        put_uint(dst, 1, self.scalar_type() as u64);
        match self {
            Self::Sint(v) => put_sint(dst, 2, *v),
            Self::Uint(v) => put_uint(dst, 3, *v),
            Self::Null => {}
            Self::Octets {
                value,
                content_type,
            } => put_message(
                dst,
                5,
                &Octets {
                    value: value.clone(),
                    content_type: *content_type,
                },
            ),
            Self::Double(v) => put_f64(dst, 6, *v),
            Self::Float(v) => put_f32(dst, 7, *v),
            Self::Bool(v) => put_bool(dst, 8, *v),
            Self::String { value, collation } => put_message(
                dst,
                9,
                &XString {
                    value: value.clone(),
                    collation: *collation,
                },
            ),
        }
    }
}

impl Decode for Scalar {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        const MESSAGE: &str = "Scalar";
        let mut scalar_type = None;
        let mut sint = None;
        let mut uint = None;
        let mut octets = None;
        let mut double = None;
        let mut float = None;
        let mut boolean = None;
        let mut string = None;

        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => scalar_type = Some(ScalarType::from_u64(field.as_u64()?)?),
                2 => sint = Some(field.as_sint64()?),
                3 => uint = Some(field.as_u64()?),
                5 => octets = Some(field.as_message::<Octets>()?),
                6 => double = Some(field.as_f64()?),
                7 => float = Some(field.as_f32()?),
                8 => boolean = Some(field.as_bool()?),
                9 => string = Some(field.as_message::<XString>()?),
                _ => {}
            }
        }

        let missing = |field| ProtocolError::MissingField {
            message: MESSAGE,
            field,
        };
        match scalar_type.ok_or(missing("type"))? {
            ScalarType::Sint => sint.map(Self::Sint).ok_or(missing("v_signed_int")),
            ScalarType::Uint => uint.map(Self::Uint).ok_or(missing("v_unsigned_int")),
            ScalarType::Null => Ok(Self::Null),
            ScalarType::Octets => octets
                .map(|o| Self::Octets {
                    value: o.value,
                    content_type: o.content_type,
                })
                .ok_or(missing("v_octets")),
            ScalarType::Double => double.map(Self::Double).ok_or(missing("v_double")),
            ScalarType::Float => float.map(Self::Float).ok_or(missing("v_float")),
            ScalarType::Bool => boolean.map(Self::Bool).ok_or(missing("v_bool")),
            ScalarType::String => string
                .map(|s| Self::String {
                    value: s.value,
                    collation: s.collation,
                })
                .ok_or(missing("v_string")),
        }
    }
}

/// `Scalar.Octets`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Octets {
    value: Bytes,
    content_type: Option<u32>,
}

impl Encode for Octets {
    fn encode(&self, dst: &mut BytesMut) {
        put_bytes(dst, 1, &self.value);
        if let Some(content_type) = self.content_type {
            put_uint(dst, 2, u64::from(content_type));
        }
    }
}

impl Decode for Octets {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut value = None;
        let mut content_type = None;
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => value = Some(field.as_bytes()?),
                2 => content_type = Some(field.as_u32()?),
                _ => {}
            }
        }
        Ok(Self {
            value: value.ok_or(ProtocolError::MissingField {
                message: "Scalar.Octets",
                field: "value",
            })?,
            content_type,
        })
    }
}

/// `Scalar.String`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct XString {
    value: Bytes,
    collation: Option<u64>,
}

impl Encode for XString {
    fn encode(&self, dst: &mut BytesMut) {
        put_bytes(dst, 1, &self.value);
        if let Some(collation) = self.collation {
            put_uint(dst, 2, collation);
        }
    }
}

impl Decode for XString {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut value = None;
        let mut collation = None;
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => value = Some(field.as_bytes()?),
                2 => collation = Some(field.as_u64()?),
                _ => {}
            }
        }
        Ok(Self {
            value: value.ok_or(ProtocolError::MissingField {
                message: "Scalar.String",
                field: "value",
            })?,
            collation,
        })
    }
}

/// One key/value pair of an `Object`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectField {
    /// Key.
    pub key: String,
    /// Value.
    pub value: Any,
}

/// `Mysqlx.Datatypes.Any`: a scalar, an object, or an array.
#[derive(Debug, Clone, PartialEq)]
pub enum Any {
    /// A single scalar.
    Scalar(Scalar),
    /// An ordered set of named values.
    Object(Vec<ObjectField>),
    /// An ordered list of values.
    Array(Vec<Any>),
}

impl Any {
    /// Borrow the scalar, if this is one.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Scalar> for Any {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

struct ObjectBody<'a>(&'a [ObjectField]);
struct ArrayBody<'a>(&'a [Any]);

impl Encode for ObjectBody<'_> {
    fn encode(&self, dst: &mut BytesMut) {
        for fld in self.0 {
            let mut body = BytesMut::new();
            put_bytes(&mut body, 1, fld.key.as_bytes());
            put_message(&mut body, 2, &fld.value);
            put_bytes(dst, 1, &body);
        }
    }
}

impl Encode for ArrayBody<'_> {
    fn encode(&self, dst: &mut BytesMut) {
        for value in self.0 {
            put_message(dst, 1, value);
        }
    }
}

impl Encode for Any {
    fn encode(&self, dst: &mut BytesMut) {
        match self {
            Self::Scalar(s) => {
                put_uint(dst, 1, 1);
                put_message(dst, 2, s);
            }
            Self::Object(fields) => {
                put_uint(dst, 1, 2);
                put_message(dst, 3, &ObjectBody(fields));
            }
            Self::Array(values) => {
                put_uint(dst, 1, 3);
                put_message(dst, 4, &ArrayBody(values));
            }
        }
    }
}

fn decode_object(src: Bytes) -> Result<Vec<ObjectField>, ProtocolError> {
    let mut out = Vec::new();
    let mut fields = FieldReader::new(src);
    while let Some(field) = fields.next_field()? {
        if field.number != 1 {
            continue;
        }
        let mut key = None;
        let mut value = None;
        let mut inner = FieldReader::new(field.as_bytes()?);
        while let Some(f) = inner.next_field()? {
            match f.number {
                1 => key = Some(f.as_string()?),
                2 => value = Some(f.as_message::<Any>()?),
                _ => {}
            }
        }
        out.push(ObjectField {
            key: key.ok_or(ProtocolError::MissingField {
                message: "Object.ObjectField",
                field: "key",
            })?,
            value: value.ok_or(ProtocolError::MissingField {
                message: "Object.ObjectField",
                field: "value",
            })?,
        });
    }
    Ok(out)
}

fn decode_array(src: Bytes) -> Result<Vec<Any>, ProtocolError> {
    let mut out = Vec::new();
    let mut fields = FieldReader::new(src);
    while let Some(field) = fields.next_field()? {
        if field.number == 1 {
            out.push(field.as_message::<Any>()?);
        }
    }
    Ok(out)
}

impl Decode for Any {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut any_type = None;
        let mut scalar = None;
        let mut object = None;
        let mut array = None;
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => any_type = Some(field.as_u64()?),
                2 => scalar = Some(field.as_message::<Scalar>()?),
                3 => object = Some(decode_object(field.as_bytes()?)?),
                4 => array = Some(decode_array(field.as_bytes()?)?),
                _ => {}
            }
        }
        let missing = |field| ProtocolError::MissingField {
            message: "Any",
            field,
        };
        match any_type {
            Some(1) => scalar.map(Self::Scalar).ok_or(missing("scalar")),
            Some(2) => object.map(Self::Object).ok_or(missing("obj")),
            Some(3) => array.map(Self::Array).ok_or(missing("array")),
            Some(value) => Err(ProtocolError::InvalidEnumValue {
                kind: "Any.Type",
                value,
            }),
            None => Err(missing("type")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn roundtrip<T: Encode + Decode>(value: &T) -> T {
        T::decode(value.encode_to_bytes()).unwrap()
    }

    #[test]
    fn test_scalar_variants_survive_wire() {
        let values = [
            Scalar::Sint(-42),
            Scalar::Uint(u64::MAX),
            Scalar::Null,
            Scalar::Double(0.25),
            Scalar::Float(1.5),
            Scalar::Bool(true),
            Scalar::string("héllo"),
            Scalar::Octets {
                value: Bytes::from_static(b"{}"),
                content_type: Some(2),
            },
        ];
        for value in &values {
            assert_eq!(&roundtrip(value), value);
        }
    }

    #[test]
    fn test_scalar_missing_payload() {
        let mut buf = BytesMut::new();
        put_uint(&mut buf, 1, ScalarType::Sint as u64);
        let err = Scalar::decode(buf.freeze()).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MissingField {
                message: "Scalar",
                field: "v_signed_int"
            }
        );
    }

    #[test]
    fn test_to_uint_coercions() {
        assert_eq!(Scalar::Uint(7).to_uint(), 7);
        assert_eq!(Scalar::Sint(12).to_uint(), 12);
        assert_eq!(Scalar::Bool(true).to_uint(), 1);
        assert_eq!(Scalar::string("31").to_uint(), 31);
        assert_eq!(Scalar::string("x").to_uint(), 0);
        assert_eq!(Scalar::Null.to_uint(), 0);
    }

    #[test]
    fn test_nested_any() {
        let any = Any::Object(vec![
            ObjectField {
                key: "tls".into(),
                value: Any::Scalar(Scalar::Bool(true)),
            },
            ObjectField {
                key: "mechs".into(),
                value: Any::Array(vec![
                    Any::Scalar(Scalar::string("PLAIN")),
                    Any::Scalar(Scalar::string("MYSQL41")),
                ]),
            },
        ]);
        assert_eq!(roundtrip(&any), any);
    }
}
