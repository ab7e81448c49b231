//! Protobuf wire primitives.
//!
//! X Protocol payloads are protobuf messages. This module holds the pieces
//! every message codec is built from: base-128 varints, zig-zag folding,
//! field keys, and a reader that walks the fields of one message body.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Longest legal varint encoding of a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

/// Protobuf wire type of an encoded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Base-128 varint (int32, uint64, bool, enum, sint64 ...).
    Varint = 0,
    /// Eight little-endian bytes (double, fixed64).
    Fixed64 = 1,
    /// Varint length followed by that many bytes (string, bytes, messages).
    LengthDelimited = 2,
    /// Four little-endian bytes (float, fixed32).
    Fixed32 = 5,
}

impl WireType {
    /// Create a wire type from the low three bits of a field key.
    pub fn from_u8(value: u8, field: u32) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Self::Varint),
            1 => Ok(Self::Fixed64),
            2 => Ok(Self::LengthDelimited),
            5 => Ok(Self::Fixed32),
            _ => Err(ProtocolError::InvalidWireType {
                field,
                wire_type: value,
            }),
        }
    }
}

/// Read one base-128 varint.
///
/// Truncated input and encodings longer than ten bytes are both reported as
/// [`ProtocolError::MalformedVarint`].
pub fn read_varint(src: &mut impl Buf) -> Result<u64, ProtocolError> {
    let mut value: u64 = 0;
    for index in 0..MAX_VARINT_LEN {
        if !src.has_remaining() {
            return Err(ProtocolError::MalformedVarint);
        }
        let byte = src.get_u8();
        if index == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(ProtocolError::MalformedVarint);
        }
        value |= u64::from(byte & 0x7F) << (7 * index);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(ProtocolError::MalformedVarint)
}

/// Write one base-128 varint.
pub fn write_varint(dst: &mut impl BufMut, mut value: u64) {
    while value >= 0x80 {
        dst.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    dst.put_u8(value as u8);
}

/// Number of bytes [`write_varint`] emits for `value`.
#[must_use]
pub const fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Fold a signed value so that small magnitudes encode as small varints.
#[must_use]
pub const fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`]: `(v >> 1) ^ -(v & 1)`.
#[must_use]
pub const fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Payload of one decoded field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Varint payload.
    Varint(u64),
    /// Eight-byte payload, raw bits.
    Fixed64(u64),
    /// Length-delimited payload.
    Bytes(Bytes),
    /// Four-byte payload, raw bits.
    Fixed32(u32),
}

/// One field of a protobuf message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field number from the message definition.
    pub number: u32,
    /// Field payload.
    pub value: FieldValue,
}

impl Field {
    fn wire_type(&self) -> u8 {
        match self.value {
            FieldValue::Varint(_) => WireType::Varint as u8,
            FieldValue::Fixed64(_) => WireType::Fixed64 as u8,
            FieldValue::Bytes(_) => WireType::LengthDelimited as u8,
            FieldValue::Fixed32(_) => WireType::Fixed32 as u8,
        }
    }

    fn mismatch(&self) -> ProtocolError {
        ProtocolError::InvalidWireType {
            field: self.number,
            wire_type: self.wire_type(),
        }
    }

    /// Interpret as an unsigned 64-bit varint.
    pub fn as_u64(&self) -> Result<u64, ProtocolError> {
        match self.value {
            FieldValue::Varint(v) => Ok(v),
            _ => Err(self.mismatch()),
        }
    }

    /// Interpret as an unsigned 32-bit varint.
    pub fn as_u32(&self) -> Result<u32, ProtocolError> {
        let value = self.as_u64()?;
        u32::try_from(value).map_err(|_| ProtocolError::ValueOutOfRange {
            field: self.number,
            value,
        })
    }

    /// Interpret as a zig-zag encoded `sint64`.
    pub fn as_sint64(&self) -> Result<i64, ProtocolError> {
        self.as_u64().map(zigzag_decode)
    }

    /// Interpret as a `bool`.
    pub fn as_bool(&self) -> Result<bool, ProtocolError> {
        self.as_u64().map(|v| v != 0)
    }

    /// Interpret as a `double`.
    pub fn as_f64(&self) -> Result<f64, ProtocolError> {
        match self.value {
            FieldValue::Fixed64(bits) => Ok(f64::from_bits(bits)),
            _ => Err(self.mismatch()),
        }
    }

    /// Interpret as a `float`.
    pub fn as_f32(&self) -> Result<f32, ProtocolError> {
        match self.value {
            FieldValue::Fixed32(bits) => Ok(f32::from_bits(bits)),
            _ => Err(self.mismatch()),
        }
    }

    /// Interpret as raw bytes (also used for embedded messages).
    pub fn as_bytes(&self) -> Result<Bytes, ProtocolError> {
        match &self.value {
            FieldValue::Bytes(b) => Ok(b.clone()),
            _ => Err(self.mismatch()),
        }
    }

    /// Interpret as a UTF-8 string.
    pub fn as_string(&self) -> Result<String, ProtocolError> {
        let bytes = self.as_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8(self.number))
    }

    /// Decode an embedded message.
    pub fn as_message<M: Decode>(&self) -> Result<M, ProtocolError> {
        M::decode(self.as_bytes()?)
    }
}

/// Iterates over the fields of one encoded message body.
#[derive(Debug, Clone)]
pub struct FieldReader {
    buf: Bytes,
}

impl FieldReader {
    /// Create a reader over a message body.
    #[must_use]
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    /// Read the next field, or `None` once the body is exhausted.
    pub fn next_field(&mut self) -> Result<Option<Field>, ProtocolError> {
        if !self.buf.has_remaining() {
            return Ok(None);
        }
        let key = read_varint(&mut self.buf)?;
        let number = u32::try_from(key >> 3).map_err(|_| ProtocolError::MalformedVarint)?;
        let value = match WireType::from_u8((key & 0x07) as u8, number)? {
            WireType::Varint => FieldValue::Varint(read_varint(&mut self.buf)?),
            WireType::Fixed64 => {
                self.require(8)?;
                FieldValue::Fixed64(self.buf.get_u64_le())
            }
            WireType::Fixed32 => {
                self.require(4)?;
                FieldValue::Fixed32(self.buf.get_u32_le())
            }
            WireType::LengthDelimited => {
                let len = read_varint(&mut self.buf)?;
                let len = usize::try_from(len).map_err(|_| ProtocolError::UnexpectedEof {
                    needed: usize::MAX,
                    available: self.buf.remaining(),
                })?;
                self.require(len)?;
                FieldValue::Bytes(self.buf.split_to(len))
            }
        };
        Ok(Some(Field { number, value }))
    }

    fn require(&self, needed: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() < needed {
            return Err(ProtocolError::UnexpectedEof {
                needed,
                available: self.buf.remaining(),
            });
        }
        Ok(())
    }
}

/// A message shape that can be written in protobuf wire format.
pub trait Encode {
    /// Append the encoded message body to `dst`.
    fn encode(&self, dst: &mut BytesMut);

    /// Encode into a fresh buffer.
    fn encode_to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// A message shape that can be read from protobuf wire format.
pub trait Decode: Sized {
    /// Decode a complete message body.
    fn decode(src: Bytes) -> Result<Self, ProtocolError>;
}

/// Write a field key.
pub fn put_key(dst: &mut impl BufMut, field: u32, wire_type: WireType) {
    write_varint(dst, (u64::from(field) << 3) | wire_type as u64);
}

/// Write an unsigned varint field.
pub fn put_uint(dst: &mut impl BufMut, field: u32, value: u64) {
    put_key(dst, field, WireType::Varint);
    write_varint(dst, value);
}

/// Write a zig-zag `sint64` field.
pub fn put_sint(dst: &mut impl BufMut, field: u32, value: i64) {
    put_uint(dst, field, zigzag_encode(value));
}

/// Write a `bool` field.
pub fn put_bool(dst: &mut impl BufMut, field: u32, value: bool) {
    put_uint(dst, field, u64::from(value));
}

/// Write a `double` field.
pub fn put_f64(dst: &mut impl BufMut, field: u32, value: f64) {
    put_key(dst, field, WireType::Fixed64);
    dst.put_u64_le(value.to_bits());
}

/// Write a `float` field.
pub fn put_f32(dst: &mut impl BufMut, field: u32, value: f32) {
    put_key(dst, field, WireType::Fixed32);
    dst.put_u32_le(value.to_bits());
}

/// Write a `bytes` or `string` field.
pub fn put_bytes(dst: &mut impl BufMut, field: u32, value: &[u8]) {
    put_key(dst, field, WireType::LengthDelimited);
    write_varint(dst, value.len() as u64);
    dst.put_slice(value);
}

/// Write an embedded message field.
pub fn put_message(dst: &mut BytesMut, field: u32, message: &impl Encode) {
    let mut body = BytesMut::new();
    message.encode(&mut body);
    put_bytes(dst, field, &body);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_varint_known_encodings() {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, 300);
        assert_eq!(&buf[..], &[0xAC, 0x02]);

        let mut cursor = buf.freeze();
        assert_eq!(read_varint(&mut cursor).unwrap(), 300);
    }

    #[test]
    fn test_varint_max_value() {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, u64::MAX);
        assert_eq!(buf.len(), MAX_VARINT_LEN);
        assert_eq!(varint_len(u64::MAX), MAX_VARINT_LEN);

        let mut cursor = buf.freeze();
        assert_eq!(read_varint(&mut cursor).unwrap(), u64::MAX);
    }

    #[test]
    fn test_varint_truncated() {
        let mut cursor: &[u8] = &[0x80, 0x80];
        assert_eq!(read_varint(&mut cursor), Err(ProtocolError::MalformedVarint));
    }

    #[test]
    fn test_varint_overlong() {
        let mut cursor: &[u8] = &[0xFF; 11];
        assert_eq!(read_varint(&mut cursor), Err(ProtocolError::MalformedVarint));
    }

    #[test]
    fn test_zigzag_edges() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_decode(zigzag_encode(i64::MIN)), i64::MIN);
        assert_eq!(zigzag_decode(zigzag_encode(i64::MAX)), i64::MAX);
        assert_eq!(zigzag_encode(i64::MIN), u64::MAX);
    }

    #[test]
    fn test_field_reader_walks_mixed_fields() {
        let mut buf = BytesMut::new();
        put_uint(&mut buf, 1, 7);
        put_bytes(&mut buf, 2, b"abc");
        put_f64(&mut buf, 3, 1.5);
        put_f32(&mut buf, 4, 2.5);

        let mut reader = FieldReader::new(buf.freeze());
        let f1 = reader.next_field().unwrap().unwrap();
        assert_eq!((f1.number, f1.as_u64().unwrap()), (1, 7));
        let f2 = reader.next_field().unwrap().unwrap();
        assert_eq!(f2.as_string().unwrap(), "abc");
        let f3 = reader.next_field().unwrap().unwrap();
        assert_eq!(f3.as_f64().unwrap(), 1.5);
        let f4 = reader.next_field().unwrap().unwrap();
        assert_eq!(f4.as_f32().unwrap(), 2.5);
        assert!(reader.next_field().unwrap().is_none());
    }

    #[test]
    fn test_field_reader_truncated_bytes() {
        let mut buf = BytesMut::new();
        put_key(&mut buf, 1, WireType::LengthDelimited);
        write_varint(&mut buf, 10);
        buf.put_slice(b"abc");

        let mut reader = FieldReader::new(buf.freeze());
        assert_eq!(
            reader.next_field(),
            Err(ProtocolError::UnexpectedEof {
                needed: 10,
                available: 3
            })
        );
    }

    #[test]
    fn test_wrong_wire_type_is_reported() {
        let mut buf = BytesMut::new();
        put_bytes(&mut buf, 5, b"x");
        let field = FieldReader::new(buf.freeze()).next_field().unwrap().unwrap();
        assert!(matches!(
            field.as_u64(),
            Err(ProtocolError::InvalidWireType { field: 5, wire_type: 2 })
        ));
    }

    #[test]
    fn test_reserved_wire_type_rejected() {
        let mut reader = FieldReader::new(Bytes::from_static(&[0x0B]));
        assert!(matches!(
            reader.next_field(),
            Err(ProtocolError::InvalidWireType { field: 1, wire_type: 3 })
        ));
    }

    proptest! {
        #[test]
        fn prop_zigzag_roundtrip(v in any::<i64>()) {
            prop_assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }

        #[test]
        fn prop_varint_length_matches(v in any::<u64>()) {
            let mut buf = BytesMut::new();
            write_varint(&mut buf, v);
            prop_assert_eq!(buf.len(), varint_len(v));
            let mut cursor = buf.freeze();
            prop_assert_eq!(read_varint(&mut cursor).unwrap(), v);
        }
    }
}
