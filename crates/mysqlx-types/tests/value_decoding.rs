//! Column decoding edge cases and properties.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use bytes::BytesMut;
use mysqlx_protocol::FieldType;
use mysqlx_protocol::wire::{write_varint, zigzag_decode, zigzag_encode};
use mysqlx_types::{FromValue, TypeError, Value, decode_value};
use proptest::prelude::*;

fn varint(v: u64) -> Vec<u8> {
    let mut buf = BytesMut::new();
    write_varint(&mut buf, v);
    buf.to_vec()
}

/// Pack decimal digits the way the server does: scale byte, two digits per
/// byte, sign in the low nibble after the last digit, or alone in the high
/// nibble of a trailing byte when the digit count is even.
fn pack_decimal(scale: u8, digits: &[u8], negative: bool) -> Vec<u8> {
    let sign = if negative { 0x0D } else { 0x0C };
    let mut nibbles: Vec<u8> = digits.to_vec();
    nibbles.push(sign);
    if nibbles.len() % 2 == 1 {
        nibbles.push(0);
    }
    let mut out = vec![scale];
    out.extend(nibbles.chunks(2).map(|pair| (pair[0] << 4) | pair[1]));
    out
}

fn render(scale: usize, digits: &[u8], negative: bool) -> String {
    let text: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
    let body = if scale == 0 {
        text
    } else if scale >= text.len() {
        format!("0.{}{}", "0".repeat(scale - text.len()), text)
    } else {
        let (int_part, frac) = text.split_at(text.len() - scale);
        format!("{int_part}.{frac}")
    };
    if negative { format!("-{body}") } else { body }
}

mod overflow {
    use super::*;

    #[test]
    fn max_unsigned_is_exact_text() {
        let value = decode_value(&varint(u64::MAX), FieldType::Uint, 0).unwrap();
        assert_eq!(value, Value::BigInt("18446744073709551615".into()));
        assert_eq!(u64::from_value(&value).unwrap(), u64::MAX);
    }

    #[test]
    fn bit_follows_unsigned_rules() {
        let value = decode_value(&varint(0b1011), FieldType::Bit, 0).unwrap();
        assert_eq!(value, Value::Int(11));
    }
}

mod malformed {
    use super::*;

    #[test]
    fn overlong_varint() {
        let raw = [0xFF; 11];
        assert!(matches!(
            decode_value(&raw, FieldType::Sint, 0),
            Err(TypeError::Decode { .. })
        ));
    }

    #[test]
    fn short_float() {
        assert!(matches!(
            decode_value(&[0, 0, 0], FieldType::Float, 2),
            Err(TypeError::BufferTooSmall { needed: 4, available: 3 })
        ));
    }

    #[test]
    fn decimal_with_bad_digit() {
        assert!(decode_value(&[0x00, 0xA1, 0xC0], FieldType::Decimal, 0).is_err());
    }

    #[test]
    fn set_member_not_utf8() {
        let mut raw = varint(2);
        raw.extend(b"ok");
        raw.extend(varint(1));
        raw.push(0xFF);
        assert!(matches!(
            decode_value(&raw, FieldType::Set, 0),
            Err(TypeError::Decode { field_type: "SET", .. })
        ));
    }
}

mod documents {
    use super::*;

    #[test]
    fn json_document_column() {
        let value = decode_value(b"{\"_id\": \"1\", \"age\": 30}\0", FieldType::Bytes, 0).unwrap();
        assert_eq!(
            String::from_value(&value).unwrap(),
            "{\"_id\": \"1\", \"age\": 30}"
        );
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_document_as_serde_value() {
        let value = decode_value(b"{\"age\": 30}\0", FieldType::Bytes, 0).unwrap();
        let doc = serde_json::Value::from_value(&value).unwrap();
        assert_eq!(doc["age"], 30);
    }
}

proptest! {
    #[test]
    fn zigzag_roundtrip(v in any::<i64>()) {
        prop_assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        let value = decode_value(&varint(zigzag_encode(v)), FieldType::Sint, 0).unwrap();
        prop_assert_eq!(value, Value::Int(v));
    }

    #[test]
    fn unsigned_never_loses_precision(v in any::<u64>()) {
        let value = decode_value(&varint(v), FieldType::Uint, 0).unwrap();
        prop_assert_eq!(u64::from_value(&value).unwrap(), v);
    }

    #[test]
    fn decimal_digits_render(
        digits in proptest::collection::vec(0u8..=9, 1..30),
        scale in 0u8..40,
        negative in any::<bool>(),
    ) {
        let raw = pack_decimal(scale, &digits, negative);
        let value = decode_value(&raw, FieldType::Decimal, 0).unwrap();
        prop_assert_eq!(value, Value::Decimal(render(usize::from(scale), &digits, negative)));
    }

    #[test]
    fn set_members_in_order(members in proptest::collection::vec("[a-z]{0,8}", 1..6)) {
        let mut raw = Vec::new();
        for m in &members {
            raw.extend(varint(m.len() as u64));
            raw.extend(m.as_bytes());
        }
        prop_assume!(raw != [0x01]);
        let value = decode_value(&raw, FieldType::Set, 0).unwrap();
        prop_assert_eq!(value, Value::Set(members));
    }
}
