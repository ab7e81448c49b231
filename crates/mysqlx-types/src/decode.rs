//! Row field decoding.
//!
//! A row carries one payload per column. The column's declared
//! [`FieldType`] selects how the payload is read:
//!
//! | Type | Payload | Result |
//! |------|---------|--------|
//! | SINT | zig-zag varint | [`Value::Int`] |
//! | UINT, BIT | varint | [`Value::Int`], or [`Value::BigInt`] above `i64::MAX` |
//! | DOUBLE | 8 bytes LE | [`Value::Double`] |
//! | FLOAT | 4 bytes LE | [`Value::Double`] rounded to the column's fractional digits |
//! | BYTES, ENUM | bytes + NUL | [`Value::Bytes`] |
//! | TIME | `neg h m s us` varints | [`Value::Time`] |
//! | DATETIME | `y mo d h mi s us` varints | [`Value::DateTime`] |
//! | SET | length-prefixed members | [`Value::Set`] |
//! | DECIMAL | scale byte + packed BCD | [`Value::Decimal`] |
//!
//! An empty payload is always `NULL`.

use bytes::{Buf, Bytes};
use mysqlx_protocol::FieldType;
use mysqlx_protocol::wire::{read_varint, zigzag_decode};

use crate::error::TypeError;
use crate::value::Value;

/// Fractional digit hints at or above this value mean "not fixed".
pub const NOT_FIXED_DEC: u32 = 31;

/// BCD sign nibble marking a negative decimal.
const DECIMAL_NEGATIVE: u8 = 0x0D;

/// Decode one row field.
///
/// `fractional_digits` is the column metadata hint; only FLOAT uses it.
pub fn decode_value(
    raw: &[u8],
    field_type: FieldType,
    fractional_digits: u32,
) -> Result<Value, TypeError> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    match field_type {
        FieldType::Sint => decode_sint(raw),
        FieldType::Uint | FieldType::Bit => decode_uint(raw, field_type),
        FieldType::Double => decode_double(raw),
        FieldType::Float => decode_float(raw, fractional_digits),
        FieldType::Bytes | FieldType::Enum => decode_bytes(raw, field_type),
        FieldType::Time => decode_time(raw),
        FieldType::Datetime => decode_datetime(raw),
        FieldType::Set => decode_set(raw),
        FieldType::Decimal => decode_decimal(raw),
    }
}

fn varint(buf: &mut &[u8], field_type: FieldType) -> Result<u64, TypeError> {
    read_varint(buf).map_err(|e| TypeError::decode(field_type.name(), e.to_string()))
}

fn decode_sint(raw: &[u8]) -> Result<Value, TypeError> {
    let mut buf = raw;
    let v = varint(&mut buf, FieldType::Sint)?;
    Ok(Value::Int(zigzag_decode(v)))
}

fn decode_uint(raw: &[u8], field_type: FieldType) -> Result<Value, TypeError> {
    let mut buf = raw;
    let v = varint(&mut buf, field_type)?;
    Ok(i64::try_from(v).map_or_else(|_| Value::BigInt(v.to_string()), Value::Int))
}

fn decode_double(raw: &[u8]) -> Result<Value, TypeError> {
    let mut buf = raw;
    if buf.remaining() < 8 {
        return Err(TypeError::BufferTooSmall {
            needed: 8,
            available: buf.remaining(),
        });
    }
    Ok(Value::Double(buf.get_f64_le()))
}

fn decode_float(raw: &[u8], fractional_digits: u32) -> Result<Value, TypeError> {
    let mut buf = raw;
    if buf.remaining() < 4 {
        return Err(TypeError::BufferTooSmall {
            needed: 4,
            available: buf.remaining(),
        });
    }
    let value = f64::from(buf.get_f32_le());
    Ok(Value::Double(round_to(value, fractional_digits)))
}

/// Round half away from zero to `digits` decimal places.
fn round_to(value: f64, digits: u32) -> f64 {
    if digits >= NOT_FIXED_DEC {
        return value;
    }
    let factor = 10f64.powi(digits as i32);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() { rounded } else { value }
}

fn decode_bytes(raw: &[u8], field_type: FieldType) -> Result<Value, TypeError> {
    // The last byte is the terminator.
    let (_, data) = raw
        .split_last()
        .ok_or_else(|| TypeError::decode(field_type.name(), "zero length payload"))?;
    Ok(Value::Bytes(Bytes::copy_from_slice(data)))
}

/// Read up to `N` varints; components missing from the payload stay zero.
fn components<const N: usize>(raw: &[u8]) -> [u64; N] {
    let mut out = [0u64; N];
    let mut buf = raw;
    for slot in &mut out {
        match read_varint(&mut buf) {
            Ok(v) => *slot = v,
            Err(_) => break,
        }
    }
    out
}

/// A one-byte TIME or DATETIME payload must be the zero marker.
fn zero_marker(byte: u8, field_type: FieldType, text: &str) -> Result<String, TypeError> {
    if byte == 0 {
        Ok(text.to_string())
    } else {
        Err(TypeError::decode(
            field_type.name(),
            format!("unexpected value {byte} for a single-byte payload"),
        ))
    }
}

fn decode_time(raw: &[u8]) -> Result<Value, TypeError> {
    if let [byte] = raw {
        return zero_marker(*byte, FieldType::Time, "00:00:00.00").map(Value::Time);
    }
    let [neg, hours, minutes, seconds, useconds] = components::<5>(raw);
    let sign = if neg != 0 { "-" } else { "" };
    Ok(Value::Time(format!(
        "{sign}{hours:02}:{minutes:02}:{seconds:02}.{useconds:08}"
    )))
}

fn decode_datetime(raw: &[u8]) -> Result<Value, TypeError> {
    if let [byte] = raw {
        return zero_marker(*byte, FieldType::Datetime, "0000-00-00 00:00:00.00")
            .map(Value::DateTime);
    }
    // Microseconds are read but not rendered.
    let [year, month, day, hours, minutes, seconds, _useconds] = components::<7>(raw);
    Ok(Value::DateTime(format!(
        "{year:04}-{month:02}-{day:02} {hours:02}:{minutes:02}:{seconds:02}"
    )))
}

fn decode_set(raw: &[u8]) -> Result<Value, TypeError> {
    if raw == [0x01] {
        return Ok(Value::Set(Vec::new()));
    }
    let mut members = Vec::new();
    let mut buf = raw;
    while buf.has_remaining() {
        let len = varint(&mut buf, FieldType::Set)?;
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= buf.remaining())
            .ok_or_else(|| {
                TypeError::decode(
                    FieldType::Set.name(),
                    format!(
                        "member length {len} exceeds remaining {} bytes",
                        buf.remaining()
                    ),
                )
            })?;
        let (member, rest) = buf.split_at(len);
        let member = std::str::from_utf8(member)
            .map_err(|e| TypeError::decode(FieldType::Set.name(), format!("member is not UTF-8: {e}")))?;
        members.push(member.to_owned());
        buf = rest;
    }
    Ok(Value::Set(members))
}

fn decode_decimal(raw: &[u8]) -> Result<Value, TypeError> {
    let name = FieldType::Decimal.name();
    let (&scale, body) = raw
        .split_first()
        .ok_or_else(|| TypeError::decode(name, "missing scale byte"))?;
    let Some(&last) = body.last() else {
        return Err(TypeError::decode(name, "missing sign byte"));
    };
    let low = last & 0x0F;
    let sign = if low != 0 { low } else { last >> 4 };
    let digits = (raw.len() - 2) * 2 + usize::from(low > 9);
    if digits == 0 {
        return Err(TypeError::decode(
            name,
            format!("no digits (scale={scale}, last_byte={last:#04x})"),
        ));
    }

    let mut text = String::with_capacity(digits + 3 + usize::from(scale));
    if sign == DECIMAL_NEGATIVE {
        text.push('-');
    }
    let mut rendered = String::with_capacity(digits);
    for pos in 0..digits {
        let byte = raw[1 + pos / 2];
        let nibble = if pos % 2 == 1 { byte & 0x0F } else { byte >> 4 };
        let digit = char::from_digit(u32::from(nibble), 10)
            .ok_or_else(|| TypeError::decode(name, format!("invalid BCD digit {nibble:#x}")))?;
        rendered.push(digit);
    }

    let scale = usize::from(scale);
    if scale == 0 {
        text.push_str(&rendered);
    } else if scale >= digits {
        text.push_str("0.");
        text.extend(std::iter::repeat_n('0', scale - digits));
        text.push_str(&rendered);
    } else {
        let (int_part, frac_part) = rendered.split_at(digits - scale);
        text.push_str(int_part);
        text.push('.');
        text.push_str(frac_part);
    }
    Ok(Value::Decimal(text))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use mysqlx_protocol::wire::{write_varint, zigzag_encode};

    fn varints(values: &[u64]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for v in values {
            write_varint(&mut buf, *v);
        }
        buf.to_vec()
    }

    #[test]
    fn test_empty_payload_is_null_for_every_type() {
        for field_type in [
            FieldType::Sint,
            FieldType::Uint,
            FieldType::Double,
            FieldType::Float,
            FieldType::Bytes,
            FieldType::Time,
            FieldType::Datetime,
            FieldType::Set,
            FieldType::Enum,
            FieldType::Bit,
            FieldType::Decimal,
        ] {
            assert_eq!(decode_value(&[], field_type, 0).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_sint_extremes() {
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            let raw = varints(&[zigzag_encode(v)]);
            assert_eq!(decode_value(&raw, FieldType::Sint, 0).unwrap(), Value::Int(v));
        }
    }

    #[test]
    fn test_uint_overflow_to_text() {
        let raw = varints(&[u64::MAX]);
        assert_eq!(
            decode_value(&raw, FieldType::Uint, 0).unwrap(),
            Value::BigInt("18446744073709551615".into())
        );
        let raw = varints(&[i64::MAX as u64]);
        assert_eq!(
            decode_value(&raw, FieldType::Bit, 0).unwrap(),
            Value::Int(i64::MAX)
        );
        let raw = varints(&[i64::MAX as u64 + 1]);
        assert_eq!(
            decode_value(&raw, FieldType::Uint, 0).unwrap(),
            Value::BigInt("9223372036854775808".into())
        );
    }

    #[test]
    fn test_truncated_varint_is_error() {
        assert!(matches!(
            decode_value(&[0x80], FieldType::Uint, 0),
            Err(TypeError::Decode { field_type: "UINT", .. })
        ));
    }

    #[test]
    fn test_double_and_float() {
        let raw = 2.5f64.to_le_bytes();
        assert_eq!(
            decode_value(&raw, FieldType::Double, 0).unwrap(),
            Value::Double(2.5)
        );
        assert!(matches!(
            decode_value(&raw[..7], FieldType::Double, 0),
            Err(TypeError::BufferTooSmall { needed: 8, available: 7 })
        ));

        let raw = 1.23456f32.to_le_bytes();
        assert_eq!(
            decode_value(&raw, FieldType::Float, 2).unwrap(),
            Value::Double(1.23)
        );
        assert_eq!(
            decode_value(&raw, FieldType::Float, NOT_FIXED_DEC).unwrap(),
            Value::Double(f64::from(1.23456f32))
        );
    }

    #[test]
    fn test_float_rounds_half_away_from_zero() {
        let raw = (-0.125f32).to_le_bytes();
        assert_eq!(
            decode_value(&raw, FieldType::Float, 2).unwrap(),
            Value::Double(-0.13)
        );
    }

    #[test]
    fn test_bytes_strip_terminator() {
        assert_eq!(
            decode_value(b"hello\0", FieldType::Bytes, 0).unwrap(),
            Value::Bytes(Bytes::from_static(b"hello"))
        );
        assert_eq!(
            decode_value(b"\0", FieldType::Enum, 0).unwrap(),
            Value::Bytes(Bytes::new())
        );
    }

    #[test]
    fn test_time() {
        assert_eq!(
            decode_value(&[0], FieldType::Time, 0).unwrap(),
            Value::Time("00:00:00.00".into())
        );
        let raw = varints(&[1, 1, 2, 3, 4]);
        assert_eq!(
            decode_value(&raw, FieldType::Time, 0).unwrap(),
            Value::Time("-01:02:03.00000004".into())
        );
        // Missing trailing components default to zero.
        let raw = varints(&[0, 12, 30]);
        assert_eq!(
            decode_value(&raw, FieldType::Time, 0).unwrap(),
            Value::Time("12:30:00.00000000".into())
        );
        assert!(decode_value(&[5], FieldType::Time, 0).is_err());
    }

    #[test]
    fn test_datetime() {
        assert_eq!(
            decode_value(&[0], FieldType::Datetime, 0).unwrap(),
            Value::DateTime("0000-00-00 00:00:00.00".into())
        );
        let raw = varints(&[2024, 2, 29, 13, 5, 9, 123_456]);
        assert_eq!(
            decode_value(&raw, FieldType::Datetime, 6).unwrap(),
            Value::DateTime("2024-02-29 13:05:09".into())
        );
        let raw = varints(&[1999, 12, 31]);
        assert_eq!(
            decode_value(&raw, FieldType::Datetime, 0).unwrap(),
            Value::DateTime("1999-12-31 00:00:00".into())
        );
    }

    #[test]
    fn test_set() {
        assert_eq!(
            decode_value(&[0x01], FieldType::Set, 0).unwrap(),
            Value::Set(Vec::new())
        );
        let raw = [0x01, b'a', 0x02, b'b', b'b'];
        assert_eq!(
            decode_value(&raw, FieldType::Set, 0).unwrap(),
            Value::Set(vec!["a".into(), "bb".into()])
        );
        assert_eq!(
            decode_value(&[0x00], FieldType::Set, 0).unwrap(),
            Value::Set(vec![String::new()])
        );
    }

    #[test]
    fn test_set_overrun_discards_partial_list() {
        let raw = [0x01, b'a', 0x05, b'b'];
        assert!(matches!(
            decode_value(&raw, FieldType::Set, 0),
            Err(TypeError::Decode { field_type: "SET", .. })
        ));
    }

    #[test]
    fn test_decimal_sign_in_high_nibble() {
        assert_eq!(
            decode_value(&[0x02, 0x12, 0x34, 0xD0], FieldType::Decimal, 0).unwrap(),
            Value::Decimal("-12.34".into())
        );
        assert_eq!(
            decode_value(&[0x02, 0x12, 0x34, 0xC0], FieldType::Decimal, 0).unwrap(),
            Value::Decimal("12.34".into())
        );
    }

    #[test]
    fn test_decimal_odd_digit_count() {
        assert_eq!(
            decode_value(&[0x02, 0x12, 0x3D], FieldType::Decimal, 0).unwrap(),
            Value::Decimal("-1.23".into())
        );
        assert_eq!(
            decode_value(&[0x00, 0x12, 0x3C], FieldType::Decimal, 0).unwrap(),
            Value::Decimal("123".into())
        );
    }

    #[test]
    fn test_decimal_scale_beyond_digits() {
        assert_eq!(
            decode_value(&[0x04, 0x05, 0xC0], FieldType::Decimal, 0).unwrap(),
            Value::Decimal("0.0005".into())
        );
    }

    #[test]
    fn test_decimal_without_digits() {
        assert!(decode_value(&[0x02, 0xC0], FieldType::Decimal, 0).is_err());
        assert!(decode_value(&[0x02], FieldType::Decimal, 0).is_err());
    }
}
