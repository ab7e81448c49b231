//! Trait for converting decoded values to Rust types.

use bytes::Bytes;
#[cfg(feature = "chrono")]
use chrono::Timelike as _;

use crate::error::TypeError;
use crate::value::Value;

/// Trait for types that can be extracted from a decoded [`Value`].
pub trait FromValue: Sized {
    /// Convert from a decoded value to this type.
    fn from_value(value: &Value) -> Result<Self, TypeError>;

    /// Convert from a possibly NULL value.
    ///
    /// Returns `None` if the value is NULL.
    fn from_value_nullable(value: &Value) -> Result<Option<Self>, TypeError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_value(value).map(Some)
        }
    }
}

fn mismatch<T>(expected: &'static str, value: &Value) -> Result<T, TypeError> {
    match value {
        Value::Null => Err(TypeError::UnexpectedNull),
        _ => Err(TypeError::TypeMismatch {
            expected,
            actual: value.type_name(),
        }),
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::Int(v) => Ok(*v != 0),
            _ => mismatch("bool", value),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::Int(v) => Ok(*v),
            Value::BigInt(_) => Err(TypeError::OutOfRange { target_type: "i64" }),
            _ => mismatch("i64", value),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        let v = i64::from_value(value).map_err(|e| match e {
            TypeError::TypeMismatch { actual, .. } => TypeError::TypeMismatch {
                expected: "i32",
                actual,
            },
            TypeError::OutOfRange { .. } => TypeError::OutOfRange { target_type: "i32" },
            other => other,
        })?;
        i32::try_from(v).map_err(|_| TypeError::OutOfRange { target_type: "i32" })
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::Int(v) => {
                u64::try_from(*v).map_err(|_| TypeError::OutOfRange { target_type: "u64" })
            }
            Value::BigInt(v) => v
                .parse()
                .map_err(|_| TypeError::OutOfRange { target_type: "u64" }),
            _ => mismatch("u64", value),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::Double(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            _ => mismatch("f64", value),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::Bytes(b) => String::from_utf8(b.to_vec()).map_err(|e| TypeError::Decode {
                field_type: "BYTES",
                reason: e.to_string(),
            }),
            Value::BigInt(s) | Value::Decimal(s) | Value::Time(s) | Value::DateTime(s) => {
                Ok(s.clone())
            }
            Value::Int(v) => Ok(v.to_string()),
            _ => mismatch("String", value),
        }
    }
}

impl FromValue for Bytes {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            _ => mismatch("Bytes", value),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::Bytes(b) => Ok(b.to_vec()),
            _ => mismatch("Vec<u8>", value),
        }
    }
}

impl FromValue for Vec<String> {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::Set(members) => Ok(members.clone()),
            _ => mismatch("Vec<String>", value),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        T::from_value_nullable(value)
    }
}

#[cfg(feature = "decimal")]
impl FromValue for rust_decimal::Decimal {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        use std::str::FromStr;

        match value {
            Value::Decimal(s) | Value::BigInt(s) => {
                rust_decimal::Decimal::from_str(s).map_err(|e| TypeError::Decode {
                    field_type: "DECIMAL",
                    reason: e.to_string(),
                })
            }
            Value::Int(v) => Ok(rust_decimal::Decimal::from(*v)),
            _ => mismatch("Decimal", value),
        }
    }
}

#[cfg(feature = "chrono")]
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[cfg(feature = "chrono")]
fn chrono_error(field_type: &'static str, e: chrono::ParseError) -> TypeError {
    TypeError::Decode {
        field_type,
        reason: e.to_string(),
    }
}

#[cfg(feature = "chrono")]
impl FromValue for chrono::NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::DateTime(s) => chrono::NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
                .map_err(|e| chrono_error("DATETIME", e)),
            _ => mismatch("NaiveDateTime", value),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromValue for chrono::NaiveDate {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        chrono::NaiveDateTime::from_value(value)
            .map(|dt| dt.date())
            .map_err(|e| match e {
                TypeError::TypeMismatch { actual, .. } => TypeError::TypeMismatch {
                    expected: "NaiveDate",
                    actual,
                },
                other => other,
            })
    }
}

/// The digits after the dot of a TIME value are a microsecond count. Only
/// non-negative values below 24 hours convert.
#[cfg(feature = "chrono")]
impl FromValue for chrono::NaiveTime {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        let Value::Time(s) = value else {
            return mismatch("NaiveTime", value);
        };
        if s.starts_with('-') {
            return Err(TypeError::OutOfRange {
                target_type: "NaiveTime",
            });
        }
        let (hms, frac) = s.split_once('.').unwrap_or((s, "0"));
        let time = chrono::NaiveTime::parse_from_str(hms, "%H:%M:%S")
            .map_err(|_| TypeError::OutOfRange {
                target_type: "NaiveTime",
            })?;
        let micros: u32 = frac.parse().map_err(|_| TypeError::Decode {
            field_type: "TIME",
            reason: format!("invalid fraction `{frac}`"),
        })?;
        time.with_nanosecond(micros.saturating_mul(1000))
            .ok_or(TypeError::OutOfRange {
                target_type: "NaiveTime",
            })
    }
}

#[cfg(feature = "json")]
impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::Bytes(b) => serde_json::from_slice(b).map_err(|e| TypeError::Decode {
                field_type: "JSON",
                reason: e.to_string(),
            }),
            _ => mismatch("serde_json::Value", value),
        }
    }
}
