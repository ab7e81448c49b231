//! Decoded column value representation.

use bytes::Bytes;

/// A decoded column value.
///
/// Values own their data; nothing borrows from the row payload they were
/// decoded from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// SQL `NULL` (empty payload).
    #[default]
    Null,
    /// Integer that fits in `i64` (SINT, UINT, BIT).
    Int(i64),
    /// Integer beyond `i64::MAX`, as its exact decimal digits.
    BigInt(String),
    /// DOUBLE, or FLOAT widened and rounded to its fractional digits.
    Double(f64),
    /// BYTES or ENUM payload without its terminating NUL.
    Bytes(Bytes),
    /// DECIMAL rendered as text, e.g. `-12.34`.
    Decimal(String),
    /// TIME rendered as `[-]HH:MM:SS.ffffffff`.
    Time(String),
    /// DATETIME rendered as `YYYY-MM-DD HH:MM:SS`.
    DateTime(String),
    /// SET members in wire order. Invalid UTF-8 is replaced.
    Set(Vec<String>),
}

impl Value {
    /// Check if the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as an i64, if it is one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an f64, if it is one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the raw bytes of a BYTES/ENUM value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// Get any textual rendering as a string slice.
    ///
    /// BYTES values are returned only when they are valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Bytes(v) => std::str::from_utf8(v).ok(),
            Self::BigInt(v) | Self::Decimal(v) | Self::Time(v) | Self::DateTime(v) => Some(v),
            _ => None,
        }
    }

    /// Get SET members.
    #[must_use]
    pub fn as_set(&self) -> Option<&[String]> {
        match self {
            Self::Set(v) => Some(v),
            _ => None,
        }
    }

    /// Get the variant name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Int(_) => "INT",
            Self::BigInt(_) => "BIGINT",
            Self::Double(_) => "DOUBLE",
            Self::Bytes(_) => "BYTES",
            Self::Decimal(_) => "DECIMAL",
            Self::Time(_) => "TIME",
            Self::DateTime(_) => "DATETIME",
            Self::Set(_) => "SET",
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Bytes(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Bytes(Bytes::from(v))
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
