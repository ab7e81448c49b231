//! Type conversion error types.

use thiserror::Error;

/// Errors that can occur during value decoding or type conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Value is null when non-null was expected.
    #[error("unexpected null value")]
    UnexpectedNull,

    /// Type mismatch during conversion.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        actual: &'static str,
    },

    /// Value is out of range for target type.
    #[error("value out of range for {target_type}")]
    OutOfRange {
        /// Target type name.
        target_type: &'static str,
    },

    /// A single column payload could not be decoded.
    #[error("error decoding {field_type}: {reason}")]
    Decode {
        /// Declared column type.
        field_type: &'static str,
        /// What went wrong.
        reason: String,
    },

    /// Buffer too small for a fixed-size value.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes needed.
        needed: usize,
        /// Bytes available.
        available: usize,
    },

    /// The value cannot be expressed as a protocol argument.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
}

impl TypeError {
    pub(crate) fn decode(field_type: &'static str, reason: impl Into<String>) -> Self {
        Self::Decode {
            field_type,
            reason: reason.into(),
        }
    }
}
