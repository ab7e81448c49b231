//! Trait for converting Rust types to protocol scalars.

use bytes::Bytes;
use mysqlx_protocol::Scalar;
use mysqlx_protocol::resultset::ContentType;

use crate::error::TypeError;

/// Trait for types that can be sent as a [`Scalar`].
///
/// Used for statement arguments, capability values and bound placeholders.
pub trait ToScalar {
    /// Convert this value to a scalar.
    fn to_scalar(&self) -> Result<Scalar, TypeError>;
}

impl ToScalar for Scalar {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        Ok(self.clone())
    }
}

impl ToScalar for bool {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        Ok(Scalar::Bool(*self))
    }
}

macro_rules! signed_to_scalar {
    ($($ty:ty),*) => {$(
        impl ToScalar for $ty {
            fn to_scalar(&self) -> Result<Scalar, TypeError> {
                Ok(Scalar::Sint(i64::from(*self)))
            }
        }
    )*};
}

macro_rules! unsigned_to_scalar {
    ($($ty:ty),*) => {$(
        impl ToScalar for $ty {
            fn to_scalar(&self) -> Result<Scalar, TypeError> {
                Ok(Scalar::Uint(u64::from(*self)))
            }
        }
    )*};
}

signed_to_scalar!(i8, i16, i32, i64);
unsigned_to_scalar!(u8, u16, u32, u64);

impl ToScalar for f32 {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        Ok(Scalar::Float(*self))
    }
}

impl ToScalar for f64 {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        Ok(Scalar::Double(*self))
    }
}

impl ToScalar for str {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        Ok(Scalar::string(self))
    }
}

impl ToScalar for String {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        Ok(Scalar::string(self.as_str()))
    }
}

impl ToScalar for [u8] {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        Ok(Scalar::octets(Bytes::copy_from_slice(self)))
    }
}

impl ToScalar for Vec<u8> {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        self.as_slice().to_scalar()
    }
}

impl ToScalar for Bytes {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        Ok(Scalar::octets(self.clone()))
    }
}

impl<T: ToScalar> ToScalar for Option<T> {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        match self {
            Some(v) => v.to_scalar(),
            None => Ok(Scalar::Null),
        }
    }
}

impl<T: ToScalar + ?Sized> ToScalar for &T {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        (*self).to_scalar()
    }
}

#[cfg(feature = "decimal")]
impl ToScalar for rust_decimal::Decimal {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        Ok(Scalar::string(self.to_string()))
    }
}

#[cfg(feature = "chrono")]
impl ToScalar for chrono::NaiveDate {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        Ok(Scalar::string(self.format("%Y-%m-%d").to_string()))
    }
}

#[cfg(feature = "chrono")]
impl ToScalar for chrono::NaiveTime {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        Ok(Scalar::string(self.format("%H:%M:%S%.6f").to_string()))
    }
}

#[cfg(feature = "chrono")]
impl ToScalar for chrono::NaiveDateTime {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        Ok(Scalar::string(self.format("%Y-%m-%d %H:%M:%S%.6f").to_string()))
    }
}

#[cfg(feature = "json")]
impl ToScalar for serde_json::Value {
    fn to_scalar(&self) -> Result<Scalar, TypeError> {
        let encoded =
            serde_json::to_vec(self).map_err(|e| TypeError::UnsupportedType(e.to_string()))?;
        Ok(Scalar::Octets {
            value: Bytes::from(encoded),
            content_type: Some(ContentType::Json as u32),
        })
    }
}

/// Content type tag of an octets scalar, if it is a known one.
#[must_use]
pub fn octets_content_type(scalar: &Scalar) -> Option<ContentType> {
    match scalar {
        Scalar::Octets {
            content_type: Some(1),
            ..
        } => Some(ContentType::Geometry),
        Scalar::Octets {
            content_type: Some(2),
            ..
        } => Some(ContentType::Json),
        Scalar::Octets {
            content_type: Some(3),
            ..
        } => Some(ContentType::Xml),
        _ => None,
    }
}
