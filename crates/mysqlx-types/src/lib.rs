//! # mysqlx-types
//!
//! MySQL X Protocol column values and Rust type conversions.
//!
//! Rows arrive as one raw payload per column; [`decode_value`] turns a
//! payload plus the column's declared type into an owned [`Value`].
//! [`FromValue`] extracts Rust types from decoded values and [`ToScalar`]
//! converts Rust values into protocol scalars for arguments.
//!
//! ## Features
//!
//! - `chrono` (default): `NaiveDate`, `NaiveTime` and `NaiveDateTime` conversions
//! - `decimal` (default): `rust_decimal::Decimal` conversions
//! - `json`: `serde_json::Value` conversions for document columns
//!
//! ## Type Mappings
//!
//! | Column Type | Value | Rust Type |
//! |-------------|-------|-----------|
//! | `SINT` | `Int` | `i64`, `i32` |
//! | `UINT`, `BIT` | `Int` / `BigInt` | `u64`, `i64` |
//! | `DOUBLE`, `FLOAT` | `Double` | `f64` |
//! | `BYTES`, `ENUM` | `Bytes` | `String`, `Vec<u8>`, `Bytes` |
//! | `DECIMAL` | `Decimal` | `rust_decimal::Decimal`, `String` |
//! | `TIME` | `Time` | `chrono::NaiveTime`, `String` |
//! | `DATETIME` | `DateTime` | `chrono::NaiveDateTime`, `String` |
//! | `SET` | `Set` | `Vec<String>` |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod decode;
pub mod error;
pub mod from_value;
pub mod to_scalar;
pub mod value;

pub use decode::{NOT_FIXED_DEC, decode_value};
pub use error::TypeError;
pub use from_value::FromValue;
pub use to_scalar::ToScalar;
pub use value::Value;
