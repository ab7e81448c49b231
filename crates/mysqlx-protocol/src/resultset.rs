//! `Mysqlx.Resultset`: column metadata, rows and fetch markers.

use bitflags::bitflags;
use bytes::{Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::wire::{Decode, Encode, FieldReader, put_bytes, put_uint};

/// Column type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldType {
    /// Zig-zag varint signed integer.
    Sint = 1,
    /// Varint unsigned integer.
    Uint = 2,
    /// Little-endian IEEE-754 double.
    Double = 5,
    /// Little-endian IEEE-754 single.
    Float = 6,
    /// NUL-terminated byte string.
    Bytes = 7,
    /// Varint-encoded time of day or interval.
    Time = 10,
    /// Varint-encoded date and time.
    Datetime = 12,
    /// Length-prefixed set members.
    Set = 15,
    /// NUL-terminated enum label.
    Enum = 16,
    /// Varint bit field.
    Bit = 17,
    /// Packed BCD decimal.
    Decimal = 18,
}

impl FieldType {
    /// Create a field type from its wire value.
    pub fn from_u32(value: u32) -> Result<Self, ProtocolError> {
        match value {
            1 => Ok(Self::Sint),
            2 => Ok(Self::Uint),
            5 => Ok(Self::Double),
            6 => Ok(Self::Float),
            7 => Ok(Self::Bytes),
            10 => Ok(Self::Time),
            12 => Ok(Self::Datetime),
            15 => Ok(Self::Set),
            16 => Ok(Self::Enum),
            17 => Ok(Self::Bit),
            18 => Ok(Self::Decimal),
            _ => Err(ProtocolError::InvalidEnumValue {
                kind: "ColumnMetaData.FieldType",
                value: u64::from(value),
            }),
        }
    }

    /// Upper-case name as used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sint => "SINT",
            Self::Uint => "UINT",
            Self::Double => "DOUBLE",
            Self::Float => "FLOAT",
            Self::Bytes => "BYTES",
            Self::Time => "TIME",
            Self::Datetime => "DATETIME",
            Self::Set => "SET",
            Self::Enum => "ENUM",
            Self::Bit => "BIT",
            Self::Decimal => "DECIMAL",
        }
    }
}

bitflags! {
    /// Column flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ColumnFlags: u32 {
        /// Type specific: `ZEROFILL` for UINT, `UNSIGNED` for DOUBLE/FLOAT/DECIMAL,
        /// `RIGHTPAD` for BYTES, `TIMESTAMP` for DATETIME.
        const TYPE_SPECIFIC = 0x0001;
        /// Column is `NOT NULL`.
        const NOT_NULL = 0x0010;
        /// Column is part of the primary key.
        const PRIMARY_KEY = 0x0020;
        /// Column is part of a unique key.
        const UNIQUE_KEY = 0x0040;
        /// Column is part of a non-unique key.
        const MULTIPLE_KEY = 0x0080;
        /// Column is `AUTO_INCREMENT`.
        const AUTO_INCREMENT = 0x0100;
    }
}

/// Column content type hints for BYTES columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContentType {
    /// Geometry in WKB.
    Geometry = 1,
    /// JSON document.
    Json = 2,
    /// XML document.
    Xml = 3,
}

/// Column metadata (`RESULTSET_COLUMN_META_DATA`).
///
/// Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMetaData {
    /// Raw type tag.
    pub field_type: Option<u32>,
    /// Column alias.
    pub name: Option<Bytes>,
    /// Column name.
    pub original_name: Option<Bytes>,
    /// Table alias.
    pub table: Option<Bytes>,
    /// Table name.
    pub original_table: Option<Bytes>,
    /// Schema name.
    pub schema: Option<Bytes>,
    /// Catalog name.
    pub catalog: Option<Bytes>,
    /// Collation id.
    pub collation: Option<u64>,
    /// Fractional digits (DOUBLE, FLOAT, DECIMAL, TIME, DATETIME).
    pub fractional_digits: Option<u32>,
    /// Display length.
    pub length: Option<u32>,
    /// Raw flag bits.
    pub flags: Option<u32>,
    /// Content type hint.
    pub content_type: Option<u32>,
}

impl ColumnMetaData {
    /// Metadata with only a type and a name, as emitted in compact mode.
    pub fn new(field_type: FieldType, name: impl Into<Bytes>) -> Self {
        Self {
            field_type: Some(field_type as u32),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Parsed flags; unknown bits are retained.
    #[must_use]
    pub fn column_flags(&self) -> ColumnFlags {
        ColumnFlags::from_bits_retain(self.flags.unwrap_or(0))
    }
}

fn put_opt_bytes(dst: &mut BytesMut, field: u32, value: &Option<Bytes>) {
    if let Some(v) = value {
        put_bytes(dst, field, v);
    }
}

fn put_opt_uint(dst: &mut BytesMut, field: u32, value: Option<u64>) {
    if let Some(v) = value {
        put_uint(dst, field, v);
    }
}

impl Encode for ColumnMetaData {
    fn encode(&self, dst: &mut BytesMut) {
        put_opt_uint(dst, 1, self.field_type.map(u64::from));
        put_opt_bytes(dst, 2, &self.name);
        put_opt_bytes(dst, 3, &self.original_name);
        put_opt_bytes(dst, 4, &self.table);
        put_opt_bytes(dst, 5, &self.original_table);
        put_opt_bytes(dst, 6, &self.schema);
        put_opt_bytes(dst, 7, &self.catalog);
        put_opt_uint(dst, 8, self.collation);
        put_opt_uint(dst, 9, self.fractional_digits.map(u64::from));
        put_opt_uint(dst, 10, self.length.map(u64::from));
        put_opt_uint(dst, 11, self.flags.map(u64::from));
        put_opt_uint(dst, 12, self.content_type.map(u64::from));
    }
}

impl Decode for ColumnMetaData {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut meta = Self::default();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => meta.field_type = Some(field.as_u32()?),
                2 => meta.name = Some(field.as_bytes()?),
                3 => meta.original_name = Some(field.as_bytes()?),
                4 => meta.table = Some(field.as_bytes()?),
                5 => meta.original_table = Some(field.as_bytes()?),
                6 => meta.schema = Some(field.as_bytes()?),
                7 => meta.catalog = Some(field.as_bytes()?),
                8 => meta.collation = Some(field.as_u64()?),
                9 => meta.fractional_digits = Some(field.as_u32()?),
                10 => meta.length = Some(field.as_u32()?),
                11 => meta.flags = Some(field.as_u32()?),
                12 => meta.content_type = Some(field.as_u32()?),
                _ => {}
            }
        }
        Ok(meta)
    }
}

/// One result row (`RESULTSET_ROW`): raw field payloads in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    /// Encoded field values; an empty payload is SQL `NULL`.
    pub fields: Vec<Bytes>,
}

impl Encode for Row {
    fn encode(&self, dst: &mut BytesMut) {
        for field in &self.fields {
            put_bytes(dst, 1, field);
        }
    }
}

impl Decode for Row {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut row = Self::default();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            if field.number == 1 {
                row.fields.push(field.as_bytes()?);
            }
        }
        Ok(row)
    }
}

empty_message! {
    /// All rows of all result sets were sent.
    FetchDone
}

empty_message! {
    /// The cursor was suspended.
    FetchSuspended
}

empty_message! {
    /// Another result set follows.
    FetchDoneMoreResultsets
}

empty_message! {
    /// Output parameters of a stored procedure follow.
    FetchDoneMoreOutParams
}
