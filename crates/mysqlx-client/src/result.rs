//! Materialized exchange results.

use std::collections::HashMap;

use bytes::Bytes;
use mysqlx_protocol::resultset::ContentType;
use mysqlx_protocol::{Any, ColumnFlags, ColumnMetaData, ErrorMessage, FieldType, ProtocolError, Scalar, Severity};
use mysqlx_types::{FromValue, TypeError, Value, decode_value};

use crate::notice::{ExecutionState, WarningNotice};

/// Error code reported when the server leaves it out (`CR_UNKNOWN_ERROR`).
pub const UNKNOWN_ERROR_CODE: u32 = 2000;

/// SQLSTATE reported when the server leaves it out.
pub const UNKNOWN_SQL_STATE: &str = "HY000";

/// Message reported when the server leaves it out.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown server error";

/// A server-reported error with defaults applied to absent fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// MySQL error code.
    pub code: u32,
    /// SQLSTATE.
    pub sql_state: String,
    /// Error message.
    pub message: String,
    /// The server is about to drop the connection.
    pub fatal: bool,
}

impl Default for ErrorInfo {
    fn default() -> Self {
        Self {
            code: UNKNOWN_ERROR_CODE,
            sql_state: UNKNOWN_SQL_STATE.to_string(),
            message: UNKNOWN_ERROR_MESSAGE.to_string(),
            fatal: false,
        }
    }
}

impl From<ErrorMessage> for ErrorInfo {
    fn from(error: ErrorMessage) -> Self {
        let defaults = Self::default();
        Self {
            code: error.code.unwrap_or(defaults.code),
            sql_state: error.sql_state.unwrap_or(defaults.sql_state),
            message: error.msg.unwrap_or(defaults.message),
            fatal: error.severity.and_then(Severity::from_u32) == Some(Severity::Fatal),
        }
    }
}

fn text(bytes: &Option<Bytes>) -> String {
    bytes
        .as_ref()
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default()
}

/// Column metadata with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Declared type.
    pub field_type: FieldType,
    /// Column alias.
    pub name: String,
    /// Column name.
    pub original_name: String,
    /// Table alias.
    pub table: String,
    /// Table name.
    pub original_table: String,
    /// Schema.
    pub schema: String,
    /// Catalog.
    pub catalog: String,
    /// Collation id; 0 when absent.
    pub collation: u64,
    /// Fractional digits hint; 0 when absent.
    pub fractional_digits: u32,
    /// Display length; 0 when absent.
    pub length: u32,
    /// Flags.
    pub flags: ColumnFlags,
    /// Raw content type hint.
    pub content_type: Option<u32>,
}

impl ColumnMeta {
    /// Build column metadata from its wire form.
    ///
    /// Fails when the type tag is missing or unknown, since no field of the
    /// column could be decoded.
    pub fn from_metadata(meta: &ColumnMetaData) -> Result<Self, ProtocolError> {
        let field_type = meta.field_type.ok_or(ProtocolError::MissingField {
            message: "ColumnMetaData",
            field: "type",
        })?;
        Ok(Self {
            field_type: FieldType::from_u32(field_type)?,
            name: text(&meta.name),
            original_name: text(&meta.original_name),
            table: text(&meta.table),
            original_table: text(&meta.original_table),
            schema: text(&meta.schema),
            catalog: text(&meta.catalog),
            collation: meta.collation.unwrap_or(0),
            fractional_digits: meta.fractional_digits.unwrap_or(0),
            length: meta.length.unwrap_or(0),
            flags: meta.column_flags(),
            content_type: meta.content_type,
        })
    }

    /// Decode one raw field of this column.
    pub fn decode(&self, raw: &[u8]) -> Result<Value, TypeError> {
        decode_value(raw, self.field_type, self.fractional_digits)
    }

    /// Check if the column holds JSON documents.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type == Some(ContentType::Json as u32)
    }

    /// Check if the column is declared `NOT NULL`.
    #[must_use]
    pub fn is_not_null(&self) -> bool {
        self.flags.contains(ColumnFlags::NOT_NULL)
    }
}

/// One fully buffered result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Columns in order.
    pub columns: Vec<ColumnMeta>,
    /// Rows; each holds one value per column.
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column with this alias.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Convert the value at `row`, `column`.
    pub fn get<T: FromValue>(&self, row: usize, column: usize) -> Result<T, TypeError> {
        let value = self
            .rows
            .get(row)
            .and_then(|r| r.get(column))
            .ok_or(TypeError::OutOfRange {
                target_type: "row/column index",
            })?;
        T::from_value(value)
    }

    /// Convert the value at `row` in the column named `name`.
    pub fn get_by_name<T: FromValue>(&self, row: usize, name: &str) -> Result<T, TypeError> {
        let column = self
            .column_index(name)
            .ok_or_else(|| TypeError::UnsupportedType(format!("no column named `{name}`")))?;
        self.get(row, column)
    }
}

/// What the server reported about a finished statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    /// `ROWS_AFFECTED`.
    pub rows_affected: u64,
    /// `GENERATED_INSERT_ID`, when reported.
    pub last_insert_id: Option<u64>,
    /// `ROWS_FOUND`.
    pub rows_found: u64,
    /// `ROWS_MATCHED`.
    pub rows_matched: u64,
    /// Warnings in arrival order.
    pub warnings: Vec<WarningNotice>,
    /// The server announced a further result set.
    pub has_more_resultsets: bool,
}

impl ExecuteSummary {
    /// Fold one execution-state change into the summary.
    pub fn record_state(&mut self, state: ExecutionState, value: u64) {
        match state {
            ExecutionState::GeneratedInsertId => self.last_insert_id = Some(value),
            ExecutionState::RowsAffected => self.rows_affected = value,
            ExecutionState::RowsFound => self.rows_found = value,
            ExecutionState::RowsMatched => self.rows_matched = value,
        }
    }
}

/// Outcome of a buffered statement: every result set plus the summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteResult {
    /// Result sets in order. Statements without rows produce none.
    pub result_sets: Vec<ResultSet>,
    /// Execution summary.
    pub summary: ExecuteSummary,
}

impl ExecuteResult {
    /// The first result set, if any.
    #[must_use]
    pub fn first(&self) -> Option<&ResultSet> {
        self.result_sets.first()
    }

    /// Take the first result set, or an empty one.
    #[must_use]
    pub fn into_first(self) -> ResultSet {
        self.result_sets.into_iter().next().unwrap_or_default()
    }
}

/// A materialized capability value.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityValue {
    /// A single scalar.
    Scalar(Scalar),
    /// Named members.
    Object(Vec<(String, CapabilityValue)>),
    /// Ordered members.
    Array(Vec<CapabilityValue>),
}

impl CapabilityValue {
    /// Borrow the scalar, if this is one.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Text of a string or octets scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    /// Texts of an array of string scalars, such as
    /// `authentication.mechanisms`.
    #[must_use]
    pub fn as_str_list(&self) -> Option<Vec<&str>> {
        match self {
            Self::Array(items) => items.iter().map(Self::as_str).collect(),
            _ => None,
        }
    }
}

impl From<Any> for CapabilityValue {
    fn from(value: Any) -> Self {
        match value {
            Any::Scalar(s) => Self::Scalar(s),
            Any::Object(fields) => Self::Object(
                fields
                    .into_iter()
                    .map(|f| (f.key, Self::from(f.value)))
                    .collect(),
            ),
            Any::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
        }
    }
}

/// Capabilities by name.
pub type CapabilityMap = HashMap<String, CapabilityValue>;
