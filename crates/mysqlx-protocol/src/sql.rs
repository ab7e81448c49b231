//! `Mysqlx.Sql`: statement execution.

use bytes::{Bytes, BytesMut};

use crate::datatypes::Any;
use crate::error::ProtocolError;
use crate::message::{ClientMessage, ClientMessageType};
use crate::wire::{Decode, Encode, FieldReader, put_bool, put_bytes, put_message};

/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "sql";

/// Execute a statement in a namespace (`sql`, `mysqlx`, `xplugin`).
#[derive(Debug, Clone, PartialEq)]
pub struct StmtExecute {
    /// Statement namespace.
    pub namespace: String,
    /// Statement text.
    pub stmt: Bytes,
    /// Positional arguments.
    pub args: Vec<Any>,
    /// Ask the server to send only type and name in column metadata.
    pub compact_metadata: bool,
}

impl StmtExecute {
    /// A `sql` namespace statement without arguments.
    pub fn sql(stmt: impl Into<String>) -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            stmt: Bytes::from(stmt.into()),
            args: Vec::new(),
            compact_metadata: false,
        }
    }

    /// Replace the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Append a positional argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<Any>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Request compact metadata.
    #[must_use]
    pub fn with_compact_metadata(mut self, compact: bool) -> Self {
        self.compact_metadata = compact;
        self
    }
}

impl Encode for StmtExecute {
    fn encode(&self, dst: &mut BytesMut) {
        put_bytes(dst, 1, &self.stmt);
        for arg in &self.args {
            put_message(dst, 2, arg);
        }
        put_bytes(dst, 3, self.namespace.as_bytes());
        if self.compact_metadata {
            put_bool(dst, 4, true);
        }
    }
}

impl Decode for StmtExecute {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut stmt = None;
        let mut request = Self::sql(String::new());
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => stmt = Some(field.as_bytes()?),
                2 => request.args.push(field.as_message::<Any>()?),
                3 => request.namespace = field.as_string()?,
                4 => request.compact_metadata = field.as_bool()?,
                _ => {}
            }
        }
        request.stmt = stmt.ok_or(ProtocolError::MissingField {
            message: "StmtExecute",
            field: "stmt",
        })?;
        Ok(request)
    }
}

impl ClientMessage for StmtExecute {
    const MESSAGE_TYPE: ClientMessageType = ClientMessageType::SqlStmtExecute;
}

empty_message! {
    /// Statement finished successfully (`SQL_STMT_EXECUTE_OK`).
    StmtExecuteOk
}
