//! `Mysqlx.Expr`: expression trees carried by CRUD messages.

use bytes::{Bytes, BytesMut};

use crate::datatypes::Scalar;
use crate::error::ProtocolError;
use crate::wire::{Decode, Encode, FieldReader, put_bytes, put_message, put_uint};

/// One step of a document path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentPathItem {
    /// `.name`
    Member(String),
    /// `.*`
    MemberAsterisk,
    /// `[n]`
    ArrayIndex(u32),
    /// `[*]`
    ArrayIndexAsterisk,
    /// `**`
    DoubleAsterisk,
}

impl Encode for DocumentPathItem {
    fn encode(&self, dst: &mut BytesMut) {
        match self {
            Self::Member(name) => {
                put_uint(dst, 1, 1);
                put_bytes(dst, 2, name.as_bytes());
            }
            Self::MemberAsterisk => put_uint(dst, 1, 2),
            Self::ArrayIndex(index) => {
                put_uint(dst, 1, 3);
                put_uint(dst, 3, u64::from(*index));
            }
            Self::ArrayIndexAsterisk => put_uint(dst, 1, 4),
            Self::DoubleAsterisk => put_uint(dst, 1, 5),
        }
    }
}

impl Decode for DocumentPathItem {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut item_type = None;
        let mut value = None;
        let mut index = None;
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => item_type = Some(field.as_u64()?),
                2 => value = Some(field.as_string()?),
                3 => index = Some(field.as_u32()?),
                _ => {}
            }
        }
        let missing = |field| ProtocolError::MissingField {
            message: "DocumentPathItem",
            field,
        };
        match item_type.ok_or(missing("type"))? {
            1 => value.map(Self::Member).ok_or(missing("value")),
            2 => Ok(Self::MemberAsterisk),
            3 => index.map(Self::ArrayIndex).ok_or(missing("index")),
            4 => Ok(Self::ArrayIndexAsterisk),
            5 => Ok(Self::DoubleAsterisk),
            other => Err(ProtocolError::InvalidEnumValue {
                kind: "DocumentPathItem.Type",
                value: other,
            }),
        }
    }
}

/// A column or document-path reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnIdentifier {
    /// Path into a document column.
    pub document_path: Vec<DocumentPathItem>,
    /// Column name.
    pub name: Option<String>,
    /// Table name.
    pub table_name: Option<String>,
    /// Schema name.
    pub schema_name: Option<String>,
}

impl ColumnIdentifier {
    /// A reference to a path inside the row's document.
    #[must_use]
    pub fn document_path(path: Vec<DocumentPathItem>) -> Self {
        Self {
            document_path: path,
            ..Self::default()
        }
    }
}

impl Encode for ColumnIdentifier {
    fn encode(&self, dst: &mut BytesMut) {
        for item in &self.document_path {
            put_message(dst, 1, item);
        }
        if let Some(name) = &self.name {
            put_bytes(dst, 2, name.as_bytes());
        }
        if let Some(table) = &self.table_name {
            put_bytes(dst, 3, table.as_bytes());
        }
        if let Some(schema) = &self.schema_name {
            put_bytes(dst, 4, schema.as_bytes());
        }
    }
}

impl Decode for ColumnIdentifier {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut ident = Self::default();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => ident.document_path.push(field.as_message()?),
                2 => ident.name = Some(field.as_string()?),
                3 => ident.table_name = Some(field.as_string()?),
                4 => ident.schema_name = Some(field.as_string()?),
                _ => {}
            }
        }
        Ok(ident)
    }
}

/// A possibly schema-qualified function name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifier {
    /// Function name.
    pub name: String,
    /// Schema qualifier.
    pub schema_name: Option<String>,
}

impl Encode for Identifier {
    fn encode(&self, dst: &mut BytesMut) {
        put_bytes(dst, 1, self.name.as_bytes());
        if let Some(schema) = &self.schema_name {
            put_bytes(dst, 2, schema.as_bytes());
        }
    }
}

impl Decode for Identifier {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut name = None;
        let mut schema_name = None;
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => name = Some(field.as_string()?),
                2 => schema_name = Some(field.as_string()?),
                _ => {}
            }
        }
        Ok(Self {
            name: name.ok_or(ProtocolError::MissingField {
                message: "Identifier",
                field: "name",
            })?,
            schema_name,
        })
    }
}

/// A function call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Function name.
    pub name: Identifier,
    /// Arguments.
    pub params: Vec<Expr>,
}

/// An operator applied to its operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    /// Operator name (`==`, `&&`, `in`, `like`, `cast`, ...).
    pub name: String,
    /// Operands.
    pub params: Vec<Expr>,
}

/// A key/value pair of an object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprObjectField {
    /// Key.
    pub key: String,
    /// Value expression.
    pub value: Expr,
}

/// An expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column or document field reference.
    Identifier(ColumnIdentifier),
    /// Literal value.
    Literal(Scalar),
    /// Session variable reference.
    Variable(String),
    /// Function call.
    FunctionCall(FunctionCall),
    /// Operator application.
    Operator(Operator),
    /// Positional placeholder, resolved against the message's `args`.
    Placeholder(u32),
    /// Object literal.
    Object(Vec<ExprObjectField>),
    /// Array literal.
    Array(Vec<Expr>),
}

impl Expr {
    /// Build an operator node.
    pub fn operator(name: impl Into<String>, params: Vec<Expr>) -> Self {
        Self::Operator(Operator {
            name: name.into(),
            params,
        })
    }

    /// Visit every placeholder position in this tree, depth first.
    pub fn for_each_placeholder(&self, f: &mut impl FnMut(u32)) {
        match self {
            Self::Placeholder(position) => f(*position),
            Self::FunctionCall(call) => call.params.iter().for_each(|p| p.for_each_placeholder(f)),
            Self::Operator(op) => op.params.iter().for_each(|p| p.for_each_placeholder(f)),
            Self::Object(fields) => fields.iter().for_each(|fld| fld.value.for_each_placeholder(f)),
            Self::Array(values) => values.iter().for_each(|v| v.for_each_placeholder(f)),
            Self::Identifier(_) | Self::Literal(_) | Self::Variable(_) => {}
        }
    }

    fn type_tag(&self) -> u64 {
        match self {
            Self::Identifier(_) => 1,
            Self::Literal(_) => 2,
            Self::Variable(_) => 3,
            Self::FunctionCall(_) => 4,
            Self::Operator(_) => 5,
            Self::Placeholder(_) => 6,
            Self::Object(_) => 7,
            Self::Array(_) => 8,
        }
    }
}

struct ParamList<'a>(&'a str, &'a [Expr], Option<&'a Identifier>);

impl Encode for ParamList<'_> {
    fn encode(&self, dst: &mut BytesMut) {
        match self.2 {
            Some(ident) => put_message(dst, 1, ident),
            None => put_bytes(dst, 1, self.0.as_bytes()),
        }
        for param in self.1 {
            put_message(dst, 2, param);
        }
    }
}

struct ObjectBody<'a>(&'a [ExprObjectField]);

impl Encode for ObjectBody<'_> {
    fn encode(&self, dst: &mut BytesMut) {
        for fld in self.0 {
            let mut body = BytesMut::new();
            put_bytes(&mut body, 1, fld.key.as_bytes());
            put_message(&mut body, 2, &fld.value);
            put_bytes(dst, 1, &body);
        }
    }
}

struct ArrayBody<'a>(&'a [Expr]);

impl Encode for ArrayBody<'_> {
    fn encode(&self, dst: &mut BytesMut) {
        for value in self.0 {
            put_message(dst, 1, value);
        }
    }
}

impl Encode for Expr {
    fn encode(&self, dst: &mut BytesMut) {
        put_uint(dst, 1, self.type_tag());
        match self {
            Self::Identifier(ident) => put_message(dst, 2, ident),
            Self::Variable(name) => put_bytes(dst, 3, name.as_bytes()),
            Self::Literal(scalar) => put_message(dst, 4, scalar),
            Self::FunctionCall(call) => {
                put_message(dst, 5, &ParamList("", &call.params, Some(&call.name)));
            }
            Self::Operator(op) => put_message(dst, 6, &ParamList(&op.name, &op.params, None)),
            Self::Placeholder(position) => put_uint(dst, 7, u64::from(*position)),
            Self::Object(fields) => put_message(dst, 8, &ObjectBody(fields)),
            Self::Array(values) => put_message(dst, 9, &ArrayBody(values)),
        }
    }
}

fn decode_call(src: Bytes) -> Result<FunctionCall, ProtocolError> {
    let mut name = None;
    let mut params = Vec::new();
    let mut fields = FieldReader::new(src);
    while let Some(field) = fields.next_field()? {
        match field.number {
            1 => name = Some(field.as_message::<Identifier>()?),
            2 => params.push(field.as_message::<Expr>()?),
            _ => {}
        }
    }
    Ok(FunctionCall {
        name: name.ok_or(ProtocolError::MissingField {
            message: "FunctionCall",
            field: "name",
        })?,
        params,
    })
}

fn decode_operator(src: Bytes) -> Result<Operator, ProtocolError> {
    let mut name = None;
    let mut params = Vec::new();
    let mut fields = FieldReader::new(src);
    while let Some(field) = fields.next_field()? {
        match field.number {
            1 => name = Some(field.as_string()?),
            2 => params.push(field.as_message::<Expr>()?),
            _ => {}
        }
    }
    Ok(Operator {
        name: name.ok_or(ProtocolError::MissingField {
            message: "Operator",
            field: "name",
        })?,
        params,
    })
}

fn decode_object(src: Bytes) -> Result<Vec<ExprObjectField>, ProtocolError> {
    let mut out = Vec::new();
    let mut fields = FieldReader::new(src);
    while let Some(field) = fields.next_field()? {
        if field.number != 1 {
            continue;
        }
        let mut key = None;
        let mut value = None;
        let mut inner = FieldReader::new(field.as_bytes()?);
        while let Some(f) = inner.next_field()? {
            match f.number {
                1 => key = Some(f.as_string()?),
                2 => value = Some(f.as_message::<Expr>()?),
                _ => {}
            }
        }
        let missing = |field| ProtocolError::MissingField {
            message: "Expr.Object.ObjectField",
            field,
        };
        out.push(ExprObjectField {
            key: key.ok_or(missing("key"))?,
            value: value.ok_or(missing("value"))?,
        });
    }
    Ok(out)
}

fn decode_array(src: Bytes) -> Result<Vec<Expr>, ProtocolError> {
    let mut out = Vec::new();
    let mut fields = FieldReader::new(src);
    while let Some(field) = fields.next_field()? {
        if field.number == 1 {
            out.push(field.as_message::<Expr>()?);
        }
    }
    Ok(out)
}

impl Decode for Expr {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut expr_type = None;
        let mut body = None;
        let mut placeholder = None;
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => expr_type = Some(field.as_u64()?),
                7 => placeholder = Some(field.as_u32()?),
                2..=6 | 8 | 9 => body = Some(field),
                _ => {}
            }
        }
        let missing = |field| ProtocolError::MissingField {
            message: "Expr",
            field,
        };
        let expr_type = expr_type.ok_or(missing("type"))?;
        if expr_type == 6 {
            return placeholder.map(Self::Placeholder).ok_or(missing("position"));
        }
        let body = body.ok_or(missing("body"))?;
        match (expr_type, body.number) {
            (1, 2) => Ok(Self::Identifier(body.as_message()?)),
            (2, 4) => Ok(Self::Literal(body.as_message()?)),
            (3, 3) => Ok(Self::Variable(body.as_string()?)),
            (4, 5) => Ok(Self::FunctionCall(decode_call(body.as_bytes()?)?)),
            (5, 6) => Ok(Self::Operator(decode_operator(body.as_bytes()?)?)),
            (7, 8) => Ok(Self::Object(decode_object(body.as_bytes()?)?)),
            (8, 9) => Ok(Self::Array(decode_array(body.as_bytes()?)?)),
            (value, _) => Err(ProtocolError::InvalidEnumValue {
                kind: "Expr.Type",
                value,
            }),
        }
    }
}
