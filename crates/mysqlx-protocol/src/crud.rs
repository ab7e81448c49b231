//! `Mysqlx.Crud`: the `Find` message and its parts.

use bytes::{Bytes, BytesMut};

use crate::datatypes::Scalar;
use crate::error::ProtocolError;
use crate::expr::Expr;
use crate::message::{ClientMessage, ClientMessageType};
use crate::wire::{Decode, Encode, FieldReader, put_bytes, put_message, put_uint};

/// Target collection or table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    /// Collection name.
    pub name: String,
    /// Schema name.
    pub schema: Option<String>,
}

impl Encode for Collection {
    fn encode(&self, dst: &mut BytesMut) {
        put_bytes(dst, 1, self.name.as_bytes());
        if let Some(schema) = &self.schema {
            put_bytes(dst, 2, schema.as_bytes());
        }
    }
}

impl Decode for Collection {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut name = None;
        let mut schema = None;
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => name = Some(field.as_string()?),
                2 => schema = Some(field.as_string()?),
                _ => {}
            }
        }
        Ok(Self {
            name: name.ok_or(ProtocolError::MissingField {
                message: "Collection",
                field: "name",
            })?,
            schema,
        })
    }
}

/// Whether the target holds documents or relational rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DataModel {
    /// JSON documents.
    #[default]
    Document = 1,
    /// Relational rows.
    Table = 2,
}

/// A projected expression with an optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Source expression.
    pub source: Expr,
    /// Output name.
    pub alias: Option<String>,
}

impl Encode for Projection {
    fn encode(&self, dst: &mut BytesMut) {
        put_message(dst, 1, &self.source);
        if let Some(alias) = &self.alias {
            put_bytes(dst, 2, alias.as_bytes());
        }
    }
}

impl Decode for Projection {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut source = None;
        let mut alias = None;
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => source = Some(field.as_message::<Expr>()?),
                2 => alias = Some(field.as_string()?),
                _ => {}
            }
        }
        Ok(Self {
            source: source.ok_or(ProtocolError::MissingField {
                message: "Projection",
                field: "source",
            })?,
            alias,
        })
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc = 1,
    /// Descending.
    Desc = 2,
}

/// A sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// Sort expression.
    pub expr: Expr,
    /// Direction.
    pub direction: Direction,
}

impl Encode for Order {
    fn encode(&self, dst: &mut BytesMut) {
        put_message(dst, 1, &self.expr);
        put_uint(dst, 2, self.direction as u64);
    }
}

impl Decode for Order {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut expr = None;
        let mut direction = Direction::Asc;
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => expr = Some(field.as_message::<Expr>()?),
                2 => {
                    direction = match field.as_u64()? {
                        1 => Direction::Asc,
                        2 => Direction::Desc,
                        value => {
                            return Err(ProtocolError::InvalidEnumValue {
                                kind: "Order.Direction",
                                value,
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(Self {
            expr: expr.ok_or(ProtocolError::MissingField {
                message: "Order",
                field: "expr",
            })?,
            direction,
        })
    }
}

/// Row count and offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limit {
    /// Maximum number of rows.
    pub row_count: u64,
    /// Rows to skip.
    pub offset: Option<u64>,
}

impl Encode for Limit {
    fn encode(&self, dst: &mut BytesMut) {
        put_uint(dst, 1, self.row_count);
        if let Some(offset) = self.offset {
            put_uint(dst, 2, offset);
        }
    }
}

impl Decode for Limit {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut limit = Self::default();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                1 => limit.row_count = field.as_u64()?,
                2 => limit.offset = Some(field.as_u64()?),
                _ => {}
            }
        }
        Ok(limit)
    }
}

/// Row locking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RowLock {
    /// `LOCK IN SHARE MODE`.
    SharedLock = 1,
    /// `FOR UPDATE`.
    ExclusiveLock = 2,
}

/// Behavior when a row is already locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RowLockOptions {
    /// Fail immediately.
    Nowait = 1,
    /// Skip locked rows.
    SkipLocked = 2,
}

/// Document or row retrieval (`CRUD_FIND`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Find {
    /// Target.
    pub collection: Collection,
    /// Data model of the target.
    pub data_model: Option<DataModel>,
    /// Projected fields; empty means whole documents.
    pub projection: Vec<Projection>,
    /// Filter.
    pub criteria: Option<Expr>,
    /// Row limit.
    pub limit: Option<Limit>,
    /// Sort keys.
    pub order: Vec<Order>,
    /// Grouping expressions.
    pub grouping: Vec<Expr>,
    /// Filter applied after grouping.
    pub grouping_criteria: Option<Expr>,
    /// Values for placeholders, by position.
    pub args: Vec<Scalar>,
    /// Row locking mode.
    pub locking: Option<RowLock>,
    /// Row locking behavior.
    pub locking_options: Option<RowLockOptions>,
}

impl Encode for Find {
    fn encode(&self, dst: &mut BytesMut) {
        put_message(dst, 2, &self.collection);
        if let Some(model) = self.data_model {
            put_uint(dst, 3, model as u64);
        }
        for projection in &self.projection {
            put_message(dst, 4, projection);
        }
        if let Some(criteria) = &self.criteria {
            put_message(dst, 5, criteria);
        }
        if let Some(limit) = &self.limit {
            put_message(dst, 6, limit);
        }
        for order in &self.order {
            put_message(dst, 7, order);
        }
        for group in &self.grouping {
            put_message(dst, 8, group);
        }
        if let Some(having) = &self.grouping_criteria {
            put_message(dst, 9, having);
        }
        for arg in &self.args {
            put_message(dst, 11, arg);
        }
        if let Some(lock) = self.locking {
            put_uint(dst, 12, lock as u64);
        }
        if let Some(options) = self.locking_options {
            put_uint(dst, 13, options as u64);
        }
    }
}

fn enum_field<T>(value: u64, kind: &'static str, map: impl Fn(u64) -> Option<T>) -> Result<T, ProtocolError> {
    map(value).ok_or(ProtocolError::InvalidEnumValue { kind, value })
}

impl Decode for Find {
    fn decode(src: Bytes) -> Result<Self, ProtocolError> {
        let mut collection = None;
        let mut find = Self::default();
        let mut fields = FieldReader::new(src);
        while let Some(field) = fields.next_field()? {
            match field.number {
                2 => collection = Some(field.as_message::<Collection>()?),
                3 => {
                    find.data_model = Some(enum_field(field.as_u64()?, "DataModel", |v| match v {
                        1 => Some(DataModel::Document),
                        2 => Some(DataModel::Table),
                        _ => None,
                    })?);
                }
                4 => find.projection.push(field.as_message()?),
                5 => find.criteria = Some(field.as_message()?),
                6 => find.limit = Some(field.as_message()?),
                7 => find.order.push(field.as_message()?),
                8 => find.grouping.push(field.as_message()?),
                9 => find.grouping_criteria = Some(field.as_message()?),
                11 => find.args.push(field.as_message()?),
                12 => {
                    find.locking = Some(enum_field(field.as_u64()?, "Find.RowLock", |v| match v {
                        1 => Some(RowLock::SharedLock),
                        2 => Some(RowLock::ExclusiveLock),
                        _ => None,
                    })?);
                }
                13 => {
                    find.locking_options =
                        Some(enum_field(field.as_u64()?, "Find.RowLockOptions", |v| match v {
                            1 => Some(RowLockOptions::Nowait),
                            2 => Some(RowLockOptions::SkipLocked),
                            _ => None,
                        })?);
                }
                _ => {}
            }
        }
        find.collection = collection.ok_or(ProtocolError::MissingField {
            message: "Find",
            field: "collection",
        })?;
        Ok(find)
    }
}

impl ClientMessage for Find {
    const MESSAGE_TYPE: ClientMessageType = ClientMessageType::CrudFind;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::expr::{ColumnIdentifier, DocumentPathItem};

    fn path(name: &str) -> Expr {
        Expr::Identifier(ColumnIdentifier::document_path(vec![
            DocumentPathItem::Member(name.into()),
        ]))
    }

    #[test]
    fn test_find_carries_every_clause() {
        let find = Find {
            collection: Collection {
                name: "people".into(),
                schema: Some("test".into()),
            },
            data_model: Some(DataModel::Document),
            projection: vec![Projection {
                source: path("name"),
                alias: Some("n".into()),
            }],
            criteria: Some(Expr::operator(">", vec![path("age"), Expr::Placeholder(0)])),
            limit: Some(Limit {
                row_count: 10,
                offset: Some(5),
            }),
            order: vec![Order {
                expr: path("age"),
                direction: Direction::Desc,
            }],
            grouping: vec![path("city")],
            grouping_criteria: None,
            args: vec![Scalar::Sint(21)],
            locking: Some(RowLock::ExclusiveLock),
            locking_options: Some(RowLockOptions::SkipLocked),
        };
        let decoded = Find::decode(find.encode_to_bytes()).unwrap();
        assert_eq!(decoded, find);
    }

    #[test]
    fn test_find_requires_collection() {
        let mut buf = BytesMut::new();
        put_uint(&mut buf, 3, 1);
        assert!(matches!(
            Find::decode(buf.freeze()),
            Err(ProtocolError::MissingField { field: "collection", .. })
        ));
    }

    #[test]
    fn test_limit_without_offset() {
        let limit = Limit {
            row_count: 3,
            offset: None,
        };
        assert_eq!(Limit::decode(limit.encode_to_bytes()).unwrap(), limit);
    }
}
