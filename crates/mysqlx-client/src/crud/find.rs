//! `Collection.find()`: the document query builder.

use std::collections::BTreeMap;

use mysqlx_protocol::{
    Collection, DataModel, Expr, Find, Limit, Order, Projection, RowLock, RowLockOptions, Scalar,
};
use mysqlx_types::ToScalar;

use super::argument::Argument;
use super::parser::{ExprParser, Placeholders};
use super::CrudError;

type Result<T> = std::result::Result<T, CrudError>;

/// What to do when a row to be locked is already locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockWait {
    /// Wait for the lock.
    #[default]
    Default,
    /// Fail immediately.
    NoWait,
    /// Leave locked rows out of the result.
    SkipLocked,
}

impl LockWait {
    fn options(self) -> Option<RowLockOptions> {
        match self {
            Self::Default => None,
            Self::NoWait => Some(RowLockOptions::Nowait),
            Self::SkipLocked => Some(RowLockOptions::SkipLocked),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FieldClause {
    text: String,
    is_expression: bool,
}

impl FieldClause {
    fn parse(&self, placeholders: &mut Placeholders) -> Result<Vec<Projection>> {
        let parser = ExprParser::new(&self.text, placeholders)?;
        if self.is_expression {
            parser.parse_document_projection()
        } else {
            parser.parse_projection_list()
        }
    }
}

/// Builds a `Crud.Find` over a document collection.
///
/// Clause text is validated when it is set; placeholders are numbered
/// when the message is built, in clause order: criteria, fields, sort,
/// grouping, having.
///
/// # Example
///
/// ```rust
/// use mysqlx_client::crud::{CollectionFind, LockWait};
///
/// # fn main() -> Result<(), mysqlx_client::crud::CrudError> {
/// let mut find = CollectionFind::new("shop", "orders");
/// find.criteria("status == :status AND total > :min")?
///     .fields(["id", "total"])?
///     .sort(["total DESC"])?
///     .limit(10)?
///     .bind([("status", "open")])?
///     .bind([("min", 100)])?
///     .lock_shared(LockWait::NoWait);
/// let message = find.finalize()?;
/// assert_eq!(message.args.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CollectionFind {
    collection: Collection,
    criteria: Option<String>,
    fields: Vec<FieldClause>,
    sort: Vec<String>,
    grouping: Vec<String>,
    having: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    bindings: BTreeMap<String, Scalar>,
    lock: Option<(RowLock, LockWait)>,
}

impl CollectionFind {
    /// Start a query on `schema.collection`.
    pub fn new(schema: impl Into<String>, collection: impl Into<String>) -> Self {
        let schema = schema.into();
        Self {
            collection: Collection {
                name: collection.into(),
                schema: (!schema.is_empty()).then_some(schema),
            },
            criteria: None,
            fields: Vec::new(),
            sort: Vec::new(),
            grouping: Vec::new(),
            having: None,
            limit: None,
            offset: None,
            bindings: BTreeMap::new(),
            lock: None,
        }
    }

    /// Target collection.
    #[must_use]
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Row limit, if set.
    #[must_use]
    pub fn current_limit(&self) -> Option<u64> {
        self.limit
    }

    /// Row offset, if set.
    #[must_use]
    pub fn current_offset(&self) -> Option<u64> {
        self.offset
    }

    /// Set the search condition.
    pub fn criteria(&mut self, condition: &str) -> Result<&mut Self> {
        validate(condition, |p| p.parse_expr().map(drop))?;
        self.criteria = Some(condition.to_string());
        Ok(self)
    }

    /// Add projected fields.
    ///
    /// Accepts a projection list (`"name, age AS years"`), a list of them,
    /// or an [expression](super::expression) whose object literal keys
    /// become the projected names. A list with any element that is not a
    /// string or expression is rejected as a whole.
    pub fn fields(&mut self, projection: impl Into<Argument>) -> Result<&mut Self> {
        let projection = projection.into();
        let clauses = match projection {
            Argument::String(text) => vec![FieldClause {
                text,
                is_expression: false,
            }],
            Argument::Expression(text) => vec![FieldClause {
                text,
                is_expression: true,
            }],
            Argument::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Argument::String(text) => Ok(FieldClause {
                        text,
                        is_expression: false,
                    }),
                    Argument::Expression(text) => Ok(FieldClause {
                        text,
                        is_expression: true,
                    }),
                    other => Err(CrudError::InvalidArgumentType {
                        operation: "fields",
                        expected: "string or expression",
                        actual: other.kind(),
                    }),
                })
                .collect::<Result<Vec<_>>>()?,
            other => {
                return Err(CrudError::InvalidArgumentType {
                    operation: "fields",
                    expected: "string, list or expression",
                    actual: other.kind(),
                });
            }
        };
        for clause in &clauses {
            clause.parse(&mut Placeholders::new())?;
        }
        self.fields.extend(clauses);
        Ok(self)
    }

    /// Add sort keys (`"field [ASC|DESC]"`).
    ///
    /// Each argument is a string, an expression or a list of strings.
    pub fn sort<I>(&mut self, keys: I) -> Result<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<Argument>,
    {
        let keys = collect_clauses("sort", keys)?;
        for key in &keys {
            validate(key, |p| p.parse_order_list().map(drop))?;
        }
        self.sort.extend(keys);
        Ok(self)
    }

    /// Add grouping expressions.
    pub fn group_by<I>(&mut self, keys: I) -> Result<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<Argument>,
    {
        tracing::warn!("group_by is deprecated");
        let keys = collect_clauses("group_by", keys)?;
        for key in &keys {
            validate(key, |p| p.parse_expr_list().map(drop))?;
        }
        self.grouping.extend(keys);
        Ok(self)
    }

    /// Set the condition applied after grouping.
    pub fn having(&mut self, condition: &str) -> Result<&mut Self> {
        tracing::warn!("having is deprecated");
        validate(condition, |p| p.parse_expr().map(drop))?;
        self.having = Some(condition.to_string());
        Ok(self)
    }

    /// Return at most `rows` documents.
    pub fn limit(&mut self, rows: i64) -> Result<&mut Self> {
        self.limit = Some(non_negative("limit", rows)?);
        Ok(self)
    }

    /// Skip the first `position` documents.
    pub fn offset(&mut self, position: i64) -> Result<&mut Self> {
        self.offset = Some(non_negative("offset", position)?);
        Ok(self)
    }

    /// Bind placeholder values by name.
    ///
    /// Pairs are bound in order. The first invalid pair stops the call;
    /// pairs before it stay bound.
    pub fn bind<I, K, V>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToScalar,
    {
        for (name, value) in values {
            let name = name.into();
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(CrudError::InvalidBinding {
                    name,
                    reason: "not a valid placeholder name".to_string(),
                });
            }
            let scalar = match value.to_scalar() {
                Ok(scalar) => scalar,
                Err(e) => {
                    return Err(CrudError::InvalidBinding {
                        name,
                        reason: e.to_string(),
                    });
                }
            };
            tracing::trace!(name = %name, "bound placeholder");
            self.bindings.insert(name, scalar);
        }
        Ok(self)
    }

    /// Lock matching documents for reading.
    pub fn lock_shared(&mut self, wait: LockWait) -> &mut Self {
        self.lock = Some((RowLock::SharedLock, wait));
        self
    }

    /// Lock matching documents for writing.
    pub fn lock_exclusive(&mut self, wait: LockWait) -> &mut Self {
        self.lock = Some((RowLock::ExclusiveLock, wait));
        self
    }

    /// Build the `Crud.Find` message.
    ///
    /// Can be called any number of times; the builder is not changed.
    /// Fails if the builder has no collection, if a referenced placeholder
    /// has no value, or if a bound value is not referenced by any clause.
    pub fn finalize(&self) -> Result<Find> {
        if self.collection.name.is_empty() {
            return Err(CrudError::Uninitialized);
        }

        let mut placeholders = Placeholders::new();
        let criteria = match &self.criteria {
            Some(text) => Some(ExprParser::new(text, &mut placeholders)?.parse_expr()?),
            None => None,
        };
        let mut projection = Vec::new();
        for clause in &self.fields {
            projection.extend(clause.parse(&mut placeholders)?);
        }
        let mut order: Vec<Order> = Vec::new();
        for key in &self.sort {
            order.extend(ExprParser::new(key, &mut placeholders)?.parse_order_list()?);
        }
        let mut grouping: Vec<Expr> = Vec::new();
        for key in &self.grouping {
            grouping.extend(ExprParser::new(key, &mut placeholders)?.parse_expr_list()?);
        }
        let grouping_criteria = match &self.having {
            Some(text) => Some(ExprParser::new(text, &mut placeholders)?.parse_expr()?),
            None => None,
        };

        let args = placeholders
            .names()
            .iter()
            .map(|name| {
                self.bindings
                    .get(name)
                    .cloned()
                    .ok_or_else(|| CrudError::UnboundPlaceholder(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(unused) = self.bindings.keys().find(|name| !placeholders.contains(name)) {
            return Err(CrudError::UnusedBinding(unused.clone()));
        }

        let limit = match (self.limit, self.offset) {
            (None, None) => None,
            (Some(row_count), offset) => Some(Limit { row_count, offset }),
            // Offset alone: no upper bound on rows.
            (None, Some(offset)) => Some(Limit {
                row_count: u64::MAX,
                offset: Some(offset),
            }),
        };

        tracing::debug!(
            collection = %self.collection.name,
            placeholders = args.len(),
            projections = projection.len(),
            "finalized find"
        );

        Ok(Find {
            collection: self.collection.clone(),
            data_model: Some(DataModel::Document),
            projection,
            criteria,
            limit,
            order,
            grouping,
            grouping_criteria,
            args,
            locking: self.lock.map(|(mode, _)| mode),
            locking_options: self.lock.and_then(|(_, wait)| wait.options()),
        })
    }
}

fn validate(
    text: &str,
    parse: impl FnOnce(ExprParser<'_, '_>) -> Result<()>,
) -> Result<()> {
    let mut scratch = Placeholders::new();
    parse(ExprParser::new(text, &mut scratch)?)
}

fn non_negative(operation: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| CrudError::NegativeValue { operation, value })
}

/// Flatten variadic clause arguments: strings, expressions or lists of
/// strings. Nothing is returned unless every argument conforms.
fn collect_clauses<I>(operation: &'static str, args: I) -> Result<Vec<String>>
where
    I: IntoIterator,
    I::Item: Into<Argument>,
{
    let mut out = Vec::new();
    for arg in args {
        match arg.into() {
            Argument::String(text) | Argument::Expression(text) => out.push(text),
            Argument::List(items) => {
                for item in items {
                    match item {
                        Argument::String(text) => out.push(text),
                        other => {
                            return Err(CrudError::InvalidArgumentType {
                                operation,
                                expected: "string",
                                actual: other.kind(),
                            });
                        }
                    }
                }
            }
            other => {
                return Err(CrudError::InvalidArgumentType {
                    operation,
                    expected: "string, expression or list of strings",
                    actual: other.kind(),
                });
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::crud::expression;
    use mysqlx_protocol::{ColumnIdentifier, Direction, DocumentPathItem};

    fn field(name: &str) -> Expr {
        Expr::Identifier(ColumnIdentifier::document_path(vec![DocumentPathItem::Member(
            name.to_string(),
        )]))
    }

    #[test]
    fn test_negative_limit_leaves_state() {
        let mut find = CollectionFind::new("s", "c");
        let err = find.limit(-1).unwrap_err();
        assert_eq!(
            err,
            CrudError::NegativeValue {
                operation: "limit",
                value: -1
            }
        );
        assert_eq!(find.current_limit(), None);

        find.limit(5).unwrap();
        assert!(find.offset(-3).is_err());
        assert!(find.limit(-2).is_err());
        assert_eq!(find.current_limit(), Some(5));
        assert_eq!(find.current_offset(), None);
    }

    #[test]
    fn test_limit_and_offset_in_message() {
        let mut find = CollectionFind::new("s", "c");
        find.offset(20).unwrap();
        assert_eq!(
            find.finalize().unwrap().limit,
            Some(Limit {
                row_count: u64::MAX,
                offset: Some(20)
            })
        );
        find.limit(0).unwrap();
        assert_eq!(
            find.finalize().unwrap().limit,
            Some(Limit {
                row_count: 0,
                offset: Some(20)
            })
        );
    }

    #[test]
    fn test_fields_list_is_all_or_nothing() {
        let mut find = CollectionFind::new("s", "c");
        let err = find
            .fields(Argument::List(vec!["a".into(), "b".into(), Argument::Int(3)]))
            .unwrap_err();
        assert!(matches!(
            err,
            CrudError::InvalidArgumentType {
                operation: "fields",
                actual: "integer",
                ..
            }
        ));
        assert!(find.finalize().unwrap().projection.is_empty());

        assert!(matches!(
            find.fields(Argument::Bool(true)),
            Err(CrudError::InvalidArgumentType { .. })
        ));
        assert!(matches!(
            find.fields(["a", "b +"]),
            Err(CrudError::ExpressionSyntax { .. })
        ));
        assert!(find.finalize().unwrap().projection.is_empty());

        find.fields(["a", "b AS bee"]).unwrap();
        let projection = find.finalize().unwrap().projection;
        assert_eq!(projection.len(), 2);
        assert_eq!(projection[1].alias.as_deref(), Some("bee"));
    }

    #[test]
    fn test_expression_fields_project_object_keys() {
        let mut find = CollectionFind::new("s", "c");
        find.fields(expression(r#"{"who": name, "n": 1}"#)).unwrap();
        let projection = find.finalize().unwrap().projection;
        assert_eq!(projection[0].alias.as_deref(), Some("who"));
        assert_eq!(projection[0].source, field("name"));
        assert_eq!(projection[1].alias.as_deref(), Some("n"));
    }

    #[test]
    fn test_sort_and_group_by() {
        let mut find = CollectionFind::new("s", "c");
        find.sort([Argument::from("a DESC"), Argument::from(vec!["b", "c ASC"])])
            .unwrap();
        let err = find
            .sort([Argument::from("d"), Argument::from(vec![Argument::Null])])
            .unwrap_err();
        assert!(matches!(err, CrudError::InvalidArgumentType { operation: "sort", .. }));
        assert!(find.sort([Argument::Float(1.0)]).is_err());

        find.group_by(["a, b"]).unwrap().having("count(*) > 1").unwrap();
        let message = find.finalize().unwrap();
        let directions: Vec<_> = message.order.iter().map(|o| o.direction).collect();
        assert_eq!(directions, vec![Direction::Desc, Direction::Asc, Direction::Asc]);
        assert_eq!(message.grouping, vec![field("a"), field("b")]);
        assert!(message.grouping_criteria.is_some());
    }

    #[test]
    fn test_bind_resolves_placeholders_in_clause_order() {
        let mut find = CollectionFind::new("s", "c");
        find.having(":late > 0")
            .unwrap()
            .criteria("a == :first AND b == :late")
            .unwrap()
            .bind([("late", 2), ("first", 1)])
            .unwrap();
        let message = find.finalize().unwrap();
        // Criteria registers first, then having.
        assert_eq!(message.args, vec![Scalar::Sint(1), Scalar::Sint(2)]);
        assert_eq!(message.grouping_criteria, Some(Expr::operator(">", vec![
            Expr::Placeholder(1),
            Expr::Literal(Scalar::Sint(0)),
        ])));
        // Idempotent.
        assert_eq!(find.finalize().unwrap(), message);
    }

    #[test]
    fn test_bind_failures() {
        let mut find = CollectionFind::new("s", "c");
        find.criteria("a == :a").unwrap();
        assert_eq!(find.finalize().unwrap_err(), CrudError::UnboundPlaceholder("a".into()));

        let err = find.bind([("a", 1), ("not valid", 2), ("c", 3)]).unwrap_err();
        assert!(matches!(err, CrudError::InvalidBinding { ref name, .. } if name == "not valid"));
        // "a" was bound before the failure; "c" never was.
        assert!(find.finalize().is_ok());

        find.bind([("extra", "x")]).unwrap();
        assert_eq!(find.finalize().unwrap_err(), CrudError::UnusedBinding("extra".into()));
    }

    #[test]
    fn test_locking() {
        let mut find = CollectionFind::new("s", "c");
        find.lock_shared(LockWait::Default);
        let message = find.finalize().unwrap();
        assert_eq!(message.locking, Some(RowLock::SharedLock));
        assert_eq!(message.locking_options, None);

        find.lock_exclusive(LockWait::SkipLocked);
        let message = find.finalize().unwrap();
        assert_eq!(message.locking, Some(RowLock::ExclusiveLock));
        assert_eq!(message.locking_options, Some(RowLockOptions::SkipLocked));
    }

    #[test]
    fn test_uninitialized_and_target() {
        assert_eq!(
            CollectionFind::new("s", "").finalize().unwrap_err(),
            CrudError::Uninitialized
        );
        let message = CollectionFind::new("", "c").finalize().unwrap();
        assert_eq!(message.collection.schema, None);
        assert_eq!(message.data_model, Some(DataModel::Document));
    }

    #[test]
    fn test_criteria_syntax_error_keeps_previous() {
        let mut find = CollectionFind::new("s", "c");
        find.criteria("a > 1").unwrap();
        assert!(find.criteria("a >").is_err());
        assert_eq!(
            find.finalize().unwrap().criteria,
            Some(Expr::operator(">", vec![field("a"), Expr::Literal(Scalar::Sint(1))]))
        );
    }
}
