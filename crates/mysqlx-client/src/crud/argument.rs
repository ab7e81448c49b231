//! Loosely typed clause arguments.
//!
//! Clause setters accept values the way scripting callers pass them: a
//! string, a list, or a string flagged as an expression. Everything else
//! is representable so that it can be rejected with a typed error.

/// A clause argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Clause text.
    String(String),
    /// Clause text flagged as a single expression.
    Expression(String),
    /// A list of arguments.
    List(Vec<Argument>),
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// No value.
    Null,
}

/// Flag `text` as an expression.
pub fn expression(text: impl Into<String>) -> Argument {
    Argument::Expression(text.into())
}

impl Argument {
    /// Shape name used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Expression(_) => "expression",
            Self::List(_) => "list",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Null => "null",
        }
    }

    /// Text of a string or expression argument.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Expression(s) => Some(s),
            _ => None,
        }
    }

    /// Check whether this argument carries the expression flag.
    #[must_use]
    pub fn is_expression(&self) -> bool {
        matches!(self, Self::Expression(_))
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Argument {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Argument {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Argument {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<Argument>> From<Vec<T>> for Argument {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Argument>, const N: usize> From<[T; N]> for Argument {
    fn from(values: [T; N]) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Argument>> From<Option<T>> for Argument {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
