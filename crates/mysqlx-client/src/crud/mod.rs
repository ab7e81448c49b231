//! CRUD command builders.
//!
//! [`CollectionFind`] accumulates the clauses of a document query and
//! turns them into a `Crud.Find` message on [`CollectionFind::finalize`].
//! Clause strings use the X DevAPI expression language; see [`parser`].
//!
//! Every clause setter validates its input before touching the builder: a
//! rejected call leaves the builder exactly as it was.

pub mod argument;
pub mod find;
pub mod parser;

use thiserror::Error;

pub use argument::{Argument, expression};
pub use find::{CollectionFind, LockWait};
pub use parser::{ExprParser, Placeholders};

/// Builder misuse (typed parameter errors).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrudError {
    /// An argument had the wrong shape.
    #[error("{operation}: expected {expected}, got {actual}")]
    InvalidArgumentType {
        /// Builder operation.
        operation: &'static str,
        /// Accepted shapes.
        expected: &'static str,
        /// Shape received.
        actual: &'static str,
    },

    /// A count or position was negative.
    #[error("{operation}: value must not be negative, got {value}")]
    NegativeValue {
        /// Builder operation.
        operation: &'static str,
        /// Value received.
        value: i64,
    },

    /// A clause failed to parse.
    #[error("expression syntax error at {position}: {message}")]
    ExpressionSyntax {
        /// Byte offset into the clause text.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// A placeholder value could not be bound.
    #[error("cannot bind '{name}': {reason}")]
    InvalidBinding {
        /// Placeholder name.
        name: String,
        /// Why.
        reason: String,
    },

    /// A clause references a placeholder that has no bound value.
    #[error("placeholder '{0}' has no bound value")]
    UnboundPlaceholder(String),

    /// A value was bound to a placeholder that no clause references.
    #[error("bound value '{0}' is not referenced by any clause")]
    UnusedBinding(String),

    /// The builder has no target collection.
    #[error("find operation is not initialized")]
    Uninitialized,
}

impl CrudError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::ExpressionSyntax {
            position,
            message: message.into(),
        }
    }
}
