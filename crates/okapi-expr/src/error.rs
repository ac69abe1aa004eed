//! Error types for expression parsing and evaluation.

use thiserror::Error;

use crate::ast::Span;
use crate::value::DataType;

/// Result type for expression operations.
pub type ExprResult<T> = Result<T, ExprError>;

/// Errors raised while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// The source is empty or whitespace only.
    #[error("empty expression")]
    Empty,

    /// The source could not be lexed or parsed.
    #[error("syntax error at {span:?}: {message}")]
    Syntax {
        /// Byte range of the problem in the expression source.
        span: Span,
        /// Description of what was expected.
        message: String,
    },

    /// A variable was referenced that the context does not define.
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    /// An operator was applied to values of the wrong type.
    #[error("cannot apply '{op}' to {lhs} and {rhs}")]
    TypeMismatch {
        /// Operator text.
        op: String,
        /// Left (or only) operand type.
        lhs: DataType,
        /// Right operand type.
        rhs: DataType,
    },

    /// The result was requested as a type it cannot be converted to.
    #[error("expected {expected}, found {found}")]
    Conversion {
        /// Requested type.
        expected: DataType,
        /// Actual type.
        found: DataType,
    },

    /// Division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,
}
