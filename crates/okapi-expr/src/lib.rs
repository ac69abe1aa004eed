//! Expression language for Okapi dialogue scripts.
//!
//! Conditions such as `{hasKey && gold >= 10}` and the right-hand side of
//! inline assignments are written in this language. Expressions are parsed
//! once into an [`Expression`] and evaluated against any [`VariableSource`].

/// Expression tree types.
pub mod ast;
/// Variable context traits and the default [`Variables`] map.
pub mod context;
/// Error types for parsing and evaluation.
pub mod error;
/// Parsed expressions and evaluation.
pub mod eval;
/// Tokenizer.
pub mod lexer;
/// Parser from tokens to [`ast::Expr`].
pub mod parser;
/// Runtime values and types.
pub mod value;

pub use context::{VariableSink, VariableSource, Variables};
pub use error::{ExprError, ExprResult};
pub use eval::Expression;
pub use value::{DataType, Value};
