//! Parsed expressions and their evaluation against a variable context.

use std::fmt;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::context::VariableSource;
use crate::error::{ExprError, ExprResult};
use crate::parser::parse_expr;
use crate::value::{DataType, Value};

/// A parsed expression together with the source it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    /// Parse an expression from source text.
    pub fn parse(source: &str) -> ExprResult<Self> {
        let root = parse_expr(source)?;
        Ok(Self {
            source: source.trim().to_string(),
            root,
        })
    }

    /// The trimmed source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The expression tree.
    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Evaluate to a value.
    pub fn evaluate(&self, ctx: &dyn VariableSource) -> ExprResult<Value> {
        eval(&self.root, ctx)
    }

    /// Evaluate and interpret the result as a boolean.
    pub fn evaluate_bool(&self, ctx: &dyn VariableSource) -> ExprResult<bool> {
        self.evaluate(ctx).map(|v| v.as_bool())
    }

    /// Evaluate and interpret the result as a number.
    pub fn evaluate_number(&self, ctx: &dyn VariableSource) -> ExprResult<f64> {
        let value = self.evaluate(ctx)?;
        value.as_number().ok_or(ExprError::Conversion {
            expected: DataType::Number,
            found: value.data_type(),
        })
    }

    /// Evaluate and format the result as a string.
    pub fn evaluate_string(&self, ctx: &dyn VariableSource) -> ExprResult<String> {
        self.evaluate(ctx).map(|v| v.to_string())
    }

    /// Type of the result in this context, without failing.
    ///
    /// Unknown variables and operands that do not combine yield
    /// [`DataType::Undefined`].
    pub fn data_type(&self, ctx: &dyn VariableSource) -> DataType {
        type_of(&self.root, ctx)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn type_of(expr: &Expr, ctx: &dyn VariableSource) -> DataType {
    match expr {
        Expr::Literal(value) => value.data_type(),
        Expr::Variable(name) => ctx
            .variable(name)
            .map_or(DataType::Undefined, |v| v.data_type()),
        Expr::Unary(UnaryOp::Not, inner) => match type_of(inner, ctx) {
            DataType::Undefined => DataType::Undefined,
            _ => DataType::Bool,
        },
        Expr::Unary(UnaryOp::Neg, inner) => match type_of(inner, ctx) {
            DataType::Number | DataType::Bool => DataType::Number,
            _ => DataType::Undefined,
        },
        Expr::Binary(op, lhs, rhs) => {
            let (lhs, rhs) = (type_of(lhs, ctx), type_of(rhs, ctx));
            if lhs == DataType::Undefined || rhs == DataType::Undefined {
                return DataType::Undefined;
            }
            match op {
                BinaryOp::Or
                | BinaryOp::And
                | BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Less
                | BinaryOp::LessEq
                | BinaryOp::Greater
                | BinaryOp::GreaterEq => DataType::Bool,
                BinaryOp::Add if lhs == DataType::String || rhs == DataType::String => {
                    DataType::String
                }
                _ => DataType::Number,
            }
        }
    }
}

fn eval(expr: &Expr, ctx: &dyn VariableSource) -> ExprResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => ctx
            .variable(name)
            .ok_or_else(|| ExprError::UndefinedVariable(name.clone())),
        Expr::Unary(UnaryOp::Not, inner) => Ok(Value::Bool(!eval(inner, ctx)?.as_bool())),
        Expr::Unary(UnaryOp::Neg, inner) => {
            let value = eval(inner, ctx)?;
            match value {
                Value::String(_) => Err(ExprError::TypeMismatch {
                    op: "-".to_string(),
                    lhs: value.data_type(),
                    rhs: value.data_type(),
                }),
                _ => Ok(Value::Number(-value.as_number().unwrap_or_default())),
            }
        }
        // Short-circuit so `known && missing` does not fail when `known` is false.
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            if !eval(lhs, ctx)?.as_bool() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(rhs, ctx)?.as_bool()))
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            if eval(lhs, ctx)?.as_bool() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(rhs, ctx)?.as_bool()))
        }
        Expr::Binary(op, lhs, rhs) => binary(*op, eval(lhs, ctx)?, eval(rhs, ctx)?),
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> ExprResult<Value> {
    let mismatch = |lhs: &Value, rhs: &Value| ExprError::TypeMismatch {
        op: op.to_string(),
        lhs: lhs.data_type(),
        rhs: rhs.data_type(),
    };

    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
            let ordering = match (&lhs, &rhs) {
                (Value::String(a), Value::String(b)) => a.partial_cmp(b),
                (Value::String(_), _) | (_, Value::String(_)) => None,
                _ => lhs
                    .as_number()
                    .zip(rhs.as_number())
                    .and_then(|(a, b)| a.partial_cmp(&b)),
            }
            .ok_or_else(|| mismatch(&lhs, &rhs))?;
            let result = match op {
                BinaryOp::Less => ordering.is_lt(),
                BinaryOp::LessEq => ordering.is_le(),
                BinaryOp::Greater => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) => {
            Ok(Value::String(format!("{lhs}{rhs}")))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (Some(a), Some(b)) = (numeric(&lhs), numeric(&rhs)) else {
                return Err(mismatch(&lhs, &rhs));
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div if b == 0.0 => return Err(ExprError::DivisionByZero),
                BinaryOp::Div => a / b,
                BinaryOp::Rem if b == 0.0 => return Err(ExprError::DivisionByZero),
                _ => a % b,
            };
            Ok(Value::Number(result))
        }
        // `eval` short-circuits these before both sides are known.
        BinaryOp::And => Ok(Value::Bool(lhs.as_bool() && rhs.as_bool())),
        BinaryOp::Or => Ok(Value::Bool(lhs.as_bool() || rhs.as_bool())),
    }
}

/// Arithmetic accepts numbers and booleans, never strings.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::String(_) => None,
        _ => value.as_number(),
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(_), _) | (_, Value::String(_)) => false,
        _ => lhs.as_number() == rhs.as_number(),
    }
}
