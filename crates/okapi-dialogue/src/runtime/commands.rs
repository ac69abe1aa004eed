//! Named commands callable from inline code (`=>{ give("sword", 2); }`).
//!
//! The host registers each command with a typed parameter list. Arguments are
//! expressions; they are evaluated against the runtime variables and must
//! produce the declared type exactly (a number is accepted for `Int` and is
//! truncated). Trailing parameters with a default may be omitted.

use std::collections::HashMap;
use std::fmt;

use okapi_expr::{DataType, ExprError, Expression, Value, Variables};
use thiserror::Error;

/// Result type for command calls.
pub type CommandResult<T> = Result<T, CommandError>;

/// Why a command call was rejected or failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// No command with this name is registered.
    #[error("unknown command \"{0}\"")]
    UnknownCommand(String),

    /// Fewer arguments than required parameters.
    #[error("command \"{name}\" needs at least {expected} argument(s), got {found}")]
    TooFewArguments {
        /// Command name.
        name: String,
        /// Number of required parameters.
        expected: usize,
        /// Number of supplied arguments.
        found: usize,
    },

    /// More arguments than parameters.
    #[error("command \"{name}\" takes at most {expected} argument(s), got {found}")]
    TooManyArguments {
        /// Command name.
        name: String,
        /// Number of parameters.
        expected: usize,
        /// Number of supplied arguments.
        found: usize,
    },

    /// An argument expression did not parse or evaluate.
    #[error("argument {index} of \"{name}\": {source}")]
    BadExpression {
        /// Command name.
        name: String,
        /// Zero-based argument position.
        index: usize,
        /// Underlying expression error.
        #[source]
        source: ExprError,
    },

    /// An argument evaluated to the wrong type.
    #[error("argument {index} of \"{name}\" must be {expected}, found {found}")]
    ArgumentType {
        /// Command name.
        name: String,
        /// Zero-based argument position.
        index: usize,
        /// Declared parameter type.
        expected: ParamKind,
        /// Type the expression produced.
        found: DataType,
    },

    /// The handler itself reported a failure.
    #[error("{0}")]
    Failed(String),
}

/// Declared type of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// `true` / `false`.
    Bool,
    /// Any number.
    Float,
    /// A number, truncated toward zero.
    Int,
    /// A string.
    String,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Float => write!(f, "float"),
            Self::Int => write!(f, "int"),
            Self::String => write!(f, "string"),
        }
    }
}

/// A coerced argument as seen by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Boolean argument.
    Bool(bool),
    /// Floating point argument.
    Float(f64),
    /// Integer argument.
    Int(i64),
    /// String argument.
    String(String),
}

impl ArgValue {
    /// The boolean, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The number, for `Float` and `Int`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// The integer, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The string, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Name, used in logs.
    pub name: String,
    /// Declared type.
    pub kind: ParamKind,
    /// Value used when the argument is omitted. Makes the parameter optional.
    pub default: Option<ArgValue>,
}

impl Param {
    fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    /// A required `bool` parameter.
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Bool)
    }

    /// A required `float` parameter.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Float)
    }

    /// A required `int` parameter.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Int)
    }

    /// A required `string` parameter.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String)
    }

    /// Make the parameter optional.
    pub fn with_default(mut self, default: ArgValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// A side effect on the conversation requested by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScopeRequest {
    Start(String),
    End,
}

/// What a handler may touch while it runs.
pub struct CommandScope<'a> {
    variables: &'a mut Variables,
    requests: Vec<ScopeRequest>,
}

impl<'a> CommandScope<'a> {
    /// Wrap the variables a handler may read and write.
    pub fn new(variables: &'a mut Variables) -> Self {
        Self {
            variables,
            requests: Vec::new(),
        }
    }

    /// Read access to the runtime variables.
    pub fn variables(&self) -> &Variables {
        self.variables
    }

    /// Write access to the runtime variables.
    pub fn variables_mut(&mut self) -> &mut Variables {
        self.variables
    }

    /// Start another dialogue once the current statement finishes.
    pub fn start_conversation(&mut self, key: impl Into<String>) {
        self.requests.push(ScopeRequest::Start(key.into()));
    }

    /// End the conversation once the current statement finishes.
    pub fn end_conversation(&mut self) {
        self.requests.push(ScopeRequest::End);
    }

    pub(crate) fn into_requests(self) -> Vec<ScopeRequest> {
        self.requests
    }
}

type Handler = Box<dyn Fn(&mut CommandScope<'_>, &[ArgValue]) -> CommandResult<()>>;

struct Command {
    params: Vec<Param>,
    handler: Handler,
}

/// Registry of commands by name.
#[derive(Default)]
pub struct CommandTable {
    commands: HashMap<String, Command>,
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.commands.keys().collect();
        names.sort();
        f.debug_struct("CommandTable").field("commands", &names).finish()
    }
}

impl CommandTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, params: Vec<Param>, handler: F) -> &mut Self
    where
        F: Fn(&mut CommandScope<'_>, &[ArgValue]) -> CommandResult<()> + 'static,
    {
        self.commands.insert(
            name.into(),
            Command {
                params,
                handler: Box::new(handler),
            },
        );
        self
    }

    /// Whether a command is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Declared parameters of a command.
    pub fn params(&self, name: &str) -> Option<&[Param]> {
        self.commands.get(name).map(|c| c.params.as_slice())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Evaluate `args`, check them against the declaration and run the handler.
    pub fn call(&self, name: &str, args: &[String], scope: &mut CommandScope<'_>) -> CommandResult<()> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
        let params = &command.params;

        let required = params
            .iter()
            .position(|p| p.default.is_some())
            .unwrap_or(params.len());
        if args.len() < required {
            return Err(CommandError::TooFewArguments {
                name: name.to_string(),
                expected: required,
                found: args.len(),
            });
        }
        if args.len() > params.len() {
            return Err(CommandError::TooManyArguments {
                name: name.to_string(),
                expected: params.len(),
                found: args.len(),
            });
        }

        let mut values = Vec::with_capacity(params.len());
        for (index, param) in params.iter().enumerate() {
            let value = match args.get(index) {
                Some(source) => coerce(name, index, param.kind, source, scope.variables())?,
                None => param.default.clone().ok_or_else(|| CommandError::TooFewArguments {
                    name: name.to_string(),
                    expected: index + 1,
                    found: args.len(),
                })?,
            };
            values.push(value);
        }

        (command.handler)(scope, &values)
    }
}

fn coerce(name: &str, index: usize, kind: ParamKind, source: &str, variables: &Variables) -> CommandResult<ArgValue> {
    let bad = |source| CommandError::BadExpression {
        name: name.to_string(),
        index,
        source,
    };
    let value = Expression::parse(source)
        .and_then(|expr| expr.evaluate(variables))
        .map_err(bad)?;

    match (kind, value) {
        (ParamKind::Bool, Value::Bool(b)) => Ok(ArgValue::Bool(b)),
        (ParamKind::Float, Value::Number(n)) => Ok(ArgValue::Float(n)),
        (ParamKind::Int, Value::Number(n)) => Ok(ArgValue::Int(n.trunc() as i64)),
        (ParamKind::String, Value::String(s)) => Ok(ArgValue::String(s)),
        (expected, value) => Err(CommandError::ArgumentType {
            name: name.to_string(),
            index,
            expected,
            found: value.data_type(),
        }),
    }
}
