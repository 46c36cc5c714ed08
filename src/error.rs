use thiserror::Error;

use crate::analyzer::Type;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("line {line}: {message}")]
    Lex { line: usize, message: String },

    #[error("line {line}: syntax error: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
    },

    #[error("syntax error: expected {0}, however reached end of input")]
    UnexpectedEof(String),

    #[error("undeclared identifier '{0}'")]
    UndeclaredIdentifier(String),

    #[error("function '{0}' is not defined")]
    UndefinedFunction(String),

    #[error("'{0}' is already declared")]
    Redeclaration(String),

    #[error("'{0}' is a reserved keyword and cannot be used as a name")]
    ReservedName(String),

    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: Type,
        found: Type,
    },

    #[error("function '{name}' takes {expected} argument(s) but {found} were supplied")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("'{0}' is a variable, not a function")]
    NotAFunction(String),

    #[error("'{0}' is a function, not a variable")]
    NotAVariable(String),

    #[error("line {line}: nesting deeper than {limit} levels")]
    NestingTooDeep { limit: usize, line: usize },

    #[error("division by zero in constant expression")]
    DivisionByZero,

    #[error("{}", render_all(.0))]
    Diagnostics(Vec<CompileError>),
}

fn render_all(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl CompileError {
    /// Folds a batch of errors into a single result, unwrapping a lone error.
    pub fn from_batch(mut errors: Vec<CompileError>) -> CompileResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(CompileError::Diagnostics(errors)),
        }
    }

    pub fn errors(&self) -> Vec<&CompileError> {
        match self {
            CompileError::Diagnostics(errors) => errors.iter().collect(),
            e => vec![e],
        }
    }
}
