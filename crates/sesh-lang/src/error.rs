use thiserror::Error;

/// Errors raised by executed code. These propagate to the invocation's
/// caller unchanged; nothing in the session recovers from them.
#[derive(Debug, Error)]
pub enum LangError {
    #[error("parse error at line {line}: {msg}")]
    Parse { line: u32, msg: String },

    #[error("name `{0}` is not defined")]
    Undefined(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in `{0}`")]
    Overflow(&'static str),

    #[error("index {index} out of range for {kind} of length {len}")]
    IndexOutOfRange {
        index: i64,
        len: usize,
        kind: &'static str,
    },

    #[error("key `{0}` not found")]
    KeyNotFound(String),

    #[error("a {0} value is not callable")]
    NotCallable(&'static str),

    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: &'static str,
        expected: usize,
        got: usize,
    },
}

impl LangError {
    pub(crate) fn parse(line: u32, msg: impl Into<String>) -> Self {
        LangError::Parse {
            line,
            msg: msg.into(),
        }
    }
}
