use thiserror::Error;

/// Half-open character range `[start, end)` into the original input string,
/// suitable for highlighting in a UI.
pub type ErrorRange = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnmatchedParenthesis,
    InvalidOperator,
    InvalidNumber,
    UnexpectedToken,
}

/// Malformed syntax. Parsing aborts at the first error; no partial tree is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at {}: {msg}", range.0)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub msg: String,
    pub range: ErrorRange,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, msg: impl Into<String>, range: ErrorRange) -> Self {
        Self {
            kind,
            msg: msg.into(),
            range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    UndefinedVariable,
    UndefinedFunction,
    WrongArity,
    Domain,
    Recursion,
    InvalidOperand,
}

/// Syntactically valid input that failed at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error at {}: {msg}", range.0)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub msg: String,
    pub range: ErrorRange,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, msg: impl Into<String>, range: ErrorRange) -> Self {
        Self {
            kind,
            msg: msg.into(),
            range,
        }
    }
}

/// Either of the two failure classes a public entry point can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl CalcError {
    pub fn range(&self) -> ErrorRange {
        match self {
            CalcError::Parse(e) => e.range,
            CalcError::Runtime(e) => e.range,
        }
    }

    pub fn msg(&self) -> &str {
        match self {
            CalcError::Parse(e) => &e.msg,
            CalcError::Runtime(e) => &e.msg,
        }
    }
}
