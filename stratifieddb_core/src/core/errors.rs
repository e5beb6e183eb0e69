use std::error::Error;
use std::fmt;

/// Errors reported while compiling a raw condition against a field.
///
/// All failures are compile-time: once a `CompiledCondition` exists, pruning
/// and matching cannot fail. A malformed compiled condition reaching the scan
/// phase is a programming error and panics instead of returning an error.
#[derive(Debug)]
pub enum CompileError {
    /// Condition value cannot be coerced to the field's storage type
    TypeMismatch(String),
    /// Range condition with from > to, or a missing range bound
    InvalidRange(String),
    /// Operator is not defined for the field's type (e.g. regexp on numbers)
    UnsupportedOperator(String),
    /// Regexp pattern failed to compile
    BadPattern(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::TypeMismatch(msg) => write!(f, "Type mismatch: {}", msg),
            CompileError::InvalidRange(msg) => write!(f, "Invalid range: {}", msg),
            CompileError::UnsupportedOperator(msg) => write!(f, "Unsupported operator: {}", msg),
            CompileError::BadPattern(msg) => write!(f, "Bad pattern: {}", msg),
        }
    }
}

impl Error for CompileError {}

/// Custom Result type for condition compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
