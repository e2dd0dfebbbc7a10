//! Formula error types.
//!
//! These never leave the evaluator: [`crate::engine::evaluate`] turns every
//! variant into an in-band sentinel stored as the cell value.

use thiserror::Error;

pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Result is not a finite number")]
    NotFinite,

    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Range too large: {0}")]
    RangeTooLarge(String),

    /// A referenced cell already holds an error sentinel; the formula takes it on.
    #[error("Referenced cell holds {0}")]
    Propagated(&'static str),
}
