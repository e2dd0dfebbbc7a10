//! Formula evaluation against a store of cell values.
//!
//! Evaluation never fails from the caller's point of view: problems become the
//! in-band sentinel `#ERROR!`, which is what the cell displays.

use std::collections::HashMap;
use std::fmt;

use super::cell::Grid;
use super::cell_ref::CellRef;
use super::expr::{Value, evaluate_expression};
use super::format::{format_number, parse_number};
use super::preprocess::{expand_functions, substitute_references};
use crate::error::{FormulaError, FormulaResult};

pub const ERROR_SENTINEL: &str = "#ERROR!";
pub const CIRCULAR_SENTINEL: &str = "#CIRCULAR!";

/// Read access to current cell values during evaluation.
pub trait CellSource {
    /// The stored value of `cell`, or `None` when the cell is absent.
    fn value_at(&self, cell: &CellRef) -> Option<String>;
}

impl CellSource for Grid {
    fn value_at(&self, cell: &CellRef) -> Option<String> {
        self.get(cell).map(|c| c.value.clone())
    }
}

impl CellSource for HashMap<CellRef, String> {
    fn value_at(&self, cell: &CellRef) -> Option<String> {
        self.get(cell).cloned()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Evaluation {
    Number(f64),
    Text(String),
    Bool(bool),
    /// One of [`ERROR_SENTINEL`] or [`CIRCULAR_SENTINEL`].
    Error(&'static str),
}

impl Evaluation {
    pub fn is_error(&self) -> bool {
        matches!(self, Evaluation::Error(_))
    }

    /// The string stored as the cell's value.
    pub fn into_cell_value(self) -> String {
        match self {
            Evaluation::Text(s) => s,
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Number(n) => write!(f, "{}", format_number(*n)),
            Evaluation::Text(s) => write!(f, "{}", s),
            Evaluation::Bool(true) => write!(f, "TRUE"),
            Evaluation::Bool(false) => write!(f, "FALSE"),
            Evaluation::Error(sentinel) => write!(f, "{}", sentinel),
        }
    }
}

impl From<Value> for Evaluation {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => Evaluation::Number(n),
            Value::Text(s) => Evaluation::Text(s),
            Value::Bool(b) => Evaluation::Bool(b),
        }
    }
}

/// Evaluate cell input against `source`.
///
/// Text without a leading `=` is a literal: a number when it parses, else the
/// text unchanged.
pub fn evaluate(formula: &str, source: &dyn CellSource) -> Evaluation {
    let Some(body) = formula.strip_prefix('=') else {
        return match parse_number(formula) {
            Some(n) => Evaluation::Number(n),
            None => Evaluation::Text(formula.to_string()),
        };
    };

    match evaluate_body(body, source) {
        Ok(value) => value.into(),
        Err(FormulaError::Propagated(sentinel)) => Evaluation::Error(sentinel),
        Err(e) => {
            log::debug!("formula {:?} evaluated to {}: {}", formula, ERROR_SENTINEL, e);
            Evaluation::Error(ERROR_SENTINEL)
        }
    }
}

fn evaluate_body(body: &str, source: &dyn CellSource) -> FormulaResult<Value> {
    let expanded = expand_functions(body, source)?;
    let substituted = substitute_references(&expanded, source)?;
    evaluate_expression(&substituted)
}
