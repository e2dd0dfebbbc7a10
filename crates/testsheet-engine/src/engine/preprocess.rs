//! Textual formula passes that run before expression parsing.
//!
//! - **Function expansion**: `SUM(A1:A3)` → `30`, innermost call first, so
//!   `ROUND(AVERAGE(A1:A3), 1)` computes the average before rounding.
//! - **Reference substitution**: `A1` → `5` or `"text"`, leaving only literals
//!   and operators for the expression parser.
//!
//! Both passes skip anything inside string literals.

use regex::Regex;
use std::sync::OnceLock;

use super::cell_ref::CellRef;
use super::deps::{cell_ref_re, strip_string_literals};
use super::eval::{CIRCULAR_SENTINEL, CellSource, ERROR_SENTINEL};
use super::expr::{Value, evaluate_expression};
use super::format::{format_number, parse_number};
use crate::builtins;
use crate::error::{FormulaError, FormulaResult};

/// Replace every built-in call in `body` with its result literal.
pub fn expand_functions(body: &str, source: &dyn CellSource) -> FormulaResult<String> {
    let mut text = body.to_string();

    loop {
        let masked = strip_string_literals(&text);
        // The last call opening has no other call inside its arguments.
        let Some(caps) = builtins::call_re().captures_iter(&masked).last() else {
            return Ok(text);
        };
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            return Ok(text);
        };

        let open = whole.end() - 1;
        let close = matching_paren(&masked, open).ok_or_else(|| {
            FormulaError::Parse(format!("unclosed call to {}", name.as_str()))
        })?;

        let result = builtins::apply(name.as_str(), &text[open + 1..close], source)?;
        log::trace!("{}(...) -> {}", name.as_str(), result);
        text.replace_range(whole.start()..=close, &result);
    }
}

/// Byte index of the `)` closing the `(` at `open`. Expects string contents
/// to be blanked already.
fn matching_paren(masked: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in masked.bytes().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Replace each cell reference outside string literals with the referenced
/// value: a number when it parses, `TRUE`/`FALSE` as booleans, otherwise a
/// quoted string. A reference to a cell holding an error sentinel fails with
/// that sentinel.
pub fn substitute_references(text: &str, source: &dyn CellSource) -> FormulaResult<String> {
    let masked = strip_string_literals(text);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in cell_ref_re().find_iter(&masked) {
        let cell = CellRef::parse(m.as_str())
            .map_err(|e| FormulaError::InvalidReference(e.0))?;
        let value = source.value_at(&cell).unwrap_or_default();

        out.push_str(&text[last..m.start()]);
        out.push_str(&reference_literal(&value)?);
        last = m.end();
    }
    out.push_str(&text[last..]);

    Ok(out)
}

fn reference_literal(value: &str) -> FormulaResult<String> {
    match value {
        ERROR_SENTINEL => Err(FormulaError::Propagated(ERROR_SENTINEL)),
        CIRCULAR_SENTINEL => Err(FormulaError::Propagated(CIRCULAR_SENTINEL)),
        "TRUE" | "FALSE" => Ok(value.to_string()),
        _ => Ok(match parse_number(value) {
            Some(n) => literal_text(&Value::Number(n)),
            None => quote_literal(value),
        }),
    }
}

/// Evaluate a call argument or condition that contains no built-in calls.
pub fn eval_fragment(text: &str, source: &dyn CellSource) -> FormulaResult<Value> {
    let substituted = substitute_references(text, source)?;
    evaluate_expression(&substituted)
}

/// Source text for a value, suitable for splicing back into a formula.
/// Negative numbers are parenthesized so `2*SUM(..)` stays well formed.
pub fn literal_text(value: &Value) -> String {
    match value {
        Value::Number(n) if *n < 0.0 => format!("({})", format_number(*n)),
        Value::Number(n) => format_number(*n),
        Value::Text(s) => quote_literal(s),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
    }
}

pub fn quote_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Whether `text` is exactly one cell reference, like `B12`.
pub fn is_bare_reference(text: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]+[0-9]+$").expect("bare reference regex must compile"))
        .is_match(text)
}
