//! Built-in spreadsheet functions and their metadata.
//!
//! Conventions:
//! - Spreadsheet-facing names are ALL CAPS (`SUM`, `AVERAGE`); calls match
//!   case-insensitively.
//! - A call is computed from its argument text and replaced in the formula by
//!   a literal (number text or a quoted string), so results compose with the
//!   surrounding expression.
//! - To add a function, list it in `BUILTINS` and handle it in `apply`.

use regex::Regex;
use std::sync::OnceLock;

use crate::engine::cell_ref::CellRef;
use crate::engine::eval::CellSource;
use crate::engine::format::parse_number;
use crate::engine::preprocess::{eval_fragment, is_bare_reference, literal_text, quote_literal};
use crate::engine::expr::Value;
use crate::engine::range::{expand_range_bounded, parse_range};
use crate::error::{FormulaError, FormulaResult};

pub struct Builtin {
    pub name: &'static str,
    #[allow(dead_code)]
    pub description: &'static str,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "SUM",
        description: "Sum of numeric values",
    },
    Builtin {
        name: "AVERAGE",
        description: "Mean of numeric values",
    },
    Builtin {
        name: "COUNT",
        description: "Count of numeric values",
    },
    Builtin {
        name: "COUNTA",
        description: "Count of non-empty values",
    },
    Builtin {
        name: "MAX",
        description: "Largest numeric value (0 when there is none)",
    },
    Builtin {
        name: "MIN",
        description: "Smallest numeric value (0 when there is none)",
    },
    Builtin {
        name: "PRODUCT",
        description: "Product of numeric values",
    },
    Builtin {
        name: "IF",
        description: "Pick a branch based on a condition",
    },
    Builtin {
        name: "CONCATENATE",
        description: "Join values into one string",
    },
    Builtin {
        name: "ABS",
        description: "Absolute value",
    },
    Builtin {
        name: "ROUND",
        description: "Round half away from zero to a number of digits",
    },
    Builtin {
        name: "LEN",
        description: "Length of a string in characters",
    },
    Builtin {
        name: "UPPER",
        description: "Upper-case a string",
    },
    Builtin {
        name: "LOWER",
        description: "Lower-case a string",
    },
];

/// Regex that matches the opening of a built-in call like `SUM(`.
///
/// Captures:
/// - group 1: function name as written
pub fn call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let names = BUILTINS
            .iter()
            .map(|b| b.name)
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?i)\b({})\s*\(", names)).expect("built-in call regex must compile")
    })
}

/// Compute one call. `args` is the raw text between the parentheses, which
/// holds no further built-in calls. Returns the replacement text.
pub fn apply(name: &str, args: &str, source: &dyn CellSource) -> FormulaResult<String> {
    let upper = name.to_ascii_uppercase();
    let args = split_args(args);

    match upper.as_str() {
        "SUM" => {
            let nums = numeric(&collect_members(&args, source)?);
            number_text(nums.iter().sum())
        }
        "AVERAGE" => {
            let nums = numeric(&collect_members(&args, source)?);
            if nums.is_empty() {
                return Err(FormulaError::DivisionByZero);
            }
            number_text(nums.iter().sum::<f64>() / nums.len() as f64)
        }
        "COUNT" => {
            let nums = numeric(&collect_members(&args, source)?);
            number_text(nums.len() as f64)
        }
        "COUNTA" => {
            let members = collect_members(&args, source)?;
            number_text(members.iter().filter(|m| !m.is_empty()).count() as f64)
        }
        "MAX" => {
            let nums = numeric(&collect_members(&args, source)?);
            number_text(nums.into_iter().reduce(f64::max).unwrap_or(0.0))
        }
        "MIN" => {
            let nums = numeric(&collect_members(&args, source)?);
            number_text(nums.into_iter().reduce(f64::min).unwrap_or(0.0))
        }
        "PRODUCT" => {
            let nums = numeric(&collect_members(&args, source)?);
            number_text(nums.into_iter().reduce(|a, b| a * b).unwrap_or(0.0))
        }
        "IF" => if_call(&args, source),
        "CONCATENATE" => concatenate(&args, source),
        "ABS" => {
            expect_args("ABS", "1", &args, 1..=1)?;
            number_text(eval_fragment(&args[0], source)?.to_number()?.abs())
        }
        "ROUND" => round(&args, source),
        "LEN" => {
            expect_args("LEN", "1", &args, 1..=1)?;
            let text = eval_fragment(&args[0], source)?.to_text();
            number_text(text.chars().count() as f64)
        }
        "UPPER" => {
            expect_args("UPPER", "1", &args, 1..=1)?;
            Ok(quote_literal(&eval_fragment(&args[0], source)?.to_text().to_uppercase()))
        }
        "LOWER" => {
            expect_args("LOWER", "1", &args, 1..=1)?;
            Ok(quote_literal(&eval_fragment(&args[0], source)?.to_text().to_lowercase()))
        }
        _ => Err(FormulaError::Parse(format!("unknown function '{}'", name))),
    }
}

/// Raw text of every member an aggregate sees: range cells, referenced cells
/// and evaluated literal arguments. Missing cells read as "".
fn collect_members(args: &[String], source: &dyn CellSource) -> FormulaResult<Vec<String>> {
    let mut members = Vec::new();

    for arg in args {
        if arg.is_empty() {
            continue;
        }
        if arg.contains(':') && !arg.starts_with('"') {
            let (start, end) =
                parse_range(arg).map_err(|e| FormulaError::InvalidReference(e.0))?;
            let cells = expand_range_bounded(&start, &end)
                .ok_or_else(|| FormulaError::RangeTooLarge(arg.clone()))?;
            members.extend(cells.iter().map(|c| source.value_at(c).unwrap_or_default()));
        } else if is_bare_reference(arg) {
            let cell = CellRef::parse(arg).map_err(|e| FormulaError::InvalidReference(e.0))?;
            members.push(source.value_at(&cell).unwrap_or_default());
        } else {
            members.push(eval_fragment(arg, source)?.to_text());
        }
    }

    Ok(members)
}

fn numeric(members: &[String]) -> Vec<f64> {
    members.iter().filter_map(|m| parse_number(m)).collect()
}

fn number_text(n: f64) -> FormulaResult<String> {
    if !n.is_finite() {
        return Err(FormulaError::NotFinite);
    }
    Ok(literal_text(&Value::Number(n)))
}

fn expect_args(
    function: &'static str,
    expected: &'static str,
    args: &[String],
    allowed: std::ops::RangeInclusive<usize>,
) -> FormulaResult<()> {
    if allowed.contains(&args.len()) {
        Ok(())
    } else {
        Err(FormulaError::ArgumentCount {
            function,
            expected,
            actual: args.len(),
        })
    }
}

/// The chosen branch comes back as written; later passes substitute any
/// references left in it.
fn if_call(args: &[String], source: &dyn CellSource) -> FormulaResult<String> {
    expect_args("IF", "2 or 3", args, 2..=3)?;
    let condition = eval_fragment(&args[0], source)?;
    if condition.is_truthy() {
        Ok(args[1].clone())
    } else {
        Ok(args.get(2).cloned().unwrap_or_else(|| "FALSE".to_string()))
    }
}

fn concatenate(args: &[String], source: &dyn CellSource) -> FormulaResult<String> {
    let mut joined = String::new();
    for arg in args {
        if is_bare_reference(arg) {
            let cell = CellRef::parse(arg).map_err(|e| FormulaError::InvalidReference(e.0))?;
            joined.push_str(&source.value_at(&cell).unwrap_or_default());
            continue;
        }
        match eval_fragment(arg, source) {
            Ok(value) => joined.push_str(&value.to_text()),
            // Bare words are taken literally.
            Err(FormulaError::Parse(_)) => joined.push_str(arg),
            Err(e) => return Err(e),
        }
    }
    Ok(quote_literal(&joined))
}

fn round(args: &[String], source: &dyn CellSource) -> FormulaResult<String> {
    expect_args("ROUND", "1 or 2", args, 1..=2)?;
    let value = eval_fragment(&args[0], source)?.to_number()?;
    let digits = match args.get(1) {
        Some(arg) => eval_fragment(arg, source)?.to_number()?.trunc(),
        None => 0.0,
    };
    if !(-15.0..=15.0).contains(&digits) {
        return Err(FormulaError::Type(format!("ROUND digits out of range: {}", digits)));
    }
    let scale = 10f64.powi(digits as i32);
    number_text((value * scale).round() / scale)
}

/// Split argument text on top-level commas (outside quotes and parentheses).
/// Each piece is trimmed; empty input gives no arguments.
pub fn split_args(args: &str) -> Vec<String> {
    if args.trim().is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for ch in args.chars() {
        if in_string {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                current.push(ch);
            }
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(ch),
        }
    }
    parts.push(current.trim().to_string());
    parts
}
