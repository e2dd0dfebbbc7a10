//! Dependency extraction from formula strings.
//!
//! Finds every cell a formula reads so the sheet can maintain its dependency
//! graph. Handles:
//! - Simple references: `A1`, `B2`
//! - Ranges: `A1:B5` (expanded to every member cell)
//! - References inside string literals are ignored

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use super::cell_ref::CellRef;
use super::range::expand_range_bounded;

/// Formula cell -> cells it reads (or the reverse, for dependents).
pub type DependencyMap = HashMap<CellRef, HashSet<CellRef>>;

/// Extract the cells a formula reads, in order of appearance (ranges first).
/// Duplicates are kept.
pub fn extract_dependencies(formula: &str) -> Vec<CellRef> {
    let body = formula.strip_prefix('=').unwrap_or(formula);
    let script = strip_string_literals(body);
    let mut deps = Vec::new();

    for caps in range_re().captures_iter(&script) {
        let (Ok(start), Ok(end)) = (CellRef::parse(&caps[1]), CellRef::parse(&caps[2])) else {
            continue;
        };
        match expand_range_bounded(&start, &end) {
            Some(cells) => deps.extend(cells),
            None => log::warn!("ignoring oversized range {}:{} in dependency scan", &caps[1], &caps[2]),
        }
    }

    let without_ranges = range_re().replace_all(&script, " ");
    for caps in cell_ref_re().captures_iter(&without_ranges) {
        if let Ok(cell) = CellRef::parse(&caps[0]) {
            deps.push(cell);
        }
    }

    deps
}

/// Textual check used by single-pass recalculation: does the formula source
/// contain `label` anywhere? (`"AA10"` contains `"A1"`.)
pub fn references_label(formula: &str, label: &str) -> bool {
    formula.contains(label)
}

pub(crate) fn cell_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z]+[0-9]+\b").expect("cell reference regex must compile"))
}

fn range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Z]+[0-9]+)\s*:\s*([A-Z]+[0-9]+)\b").expect("range regex must compile")
    })
}

/// Blank out the contents of string literals, keeping the quotes and byte offsets.
pub(crate) fn strip_string_literals(script: &str) -> String {
    let mut out = String::with_capacity(script.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in script.chars() {
        if in_string {
            if escaped {
                escaped = false;
                push_blank(&mut out, ch);
                continue;
            }
            if ch == '\\' {
                escaped = true;
                out.push(' ');
                continue;
            }
            if ch == '"' {
                in_string = false;
                out.push('"');
            } else {
                push_blank(&mut out, ch);
            }
        } else if ch == '"' {
            in_string = true;
            out.push('"');
        } else {
            out.push(ch);
        }
    }

    out
}

fn push_blank(out: &mut String, ch: char) {
    for _ in 0..ch.len_utf8() {
        out.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(deps: &[CellRef]) -> Vec<String> {
        deps.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_extract_simple_references() {
        assert_eq!(labels(&extract_dependencies("=A1+B1*C2")), vec!["A1", "B1", "C2"]);
    }

    #[test]
    fn test_extract_ranges_and_refs() {
        assert_eq!(
            labels(&extract_dependencies("=SUM(A1:A3)+B1")),
            vec!["A1", "A2", "A3", "B1"]
        );
    }

    #[test]
    fn test_extract_ignores_string_literals() {
        assert_eq!(
            labels(&extract_dependencies(r#"=CONCATENATE("A1 \"B2\"", C3)"#)),
            vec!["C3"]
        );
    }

    #[test]
    fn test_extract_skips_oversized_ranges() {
        assert_eq!(labels(&extract_dependencies("=SUM(A1:A1000001)+B2")), vec!["B2"]);
    }

    #[test]
    fn test_literals_and_functions_have_no_dependencies() {
        assert!(extract_dependencies("=10+20").is_empty());
        assert!(extract_dependencies("=MAX(1,2)").is_empty());
        assert!(extract_dependencies("hello").is_empty());
    }

    #[test]
    fn test_strip_keeps_byte_offsets() {
        let src = "\"é\" & A1";
        assert_eq!(strip_string_literals(src).len(), src.len());
    }

    #[test]
    fn test_references_label_is_plain_substring() {
        assert!(references_label("=AA10*2", "A1"));
        assert!(!references_label("=B2*2", "A1"));
    }
}
