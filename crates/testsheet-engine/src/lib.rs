//! Test Sheet engine: coordinates, formulas and display formatting.
//!
//! Formulas are evaluated by textual passes (built-in calls, then cell
//! references) followed by a small expression parser. Nothing here executes
//! dynamic code.

pub(crate) mod builtins;
pub mod engine;
pub mod error;

pub use error::{FormulaError, FormulaResult};

#[cfg(test)]
mod tests {
    use super::engine::{CellData, CellRef, Evaluation, Grid, evaluate};

    fn grid(cells: &[(&str, &str)]) -> Grid {
        let grid = Grid::new();
        for (label, value) in cells {
            grid.insert(CellRef::parse(label).unwrap(), CellData::literal(value));
        }
        grid
    }

    fn eval(formula: &str, grid: &Grid) -> String {
        evaluate(formula, grid).into_cell_value()
    }

    #[test]
    fn test_arithmetic_over_references() {
        let g = grid(&[("A1", "10"), ("B1", "20")]);
        assert_eq!(eval("=A1+B1", &g), "30");
        assert_eq!(eval("=(A1+B1)/4", &g), "7.5");
        assert_eq!(eval("=A1*-1", &g), "-10");
    }

    #[test]
    fn test_sum_and_average_of_range() {
        let g = grid(&[("A1", "5"), ("A2", "10"), ("A3", "15")]);
        assert_eq!(eval("=SUM(A1:A3)", &g), "30");
        assert_eq!(eval("=AVERAGE(A1:A3)", &g), "10");
        assert_eq!(eval("=sum(A1:A3) / count(A1:A3)", &g), "10");
    }

    #[test]
    fn test_max_min_of_empty_range_is_zero() {
        let g = grid(&[]);
        assert_eq!(eval("=MAX(A1:A3)", &g), "0");
        assert_eq!(eval("=MIN(A1:A3)", &g), "0");
    }

    #[test]
    fn test_max_min_of_text_range_is_zero() {
        let g = grid(&[("A1", "a"), ("A2", "b"), ("A3", "c")]);
        assert_eq!(eval("=MAX(A1:A3)", &g), "0");
        assert_eq!(eval("=MIN(A1:A3)", &g), "0");
    }

    #[test]
    fn test_malformed_formula_is_error_sentinel() {
        let g = grid(&[]);
        assert_eq!(eval("=1/", &g), "#ERROR!");
        assert_eq!(eval("=1/0", &g), "#ERROR!");
        assert_eq!(eval("=SUM(A1:A3", &g), "#ERROR!");
    }

    #[test]
    fn test_nested_calls() {
        let g = grid(&[("A1", "1"), ("A2", "2"), ("B1", "-3.456")]);
        assert_eq!(eval("=ROUND(ABS(B1), 1) + SUM(A1:A2)", &g), "6.5");
        assert_eq!(eval("=MAX(SUM(A1:A2), 2)", &g), "3");
    }

    #[test]
    fn test_if_branches_are_substituted_after_selection() {
        let g = grid(&[("A1", "5"), ("B1", "7")]);
        assert_eq!(eval(r#"=IF(A1>3, "big", "small")"#, &g), "big");
        assert_eq!(eval("=IF(A1>3, B1*2, 0)", &g), "14");
        assert_eq!(eval("=IF(A1>9, 1)", &g), "FALSE");
    }

    #[test]
    fn test_concatenate_and_string_plus() {
        let g = grid(&[("A1", "Hello"), ("B1", "World")]);
        assert_eq!(eval(r#"=CONCATENATE(A1, " ", B1)"#, &g), "Hello World");
        assert_eq!(eval(r#"=A1 + ", " + B1"#, &g), "Hello, World");
        assert_eq!(eval("=LEN(CONCATENATE(A1, B1))", &g), "10");
    }

    #[test]
    fn test_literal_input_is_not_evaluated() {
        let g = grid(&[]);
        assert_eq!(evaluate("1+1", &g), Evaluation::Text("1+1".into()));
        assert_eq!(evaluate("007", &g), Evaluation::Number(7.0));
    }
}
