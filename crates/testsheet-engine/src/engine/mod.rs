//! Spreadsheet engine API.
//!
//! This module provides the computation side of the sheet:
//!
//! - [`CellData`], [`Format`], [`Grid`] - Data structures for cell storage
//! - [`CellRef`] - Cell reference parsing (A1 notation ↔ row/col indices)
//! - [`expand_range`] - Range resolution for aggregates
//! - [`extract_dependencies`] - Parse formula dependencies
//! - [`cycle_members`] - Circular dependency detection
//! - [`evaluate`] - Formula evaluation to a value or error sentinel
//! - [`format_for_display`] - Number formats applied at render time

pub mod cell;
pub mod cell_ref;
pub mod cycle;
pub mod deps;
pub mod eval;
pub mod expr;
pub mod format;
pub mod preprocess;
pub mod range;
pub mod validation;

pub use cell::{CellData, CellPatch, Format, Grid, NumberFormat, TextAlign, VerticalAlign};
pub use cell_ref::{CellRef, InvalidCoordinate, label_of, parse_label};
pub use cycle::cycle_members;
pub use deps::{DependencyMap, extract_dependencies, references_label};
pub use eval::{CIRCULAR_SENTINEL, CellSource, ERROR_SENTINEL, Evaluation, evaluate};
pub use expr::Value;
pub use format::{
    DisplayLocale, format_for_display, format_for_display_with_locale, format_number, parse_number,
};
pub use range::{MAX_RANGE_CELLS, expand_range, expand_range_bounded, parse_range};
pub use validation::{ValidationKind, ValidationRule};
