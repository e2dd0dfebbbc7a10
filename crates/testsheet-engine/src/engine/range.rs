//! Range resolution for aggregate functions.

use super::cell_ref::{CellRef, InvalidCoordinate};

/// Ranges larger than this are refused rather than expanded.
pub const MAX_RANGE_CELLS: usize = 1_000_000;

/// Parse a range like "A1:B5" into its two corners, as written.
pub fn parse_range(range: &str) -> Result<(CellRef, CellRef), InvalidCoordinate> {
    let (start, end) = range
        .split_once(':')
        .ok_or_else(|| InvalidCoordinate(range.to_string()))?;
    Ok((CellRef::parse(start.trim())?, CellRef::parse(end.trim())?))
}

/// Number of cells covered by the rectangle between two corners.
pub fn range_len(start: &CellRef, end: &CellRef) -> Option<usize> {
    let rows = start.row.abs_diff(end.row).checked_add(1)?;
    let cols = start.col.abs_diff(end.col).checked_add(1)?;
    rows.checked_mul(cols)
}

/// Expand the rectangle between two corners, row-major, both ends inclusive.
/// Corners may be given in any order.
pub fn expand_range(start: &CellRef, end: &CellRef) -> Vec<CellRef> {
    let (min_row, max_row) = (start.row.min(end.row), start.row.max(end.row));
    let (min_col, max_col) = (start.col.min(end.col), start.col.max(end.col));

    let mut cells = Vec::with_capacity(range_len(start, end).unwrap_or(0).min(MAX_RANGE_CELLS));
    for row in min_row..=max_row {
        for col in min_col..=max_col {
            cells.push(CellRef::new(row, col));
        }
    }
    cells
}

/// Expand a range only when it stays under [`MAX_RANGE_CELLS`].
pub fn expand_range_bounded(start: &CellRef, end: &CellRef) -> Option<Vec<CellRef>> {
    match range_len(start, end) {
        Some(n) if n <= MAX_RANGE_CELLS => Some(expand_range(start, end)),
        _ => None,
    }
}
