use std::collections::BTreeMap;

use super::state::{Sheet, Touched};
use crate::error::{Result, SheetError};
use testsheet_engine::engine::{CellData, CellPatch, CellRef, format_for_display_with_locale};

impl Sheet {
    /// The cell at `cell_ref`, or an empty cell. Never fails.
    pub fn get(&self, cell_ref: &CellRef) -> CellData {
        self.grid
            .get(cell_ref)
            .map(|c| c.value().clone())
            .unwrap_or_default()
    }

    pub fn get_label(&self, label: &str) -> Result<CellData> {
        Ok(self.get(&CellRef::parse(label)?))
    }

    /// Merge `patch` into a cell, evaluate it if it holds a formula, then
    /// recalculate whatever depends on it. One undo entry.
    pub fn update(&mut self, cell_ref: CellRef, patch: CellPatch) {
        self.update_many(vec![(cell_ref, patch)]);
    }

    pub fn update_label(&mut self, label: &str, patch: CellPatch) -> Result<()> {
        let cell_ref = CellRef::parse(label)?;
        self.update(cell_ref, patch);
        Ok(())
    }

    /// Editor entry point: `=...` is a formula, anything else a literal.
    pub fn set_input(&mut self, cell_ref: CellRef, input: &str) {
        self.update(cell_ref, CellPatch::from_input(input));
    }

    /// Apply several patches in order as a single undo entry, recalculating
    /// once at the end.
    pub fn update_many(&mut self, edits: Vec<(CellRef, CellPatch)>) {
        if edits.is_empty() {
            return;
        }
        let mut touched = Touched::new();
        let mut edited = Vec::with_capacity(edits.len());

        for (cell_ref, patch) in edits {
            self.write_patch(cell_ref, &patch, &mut touched);
            if !edited.contains(&cell_ref) {
                edited.push(cell_ref);
            }
        }

        self.recalculate_from(&edited, &mut touched);

        let entry = self.entry_from(touched, &edited);
        self.push_undo(entry);
        self.modified = true;
    }

    /// Logical delete: the value becomes empty and any formula is dropped.
    /// Format and metadata stay.
    pub fn clear(&mut self, cell_ref: CellRef) {
        self.update(cell_ref, CellPatch::value(""));
    }

    fn write_patch(&mut self, cell_ref: CellRef, patch: &CellPatch, touched: &mut Touched) {
        let old = self.grid.get(&cell_ref).map(|c| c.value().clone());
        touched.entry(cell_ref).or_insert_with(|| old.clone());

        let mut cell = old.unwrap_or_default();
        cell.apply(patch);
        match patch.formula.as_deref() {
            Some(formula) if formula.starts_with('=') => {}
            Some(literal) => {
                cell.formula = None;
                cell.value = literal.to_string();
            }
            None if patch.value.is_some() => cell.formula = None,
            None => {}
        }

        if cell.is_blank() {
            self.grid.remove(&cell_ref);
        } else {
            // Evaluate against the post-merge store so the cell sees its own new formula.
            self.grid.insert(cell_ref, cell);
            self.evaluate_cell(&cell_ref, touched);
        }
        self.replace_edges(&cell_ref);
    }

    /// Undo the last mutation, restoring every cell it touched exactly.
    pub fn undo(&mut self) -> Result<()> {
        let entry = self.undo_stack.pop().ok_or(SheetError::NothingToUndo)?;
        for action in entry.actions.iter().rev() {
            self.restore(&action.cell_ref, action.old_cell.clone());
        }
        self.redo_stack.push(entry);
        self.modified = true;
        Ok(())
    }

    /// Re-apply the last undone mutation.
    pub fn redo(&mut self) -> Result<()> {
        let entry = self.redo_stack.pop().ok_or(SheetError::NothingToRedo)?;
        for action in &entry.actions {
            self.restore(&action.cell_ref, action.new_cell.clone());
        }
        self.push_history(entry);
        self.modified = true;
        Ok(())
    }

    fn restore(&mut self, cell_ref: &CellRef, state: Option<CellData>) {
        match state {
            Some(cell) => {
                self.grid.insert(*cell_ref, cell);
            }
            None => {
                self.grid.remove(cell_ref);
            }
        }
        self.replace_edges(cell_ref);
    }

    /// The cell's value rendered with its number format and the sheet locale.
    pub fn display(&self, cell_ref: &CellRef) -> String {
        let cell = self.get(cell_ref);
        format_for_display_with_locale(&cell.value, Some(&cell.format), &self.options.locale)
    }

    /// Every stored cell, ordered row-major.
    pub fn snapshot(&self) -> BTreeMap<CellRef, CellData> {
        self.grid
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Cells whose value fails their data validation rule, row-major.
    pub fn invalid_cells(&self) -> Vec<CellRef> {
        let mut invalid: Vec<CellRef> = self
            .grid
            .iter()
            .filter(|entry| {
                entry
                    .data_validation
                    .as_ref()
                    .is_some_and(|rule| !rule.accepts(&entry.value))
            })
            .map(|entry| *entry.key())
            .collect();
        invalid.sort();
        invalid
    }
}
