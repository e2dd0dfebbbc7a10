use std::collections::BTreeMap;

use testsheet_engine::engine::{CellData, CellRef, DependencyMap, DisplayLocale, Grid};

use crate::storage::{SheetData, SheetMetadata};

/// Default number of undo entries to keep
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// How formula cells are brought up to date after an edit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecalcMode {
    /// Re-evaluate the edited cells and everything downstream of them, in
    /// dependency order. Cells on a cycle become `#CIRCULAR!`.
    #[default]
    FixedPoint,
    /// Re-evaluate, once, every formula whose text mentions the edited label.
    /// Chains longer than one hop stay stale.
    SinglePass,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SheetOptions {
    pub history_limit: usize,
    pub recalc_mode: RecalcMode,
    pub locale: DisplayLocale,
}

impl Default for SheetOptions {
    fn default() -> Self {
        SheetOptions {
            history_limit: DEFAULT_HISTORY_LIMIT,
            recalc_mode: RecalcMode::default(),
            locale: DisplayLocale::default(),
        }
    }
}

/// Before and after state of one cell. `None` means the cell was absent.
#[derive(Clone, Debug, PartialEq)]
pub struct UndoAction {
    pub cell_ref: CellRef,
    pub old_cell: Option<CellData>,
    pub new_cell: Option<CellData>,
}

/// Every cell one mutation touched, recalculated cells included.
#[derive(Clone, Debug, PartialEq)]
pub struct UndoEntry {
    pub actions: Vec<UndoAction>,
}

/// Old states of cells touched during one mutation, first write wins.
pub(crate) type Touched = BTreeMap<CellRef, Option<CellData>>;

/// UI-agnostic sheet state: cells, layout passthrough, dependency graph and history.
pub struct Sheet {
    /// The cell store
    pub grid: Grid,
    /// Everything in the document's `data` object except the cells
    pub layout: SheetData,
    pub metadata: SheetMetadata,
    pub options: SheetOptions,
    /// Whether the sheet changed since it was loaded or last saved
    pub modified: bool,
    /// Formula cell -> cells it reads
    pub precedents: DependencyMap,
    /// Reverse dependency map: cell -> formula cells that read it
    pub dependents: DependencyMap,
    pub undo_stack: Vec<UndoEntry>,
    pub redo_stack: Vec<UndoEntry>,
}

impl Sheet {
    /// Create an empty 100×26 sheet.
    pub fn new() -> Self {
        Self::with_options(SheetOptions::default())
    }

    pub fn with_options(options: SheetOptions) -> Self {
        Sheet {
            grid: Grid::new(),
            layout: SheetData::default(),
            metadata: SheetMetadata::default(),
            options,
            modified: false,
            precedents: DependencyMap::new(),
            dependents: DependencyMap::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.layout.rows
    }

    pub fn cols(&self) -> usize {
        self.layout.cols
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Record a finished mutation. Clears the redo tail.
    pub(crate) fn push_undo(&mut self, entry: UndoEntry) {
        self.redo_stack.clear();
        self.push_history(entry);
    }

    /// Push onto the undo stack, dropping the oldest entries past the limit.
    pub(crate) fn push_history(&mut self, entry: UndoEntry) {
        if entry.actions.is_empty() {
            return;
        }
        self.undo_stack.push(entry);
        if self.undo_stack.len() > self.options.history_limit {
            let excess = self.undo_stack.len() - self.options.history_limit;
            self.undo_stack.drain(..excess);
            log::debug!("history full, dropped {} oldest entries", excess);
        }
    }

    /// Turn the recorded old states into an undo entry, skipping cells that
    /// ended where they started unless they were edited directly.
    pub(crate) fn entry_from(&self, touched: Touched, edited: &[CellRef]) -> UndoEntry {
        let actions = touched
            .into_iter()
            .filter_map(|(cell_ref, old_cell)| {
                let new_cell = self.grid.get(&cell_ref).map(|c| c.value().clone());
                if old_cell == new_cell && !edited.contains(&cell_ref) {
                    return None;
                }
                Some(UndoAction {
                    cell_ref,
                    old_cell,
                    new_cell,
                })
            })
            .collect();
        UndoEntry { actions }
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}
