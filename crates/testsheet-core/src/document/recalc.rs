//! Dependency graph upkeep and recalculation.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::state::{RecalcMode, Sheet, Touched};
use testsheet_engine::engine::{
    CIRCULAR_SENTINEL, CellRef, cycle_members, evaluate, extract_dependencies, references_label,
};

impl Sheet {
    /// Point `cell`'s precedent edges at whatever its current formula reads.
    pub(crate) fn replace_edges(&mut self, cell: &CellRef) {
        if let Some(old) = self.precedents.remove(cell) {
            for precedent in old {
                if let Some(readers) = self.dependents.get_mut(&precedent) {
                    readers.remove(cell);
                    if readers.is_empty() {
                        self.dependents.remove(&precedent);
                    }
                }
            }
        }

        let formula = self
            .grid
            .get(cell)
            .filter(|c| c.is_formula())
            .and_then(|c| c.formula.clone());
        let Some(formula) = formula else {
            return;
        };

        let reads: HashSet<CellRef> = extract_dependencies(&formula).into_iter().collect();
        for precedent in &reads {
            self.dependents.entry(*precedent).or_default().insert(*cell);
        }
        self.precedents.insert(*cell, reads);
    }

    /// Rebuild both dependency maps from the grid.
    pub(crate) fn rebuild_dependencies(&mut self) {
        self.precedents.clear();
        self.dependents.clear();
        let formula_cells: Vec<CellRef> = self
            .grid
            .iter()
            .filter(|entry| entry.is_formula())
            .map(|entry| *entry.key())
            .collect();
        for cell in formula_cells {
            self.replace_edges(&cell);
        }
    }

    /// Bring formula cells up to date after `changed` cells were written.
    pub(crate) fn recalculate_from(&mut self, changed: &[CellRef], touched: &mut Touched) {
        match self.options.recalc_mode {
            RecalcMode::FixedPoint => {
                let affected = self.downstream_of(changed);
                self.settle(&affected, touched);
            }
            RecalcMode::SinglePass => self.single_pass(changed, touched),
        }
    }

    /// Re-evaluate every formula cell in dependency order. Returns how many
    /// cell values changed.
    pub fn recalculate_all(&mut self) -> usize {
        self.rebuild_dependencies();
        let all: HashSet<CellRef> = self.precedents.keys().copied().collect();
        let mut touched = Touched::new();
        self.settle(&all, &mut touched);
        touched.len()
    }

    /// `changed` plus every cell that reads from them, transitively.
    fn downstream_of(&self, changed: &[CellRef]) -> HashSet<CellRef> {
        let mut visited = HashSet::new();
        let mut to_process: Vec<CellRef> = changed.to_vec();
        while let Some(cell) = to_process.pop() {
            if !visited.insert(cell) {
                continue;
            }
            if let Some(readers) = self.dependents.get(&cell) {
                to_process.extend(readers.iter().copied());
            }
        }
        visited
    }

    /// Evaluate the formula cells among `affected`: cycle members get
    /// `#CIRCULAR!`, the rest are evaluated precedents-first.
    fn settle(&mut self, affected: &HashSet<CellRef>, touched: &mut Touched) {
        let formulas: HashSet<CellRef> = affected
            .iter()
            .filter(|cell| self.precedents.contains_key(*cell))
            .copied()
            .collect();

        let circular = cycle_members(&formulas, &self.precedents);
        if !circular.is_empty() {
            let mut labels: Vec<String> = circular.iter().map(|c| c.to_string()).collect();
            labels.sort();
            log::warn!("circular references: {}", labels.join(", "));
        }
        for cell in &circular {
            self.write_value(cell, CIRCULAR_SENTINEL.to_string(), touched);
        }

        // Kahn's algorithm over the acyclic remainder, smallest label first.
        let pending: HashSet<CellRef> = formulas.difference(&circular).copied().collect();
        let mut indegree: HashMap<CellRef, usize> = pending
            .iter()
            .map(|cell| {
                let waiting = self.precedents[cell]
                    .iter()
                    .filter(|p| pending.contains(*p) && *p != cell)
                    .count();
                (*cell, waiting)
            })
            .collect();
        let mut ready: BTreeSet<CellRef> = indegree
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(cell, _)| *cell)
            .collect();

        let mut evaluated = 0;
        while let Some(cell) = ready.pop_first() {
            self.evaluate_cell(&cell, touched);
            evaluated += 1;
            let Some(readers) = self.dependents.get(&cell) else {
                continue;
            };
            for reader in readers {
                if let Some(n) = indegree.get_mut(reader) {
                    if *n > 0 {
                        *n -= 1;
                        if *n == 0 {
                            ready.insert(*reader);
                        }
                    }
                }
            }
        }

        log::debug!(
            "recalculated {} of {} formula cells ({} circular)",
            evaluated,
            formulas.len(),
            circular.len()
        );
    }

    /// Legacy scan: every other formula mentioning a changed label is
    /// re-evaluated once, in row-major order.
    fn single_pass(&mut self, changed: &[CellRef], touched: &mut Touched) {
        for origin in changed {
            let label = origin.to_string();
            let mut hits: Vec<CellRef> = self
                .grid
                .iter()
                .filter(|entry| entry.key() != origin)
                .filter(|entry| {
                    entry
                        .formula
                        .as_deref()
                        .is_some_and(|f| f.starts_with('=') && references_label(f, &label))
                })
                .map(|entry| *entry.key())
                .collect();
            hits.sort();
            for cell in &hits {
                self.evaluate_cell(cell, touched);
            }
        }
    }

    /// Evaluate one cell's formula against the current grid and store the result.
    pub(crate) fn evaluate_cell(&self, cell: &CellRef, touched: &mut Touched) {
        let formula = self
            .grid
            .get(cell)
            .filter(|c| c.is_formula())
            .and_then(|c| c.formula.clone());
        let Some(formula) = formula else {
            return;
        };
        let value = evaluate(&formula, &self.grid).into_cell_value();
        self.write_value(cell, value, touched);
    }

    fn write_value(&self, cell: &CellRef, value: String, touched: &mut Touched) {
        if let Some(mut entry) = self.grid.get_mut(cell)
            && entry.value != value
        {
            touched
                .entry(*cell)
                .or_insert_with(|| Some(entry.value().clone()));
            entry.value = value;
        }
    }
}
