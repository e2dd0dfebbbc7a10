//! Circular dependency detection for formula cells.
//!
//! A1 -> B1 -> C1 -> A1 (or a cell reading itself) can never settle. The
//! recalculation engine uses [`cycle_members`] to find such cells and mark
//! them instead of evaluating them forever.

use std::collections::{HashMap, HashSet};

use super::cell_ref::CellRef;
use super::deps::DependencyMap;

/// Cells of `candidates` that sit on a cycle (including self-references).
/// Cells that merely read from a cycle are not members.
pub fn cycle_members(candidates: &HashSet<CellRef>, precedents: &DependencyMap) -> HashSet<CellRef> {
    let mut members = HashSet::new();
    let mut ordered: Vec<&CellRef> = candidates.iter().collect();
    ordered.sort();

    for start in ordered {
        if members.contains(start) {
            continue;
        }
        if let Some(cycle) = loop_through(start, precedents, candidates) {
            members.extend(cycle);
        }
    }

    members
}

/// A precedent path leading from `start` back to itself, staying inside `within`.
fn loop_through(
    start: &CellRef,
    precedents: &DependencyMap,
    within: &HashSet<CellRef>,
) -> Option<Vec<CellRef>> {
    let mut parent: HashMap<CellRef, CellRef> = HashMap::new();
    let mut seen = HashSet::new();
    let mut stack = vec![*start];

    while let Some(cell) = stack.pop() {
        let Some(deps) = precedents.get(&cell) else {
            continue;
        };
        for dep in deps.iter().filter(|d| within.contains(*d)) {
            if dep == start {
                let mut path = vec![cell];
                let mut cur = cell;
                while cur != *start {
                    match parent.get(&cur) {
                        Some(p) => {
                            cur = *p;
                            path.push(cur);
                        }
                        None => break,
                    }
                }
                return Some(path);
            }
            if seen.insert(*dep) {
                parent.insert(*dep, cell);
                stack.push(*dep);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> DependencyMap {
        edges
            .iter()
            .map(|(cell, deps)| {
                (
                    CellRef::parse(cell).unwrap(),
                    deps.iter().map(|d| CellRef::parse(d).unwrap()).collect(),
                )
            })
            .collect()
    }

    fn set(labels: &[&str]) -> HashSet<CellRef> {
        labels.iter().map(|l| CellRef::parse(l).unwrap()).collect()
    }

    #[test]
    fn test_no_cycle() {
        let g = graph(&[("C1", &["A1", "B1"]), ("B1", &["A1"])]);
        assert!(cycle_members(&set(&["B1", "C1"]), &g).is_empty());
    }

    #[test]
    fn test_direct_and_self_cycles() {
        let g = graph(&[("A1", &["B1"]), ("B1", &["A1"]), ("C1", &["C1"])]);
        let members = cycle_members(&set(&["A1", "B1", "C1"]), &g);
        assert_eq!(members, set(&["A1", "B1", "C1"]));
    }

    #[test]
    fn test_members_exclude_downstream_cells() {
        // D1 reads the A1 <-> B1 loop but is not part of it.
        let g = graph(&[("A1", &["B1"]), ("B1", &["A1"]), ("D1", &["A1"])]);
        let members = cycle_members(&set(&["A1", "B1", "D1"]), &g);
        assert_eq!(members, set(&["A1", "B1"]));
    }

    #[test]
    fn test_members_of_indirect_cycle() {
        let g = graph(&[("A1", &["B1"]), ("B1", &["C1"]), ("C1", &["A1"])]);
        let members = cycle_members(&set(&["A1", "B1", "C1"]), &g);
        assert_eq!(members, set(&["A1", "B1", "C1"]));
    }

    #[test]
    fn test_members_when_cycles_share_a_cell() {
        // A1 sits on two loops; B1 reads a separate C1 <-> D1 loop only.
        let g = graph(&[
            ("A1", &["A2", "C1"]),
            ("A2", &["A1"]),
            ("C1", &["D1"]),
            ("D1", &["C1"]),
            ("B1", &["C1"]),
        ]);
        let members = cycle_members(&set(&["A1", "A2", "B1", "C1", "D1"]), &g);
        assert_eq!(members, set(&["A1", "A2", "C1", "D1"]));
    }

    #[test]
    fn test_candidates_limit_membership() {
        let g = graph(&[("A1", &["B1"]), ("B1", &["A1"])]);
        assert!(cycle_members(&set(&["A1"]), &g).is_empty());
    }
}
