//! Sheet state and logic (UI-agnostic).

mod io;
mod ops;
mod recalc;
mod state;

pub use state::{RecalcMode, Sheet, SheetOptions, UndoAction, UndoEntry};
