//! testsheet-core - UI-agnostic sheet model, history and storage.

pub mod document;
pub mod error;
pub mod storage;

pub use document::{RecalcMode, Sheet, SheetOptions, UndoAction, UndoEntry};
pub use error::{Result, SheetError};
pub use storage::{FileStore, MemoryStore, SaveFailure, SheetDocument, SheetStore};

pub use testsheet_engine::engine::{CellData, CellPatch, CellRef};
