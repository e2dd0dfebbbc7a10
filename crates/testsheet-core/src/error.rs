//! Error types for Test Sheet core.

use thiserror::Error;

use crate::storage::SaveFailure;
use testsheet_engine::engine::InvalidCoordinate;

/// Errors surfaced by sheet operations. Formula problems are not among them:
/// those end up in the cell as `#ERROR!`.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error(transparent)]
    InvalidCoordinate(#[from] InvalidCoordinate),

    #[error("Save failed: {0}")]
    Save(#[from] SaveFailure),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

pub type Result<T> = std::result::Result<T, SheetError>;
