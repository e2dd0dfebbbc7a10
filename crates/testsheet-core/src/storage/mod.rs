//! Sheet document format and persistence backends.

pub mod json;
pub mod store;

pub use json::{SheetData, SheetDocument, SheetMetadata, parse_document};
pub use store::{FileStore, MemoryStore, SaveFailure, SheetStore};
