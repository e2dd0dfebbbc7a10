//! Persistence backends for sheet documents.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::json::{SheetDocument, parse_document};
use crate::error::Result;

/// Why a store refused or failed to persist a document.
#[derive(Error, Debug)]
pub enum SaveFailure {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Rejected(String),
}

/// Where saved documents go. A store either persists the whole document or
/// reports a failure; it never leaves a partial write behind.
pub trait SheetStore {
    fn save(&mut self, document: &SheetDocument) -> std::result::Result<(), SaveFailure>;
}

/// Pretty JSON on disk, written through a sibling temp file and renamed into place.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<SheetDocument> {
        let text = fs::read_to_string(&self.path)?;
        Ok(parse_document(&text)?)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SheetStore for FileStore {
    fn save(&mut self, document: &SheetDocument) -> std::result::Result<(), SaveFailure> {
        let content = serde_json::to_string_pretty(document)?;
        let temp = self.temp_path();
        if let Err(e) = fs::write(&temp, content + "\n") {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        log::info!("saved sheet to {}", self.path.display());
        Ok(())
    }
}

/// Keeps the last saved document in memory. Can be told to fail.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    pub saved: Option<SheetDocument>,
    pub save_count: usize,
    /// When set, every save fails with this message.
    pub fail_with: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        MemoryStore {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }
}

impl SheetStore for MemoryStore {
    fn save(&mut self, document: &SheetDocument) -> std::result::Result<(), SaveFailure> {
        if let Some(message) = &self.fail_with {
            return Err(SaveFailure::Rejected(message.clone()));
        }
        self.saved = Some(document.clone());
        self.save_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::json::SheetData;
    use testsheet_engine::engine::CellData;

    fn document() -> SheetDocument {
        let mut data = SheetData::default();
        data.cells.insert("A1".into(), CellData::literal("5"));
        SheetDocument {
            data,
            ..SheetDocument::default()
        }
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("sheet.json"));
        store.save(&document()).unwrap();

        assert_eq!(store.load().unwrap(), document());
        assert!(!dir.path().join("sheet.json.tmp").exists());
    }

    #[test]
    fn test_file_store_failure_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.json");
        std::fs::write(&path, "previous").unwrap();

        // A directory in the way of the temp file makes the write fail.
        std::fs::create_dir(dir.path().join("sheet.json.tmp")).unwrap();
        let mut store = FileStore::new(&path);
        assert!(store.save(&document()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");
    }

    #[test]
    fn test_memory_store_failure() {
        let mut store = MemoryStore::failing("offline");
        let err = store.save(&document()).unwrap_err();
        assert_eq!(err.to_string(), "offline");
        assert!(store.saved.is_none());
        assert_eq!(store.save_count, 0);
    }
}
