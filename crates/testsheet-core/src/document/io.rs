use super::state::{Sheet, SheetOptions};
use crate::error::Result;
use crate::storage::{SheetDocument, SheetStore, parse_document};
use testsheet_engine::engine::CellRef;

impl Sheet {
    /// Build a sheet from a parsed document and recalculate every formula.
    /// History starts empty.
    pub fn from_document(document: SheetDocument, options: SheetOptions) -> Result<Self> {
        let SheetDocument { mut data, metadata } = document;
        let cells = std::mem::take(&mut data.cells);

        let mut sheet = Sheet::with_options(options);
        for (label, cell) in cells {
            let cell_ref = CellRef::parse(&label)?;
            sheet.grid.insert(cell_ref, cell);
        }
        sheet.layout = data;
        sheet.metadata = metadata;

        let changed = sheet.recalculate_all();
        log::info!(
            "loaded sheet with {} cells ({} values refreshed)",
            sheet.grid.len(),
            changed
        );
        Ok(sheet)
    }

    /// Replace the whole sheet with the document in `text`. On error the
    /// current sheet is left as it was.
    pub fn load_json(&mut self, text: &str) -> Result<()> {
        let document = parse_document(text)?;
        *self = Sheet::from_document(document, self.options.clone())?;
        Ok(())
    }

    /// The document as it would be saved, cells keyed by label.
    pub fn to_document(&self) -> SheetDocument {
        let mut data = self.layout.clone();
        data.cells = self
            .snapshot()
            .into_iter()
            .map(|(cell_ref, cell)| (cell_ref.to_string(), cell))
            .collect();
        SheetDocument {
            data,
            metadata: self.metadata.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// Hand the document to `store` with the next version number. The
    /// in-memory version and `modified` flag change only if the store succeeds.
    pub fn save(&mut self, store: &mut dyn SheetStore) -> Result<()> {
        let mut document = self.to_document();
        document.metadata.version += 1;
        store.save(&document)?;

        self.metadata.version = document.metadata.version;
        self.modified = false;
        log::info!("saved sheet version {}", self.metadata.version);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SheetError;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn cell(label: &str) -> CellRef {
        CellRef::parse(label).unwrap()
    }

    #[test]
    fn test_load_recalculates_stale_values() {
        let text = json!({
            "data": {
                "cells": {
                    "A1": { "value": "4" },
                    "B1": { "value": "stale", "formula": "=A1*2" },
                    "C1": { "value": "", "formula": "=B1+1" }
                },
                "rows": 10,
                "cols": 5
            },
            "metadata": { "version": 2 }
        })
        .to_string();

        let mut sheet = Sheet::new();
        sheet.load_json(&text).unwrap();
        assert_eq!(sheet.get(&cell("B1")).value, "8");
        assert_eq!(sheet.get(&cell("C1")).value, "9");
        assert_eq!(sheet.rows(), 10);
        assert!(!sheet.can_undo());
        assert!(!sheet.modified);
    }

    #[test]
    fn test_failed_load_keeps_current_sheet() {
        let mut sheet = Sheet::new();
        sheet.set_input(cell("A1"), "keep");

        let err = sheet.load_json(r#"{"cells":{"a1":{"value":"x"}}}"#).unwrap_err();
        assert!(matches!(err, SheetError::InvalidCoordinate(_)));
        assert!(sheet.load_json("not json").is_err());
        assert_eq!(sheet.get(&cell("A1")).value, "keep");
    }

    #[test]
    fn test_save_bumps_version_on_success() {
        let mut sheet = Sheet::new();
        sheet.set_input(cell("A1"), "5");
        let mut store = MemoryStore::new();

        sheet.save(&mut store).unwrap();
        assert_eq!(sheet.metadata.version, 1);
        assert!(!sheet.modified);

        let saved = store.saved.as_ref().unwrap();
        assert_eq!(saved.metadata.version, 1);
        assert_eq!(saved.data.cells["A1"].value, "5");
    }

    #[test]
    fn test_save_failure_leaves_state_untouched() {
        let mut sheet = Sheet::new();
        sheet.set_input(cell("A1"), "5");
        let before = sheet.snapshot();
        let mut store = MemoryStore::failing("disk full");

        let err = sheet.save(&mut store).unwrap_err();
        assert!(matches!(err, SheetError::Save(_)));
        assert_eq!(sheet.metadata.version, 0);
        assert!(sheet.modified);
        assert_eq!(sheet.snapshot(), before);
        assert!(sheet.can_undo());
    }

    #[test]
    fn test_document_round_trip_preserves_passthrough() {
        let raw = json!({
            "data": {
                "cells": { "A1": { "value": "1", "format": { "bold": true } } },
                "rows": 100,
                "cols": 26,
                "conditionalFormats": [{ "range": "A1:A9", "rule": "gt", "value": 3 }],
                "hiddenCols": [2]
            },
            "metadata": {
                "version": 7,
                "lastModifiedBy": "u1",
                "collaborators": ["u1", "u2"],
                "chartConfigs": [],
                "namedRanges": []
            }
        });
        let sheet =
            Sheet::from_document(serde_json::from_value(raw.clone()).unwrap(), SheetOptions::default())
                .unwrap();
        assert_eq!(serde_json::to_value(sheet.to_document()).unwrap(), raw);
    }
}
