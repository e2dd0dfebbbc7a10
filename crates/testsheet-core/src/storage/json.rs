//! The JSON sheet document.
//!
//! ```json
//! { "data": { "cells": { "A1": { "value": "5" } }, "rows": 100, "cols": 26 },
//!   "metadata": { "version": 3, "lastModifiedBy": "u1", "collaborators": [] } }
//! ```
//!
//! Collections the engine does not interpret (charts, frozen panes, etc.) are
//! carried through as raw JSON. So are unknown keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use testsheet_engine::engine::CellData;

pub const DEFAULT_ROWS: usize = 100;
pub const DEFAULT_COLS: usize = 26;

fn default_rows() -> usize {
    DEFAULT_ROWS
}

fn default_cols() -> usize {
    DEFAULT_COLS
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetData {
    /// Cells keyed by label ("A1").
    #[serde(default)]
    pub cells: BTreeMap<String, CellData>,
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_cols")]
    pub cols: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charts: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_ranges: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen_rows: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen_cols: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_formats: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_rows: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_cols: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for SheetData {
    fn default() -> Self {
        SheetData {
            cells: BTreeMap::new(),
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            charts: None,
            named_ranges: None,
            frozen_rows: None,
            frozen_cols: None,
            conditional_formats: None,
            hidden_rows: None,
            hidden_cols: None,
            extra: Map::new(),
        }
    }
}

/// Collaboration metadata. User ids are opaque and never interpreted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetMetadata {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub last_modified_by: Value,
    #[serde(default)]
    pub collaborators: Vec<Value>,
    #[serde(default)]
    pub chart_configs: Vec<Value>,
    #[serde(default)]
    pub named_ranges: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetDocument {
    pub data: SheetData,
    #[serde(default)]
    pub metadata: SheetMetadata,
}

/// Parse a sheet document. Accepts the `{data, metadata}` envelope or a bare
/// `data` object.
pub fn parse_document(text: &str) -> serde_json::Result<SheetDocument> {
    let raw: Value = serde_json::from_str(text)?;
    let is_envelope = raw.get("data").is_some_and(Value::is_object);
    if is_envelope {
        serde_json::from_value(raw)
    } else {
        Ok(SheetDocument {
            data: serde_json::from_value(raw)?,
            metadata: SheetMetadata::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_envelope_keeps_unknown_keys() {
        let raw = json!({
            "data": {
                "cells": { "A1": { "value": "5" }, "B1": { "value": "10", "formula": "=A1*2" } },
                "rows": 50,
                "cols": 10,
                "frozenRows": 1,
                "charts": [{ "id": "c1" }],
                "theme": "dark"
            },
            "metadata": {
                "version": 4,
                "lastModifiedBy": "user-7",
                "collaborators": ["user-7", 12],
                "chartConfigs": [],
                "namedRanges": [],
                "locked": true
            }
        });
        let doc = parse_document(&raw.to_string()).unwrap();
        assert_eq!(doc.data.rows, 50);
        assert_eq!(doc.data.frozen_rows, Some(1));
        assert_eq!(doc.data.extra.get("theme"), Some(&json!("dark")));
        assert_eq!(doc.metadata.version, 4);
        assert_eq!(doc.metadata.extra.get("locked"), Some(&json!(true)));
        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn test_parse_bare_data_object() {
        let doc = parse_document(r#"{"cells":{"A1":{"value":"x"}}}"#).unwrap();
        assert_eq!(doc.data.cells["A1"].value, "x");
        assert_eq!(doc.data.rows, DEFAULT_ROWS);
        assert_eq!(doc.data.cols, DEFAULT_COLS);
        assert_eq!(doc.metadata, SheetMetadata::default());
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(parse_document("{\"cells\": ").is_err());
        assert!(parse_document("[1, 2]").is_err());
    }
}
