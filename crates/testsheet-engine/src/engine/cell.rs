//! Cell data structures for the sheet grid.
//!
//! - [`CellData`] - A persisted cell: displayed value, optional formula, format, metadata
//! - [`Format`] / [`NumberFormat`] - Presentation attributes (never affect the value)
//! - [`CellPatch`] - A partial update merged over an existing cell
//! - [`Grid`] - Sparse cell storage (backed by `DashMap`)
//!
//! JSON field names follow the persisted document (`camelCase`). Keys this
//! crate does not model are kept in `extra` so a load/save cycle preserves them.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::cell_ref::CellRef;
use super::validation::ValidationRule;

/// A single cell as stored in the sheet document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    /// Displayed value. For formula cells, the last computed result.
    #[serde(default)]
    pub value: String,
    /// Formula source including the leading `=`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Format::is_default")]
    pub format: Format,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_validation: Option<ValidationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub merged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_range: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl CellData {
    pub fn literal(value: &str) -> CellData {
        CellData {
            value: value.to_string(),
            ..CellData::default()
        }
    }

    pub fn is_formula(&self) -> bool {
        self.formula.as_deref().is_some_and(|f| f.starts_with('='))
    }

    /// True when nothing about the cell differs from an absent cell.
    pub fn is_blank(&self) -> bool {
        *self == CellData::default()
    }

    /// Merge a patch over this cell. Formula/value interplay is resolved by the caller.
    pub fn apply(&mut self, patch: &CellPatch) {
        if let Some(value) = &patch.value {
            self.value = value.clone();
        }
        if let Some(formula) = &patch.formula {
            self.formula = Some(formula.clone());
        }
        if let Some(format) = &patch.format {
            self.format = format.clone();
        }
        if let Some(rule) = &patch.data_validation {
            self.data_validation = Some(rule.clone());
        }
        if let Some(note) = &patch.note {
            self.note = Some(note.clone()).filter(|n| !n.is_empty());
        }
        if let Some(link) = &patch.hyperlink {
            self.hyperlink = Some(link.clone()).filter(|l| !l.is_empty());
        }
        if let Some(merged) = patch.merged {
            self.merged = merged;
        }
        if let Some(range) = &patch.merge_range {
            self.merge_range = Some(range.clone()).filter(|r| !r.is_empty());
        }
    }
}

/// Partial cell update. `None` fields leave the existing cell untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellPatch {
    pub value: Option<String>,
    pub formula: Option<String>,
    pub format: Option<Format>,
    pub data_validation: Option<ValidationRule>,
    pub note: Option<String>,
    pub hyperlink: Option<String>,
    pub merged: Option<bool>,
    pub merge_range: Option<String>,
}

impl CellPatch {
    pub fn value(value: &str) -> CellPatch {
        CellPatch {
            value: Some(value.to_string()),
            ..CellPatch::default()
        }
    }

    pub fn formula(formula: &str) -> CellPatch {
        CellPatch {
            formula: Some(formula.to_string()),
            ..CellPatch::default()
        }
    }

    pub fn format(format: Format) -> CellPatch {
        CellPatch {
            format: Some(format),
            ..CellPatch::default()
        }
    }

    /// Editor input: text starting with `=` is a formula, anything else a literal.
    pub fn from_input(input: &str) -> CellPatch {
        if input.starts_with('=') {
            CellPatch::formula(input)
        } else {
            CellPatch::value(input)
        }
    }

    pub fn with_format(mut self, format: Format) -> CellPatch {
        self.format = Some(format);
        self
    }
}

/// Declares an enum of known keywords that serializes as a plain string.
/// Keywords outside the list are kept in an `Other` variant so a load/save
/// cycle writes them back unchanged.
macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// A keyword this crate does not interpret.
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $text,)+
                    $name::Other(keyword) => keyword,
                }
            }
        }

        impl From<String> for $name {
            fn from(keyword: String) -> Self {
                match keyword.as_str() {
                    $($text => $name::$variant,)+
                    _ => $name::Other(keyword),
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                match value {
                    $name::Other(keyword) => keyword,
                    known => known.as_str().to_string(),
                }
            }
        }
    };
}
pub(crate) use keyword_enum;

keyword_enum! {
    /// Number presentation applied at display time.
    pub enum NumberFormat {
        #[default]
        General => "general",
        Number => "number",
        Currency => "currency",
        Percentage => "percentage",
        Date => "date",
        Time => "time",
        Text => "text",
    }
}

keyword_enum! {
    pub enum TextAlign {
        #[default]
        Left => "left",
        Center => "center",
        Right => "right",
    }
}

keyword_enum! {
    pub enum VerticalAlign {
        #[default]
        Bottom => "bottom",
        Middle => "middle",
        Top => "top",
    }
}

/// Visual attributes of a cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_align: Option<VerticalAlign>,
    /// Border description, kept as the editor sent it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borders: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format: Option<NumberFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_text: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_rotation: Option<i32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Format {
    pub fn with_number_format(number_format: NumberFormat) -> Format {
        Format {
            number_format: Some(number_format),
            ..Format::default()
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Format::default()
    }
}

/// Sparse grid storage. Absent key = empty cell.
pub type Grid = DashMap<CellRef, CellData>;
