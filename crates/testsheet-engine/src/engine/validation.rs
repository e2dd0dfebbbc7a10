//! Data-validation rules attached to cells.
//!
//! Rules are advisory: the sheet stores whatever the user typed and reports
//! violations separately, so a rule never blocks an edit.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::cell::keyword_enum;
use super::format::parse_number;

keyword_enum! {
    pub enum ValidationKind {
        /// Value must be one of `values`.
        List => "list",
        /// Value must be numeric and inside `min`..=`max`.
        Number => "number",
        /// Character count must be inside `min`..=`max`.
        TextLength => "textLength",
        /// Value must be a date serial inside `min`..=`max`.
        Date => "date",
        /// Formula-driven rules are stored but not checked.
        #[default]
        Custom => "custom",
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(rename = "type", default)]
    pub kind: ValidationKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_blank: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ValidationRule {
    pub fn list<I, S>(values: I) -> ValidationRule
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValidationRule {
            kind: ValidationKind::List,
            values: values.into_iter().map(Into::into).collect(),
            ..ValidationRule::default()
        }
    }

    pub fn number_between(min: f64, max: f64) -> ValidationRule {
        ValidationRule {
            kind: ValidationKind::Number,
            min: Some(min),
            max: Some(max),
            ..ValidationRule::default()
        }
    }

    /// Whether `value` satisfies the rule. Blank values pass unless `allowBlank` is false.
    pub fn accepts(&self, value: &str) -> bool {
        if value.is_empty() {
            return self.allow_blank.unwrap_or(true);
        }

        match &self.kind {
            ValidationKind::List => self.values.iter().any(|v| v == value),
            ValidationKind::Number | ValidationKind::Date => {
                parse_number(value).is_some_and(|n| self.within_bounds(n))
            }
            ValidationKind::TextLength => self.within_bounds(value.chars().count() as f64),
            ValidationKind::Custom | ValidationKind::Other(_) => true,
        }
    }

    fn within_bounds(&self, n: f64) -> bool {
        self.min.is_none_or(|min| n >= min) && self.max.is_none_or(|max| n <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_rule() {
        let rule = ValidationRule::list(["Pass", "Fail", "Blocked"]);
        assert!(rule.accepts("Pass"));
        assert!(!rule.accepts("pass"));
        assert!(rule.accepts(""));
    }

    #[test]
    fn test_number_rule_bounds() {
        let rule = ValidationRule::number_between(1.0, 5.0);
        assert!(rule.accepts("1"));
        assert!(rule.accepts("4.5"));
        assert!(!rule.accepts("6"));
        assert!(!rule.accepts("abc"));
    }

    #[test]
    fn test_blank_rejected_when_disallowed() {
        let rule = ValidationRule {
            allow_blank: Some(false),
            ..ValidationRule::list(["x"])
        };
        assert!(!rule.accepts(""));
    }

    #[test]
    fn test_text_length_rule_from_json() {
        let rule: ValidationRule =
            serde_json::from_str(r#"{"type":"textLength","max":3,"errorMessage":"too long"}"#)
                .unwrap();
        assert_eq!(rule.kind, ValidationKind::TextLength);
        assert!(rule.accepts("abc"));
        assert!(!rule.accepts("abcd"));
    }

    #[test]
    fn test_unknown_kind_accepts_and_is_written_back() {
        let rule: ValidationRule =
            serde_json::from_str(r#"{"type":"regex","pattern":"^T-"}"#).unwrap();
        assert_eq!(rule.kind, ValidationKind::Other("regex".into()));
        assert!(rule.accepts("anything"));
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            serde_json::json!({ "type": "regex", "pattern": "^T-" })
        );
    }
}
