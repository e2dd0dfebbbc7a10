//! Cell coordinate parsing and formatting.
//!
//! Converts between spreadsheet labels (e.g. "A1", "Z1", "AA12") and
//! zero-based row/column indices. Column letters are a bijective base-26
//! numeral with no zero digit: A=0 .. Z=25, AA=26 .. ZZ=701, AAA=702.
//!
//! # Examples
//!
//! ```
//! use testsheet_engine::engine::{CellRef, label_of, parse_label};
//!
//! assert_eq!(label_of(0, 26), "AA1");
//! assert_eq!(parse_label("B3").unwrap(), CellRef::new(2, 1));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// A label that does not match `^[A-Z]+\d+$` or names no real cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid cell coordinate: {0}")]
pub struct InvalidCoordinate(pub String);

/// A cell position, zero-based. Ordering is row-major.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a label such as "C5". Letters must be upper case.
    pub fn parse(label: &str) -> Result<CellRef, InvalidCoordinate> {
        let invalid = || InvalidCoordinate(label.to_string());
        let caps = label_re().captures(label).ok_or_else(invalid)?;

        let col = Self::letters_to_col(&caps["letters"]).ok_or_else(invalid)?;
        let row = caps["digits"]
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(invalid)?;

        Ok(CellRef::new(row, col))
    }

    /// Convert a column index to letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut letters = Vec::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            letters.push(b'A' + (n % 26) as u8);
            n /= 26;
        }
        letters.reverse();
        String::from_utf8(letters).unwrap_or_default()
    }

    /// Inverse of [`CellRef::col_to_letters`]. `None` on overflow or bad input.
    pub fn letters_to_col(letters: &str) -> Option<usize> {
        if letters.is_empty() {
            return None;
        }
        let mut acc = 0usize;
        for b in letters.bytes() {
            if !b.is_ascii_uppercase() {
                return None;
            }
            let digit = (b - b'A') as usize + 1;
            acc = acc.checked_mul(26)?.checked_add(digit)?;
        }
        acc.checked_sub(1)
    }
}

/// Label for a zero-based row/column pair.
pub fn label_of(row: usize, col: usize) -> String {
    CellRef::new(row, col).to_string()
}

/// Parse a label into a zero-based coordinate.
pub fn parse_label(label: &str) -> Result<CellRef, InvalidCoordinate> {
    CellRef::parse(label)
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Z]+)(?<digits>[0-9]+)$").expect("label regex must compile")
    })
}

impl std::str::FromStr for CellRef {
    type Err = InvalidCoordinate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellRef::parse(s)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            CellRef::col_to_letters(self.col),
            self.row as u128 + 1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_of_known_columns() {
        assert_eq!(label_of(0, 0), "A1");
        assert_eq!(label_of(0, 25), "Z1");
        assert_eq!(label_of(0, 26), "AA1");
        assert_eq!(label_of(11, 26), "AA12");
        assert_eq!(label_of(0, 701), "ZZ1");
        assert_eq!(label_of(0, 702), "AAA1");
    }

    #[test]
    fn test_round_trip_first_three_letter_columns() {
        for col in 0..=800 {
            for row in [0, 1, 9, 99, 4095] {
                let label = label_of(row, col);
                assert_eq!(parse_label(&label).unwrap(), CellRef::new(row, col), "{}", label);
            }
        }
    }

    #[test]
    fn test_parse_rejects_malformed_labels() {
        for bad in ["", "A", "1", "1A", "a1", "A 1", "A1:B2", "A-1", "$A$1"] {
            assert_eq!(
                parse_label(bad),
                Err(InvalidCoordinate(bad.to_string())),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_rejects_row_zero() {
        assert!(parse_label("A0").is_err());
    }

    #[test]
    fn test_parse_overflow_is_invalid() {
        let huge = format!("{}1", "Z".repeat(40));
        assert!(parse_label(&huge).is_err());
        let huge_row = format!("A{}", "9".repeat(40));
        assert!(parse_label(&huge_row).is_err());
    }

    #[test]
    fn test_col_to_letters_handles_max_usize() {
        let letters = CellRef::col_to_letters(usize::MAX);
        assert!(!letters.is_empty());
        assert!(letters.bytes().all(|b| b.is_ascii_uppercase()));
    }

    #[test]
    fn test_from_str_and_ordering() {
        let a2: CellRef = "A2".parse().unwrap();
        let b1: CellRef = "B1".parse().unwrap();
        assert!(b1 < a2, "ordering is row-major");
    }
}
