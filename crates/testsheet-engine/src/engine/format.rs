//! Number parsing and display formatting.
//!
//! [`format_number`] is the canonical serialization of a computed number into
//! a cell value. [`format_for_display`] applies a cell's `numberFormat` when
//! rendering and never touches the stored value.

use chrono::{Duration, NaiveDate, NaiveTime};

use super::cell::{Format, NumberFormat};

/// Largest serial day rendered as a date (9999-12-31).
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

/// Separators and currency used when rendering numbers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayLocale {
    pub decimal_sep: char,
    pub thousands_sep: char,
    pub currency_symbol: String,
    /// Render the currency symbol after the amount (`1.234,50 €`).
    pub currency_suffix: bool,
}

impl DisplayLocale {
    pub fn en_us() -> Self {
        Self {
            decimal_sep: '.',
            thousands_sep: ',',
            currency_symbol: "$".to_string(),
            currency_suffix: false,
        }
    }

    pub fn de_de() -> Self {
        Self {
            decimal_sep: ',',
            thousands_sep: '.',
            currency_symbol: "€".to_string(),
            currency_suffix: true,
        }
    }

    /// Look up a locale by BCP-47 tag. Unknown tags return `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" => Some(Self::en_us()),
            "de" | "de-de" => Some(Self::de_de()),
            _ => None,
        }
    }
}

impl Default for DisplayLocale {
    fn default() -> Self {
        Self::en_us()
    }
}

/// Parse a cell value as a finite number. Surrounding whitespace is ignored.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Rust accepts "inf"/"nan"; cells holding those words are text.
    if trimmed
        .bytes()
        .any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E')
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Serialize a computed number into a cell value (`30`, `2.5`, `-0.125`).
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Also folds -0 into "0".
        return "0".to_string();
    }
    format!("{}", n)
}

/// Render a value with the cell's number format using the `en-US` locale.
pub fn format_for_display(value: &str, format: Option<&Format>) -> String {
    format_for_display_with_locale(value, format, &DisplayLocale::default())
}

/// Render a value with the cell's number format. Non-numeric values and the
/// `general`/`text` formats pass through unchanged, as do formats this crate
/// does not know.
pub fn format_for_display_with_locale(
    value: &str,
    format: Option<&Format>,
    locale: &DisplayLocale,
) -> String {
    let number_format = format
        .and_then(|f| f.number_format.clone())
        .unwrap_or_default();

    if matches!(
        number_format,
        NumberFormat::General | NumberFormat::Text | NumberFormat::Other(_)
    ) {
        return value.to_string();
    }

    let Some(n) = parse_number(value) else {
        return value.to_string();
    };

    let rendered = match number_format {
        NumberFormat::Number => Some(fixed_grouped(n, 2, locale)),
        NumberFormat::Currency => Some(currency(n, locale)),
        NumberFormat::Percentage => Some(format!("{}%", fixed_grouped(n * 100.0, 2, locale))),
        NumberFormat::Date => date_from_serial(n),
        NumberFormat::Time => time_from_fraction(n),
        NumberFormat::General | NumberFormat::Text | NumberFormat::Other(_) => None,
    };
    rendered.unwrap_or_else(|| value.to_string())
}

fn currency(n: f64, locale: &DisplayLocale) -> String {
    let sign = if n < 0.0 { "-" } else { "" };
    let amount = fixed_grouped(n.abs(), 2, locale);
    if locale.currency_suffix {
        format!("{}{} {}", sign, amount, locale.currency_symbol)
    } else {
        format!("{}{}{}", sign, locale.currency_symbol, amount)
    }
}

fn fixed_grouped(n: f64, decimals: usize, locale: &DisplayLocale) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let negative = n < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part, locale.thousands_sep));
    if !frac_part.is_empty() {
        out.push(locale.decimal_sep);
        out.push_str(frac_part);
    }
    out
}

fn group_thousands(int_part: &str, sep: char) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in int_part.chars().enumerate() {
        let remaining = len - i;
        out.push(ch);
        if remaining > 1 && remaining % 3 == 1 {
            out.push(sep);
        }
    }
    out
}

/// Serial day 0 is 1899-12-30, which lines up with spreadsheet serials from
/// March 1900 onwards (45292 is 2024-01-01).
fn date_from_serial(serial: f64) -> Option<String> {
    if !(-MAX_DATE_SERIAL..=MAX_DATE_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(Duration::days(serial.floor() as i64))?;
    Some(date.format("%-m/%-d/%Y").to_string())
}

fn time_from_fraction(n: f64) -> Option<String> {
    let fraction = n - n.floor();
    let seconds = ((fraction * 86_400.0).round() as u32) % 86_400;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)?;
    Some(time.format("%-I:%M:%S %p").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(value: &str, number_format: NumberFormat) -> String {
        format_for_display(value, Some(&Format::with_number_format(number_format)))
    }

    #[test]
    fn test_format_number_plain_and_fractional() {
        assert_eq!(format_number(30.0), "30");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(-12.75), "-12.75");
    }

    #[test]
    fn test_parse_number_rejects_words() {
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("12abc"), None);
    }

    #[test]
    fn test_currency_en_us() {
        assert_eq!(fmt("1234.5", NumberFormat::Currency), "$1,234.50");
        assert_eq!(fmt("-1234.5", NumberFormat::Currency), "-$1,234.50");
        assert_eq!(fmt("0", NumberFormat::Currency), "$0.00");
    }

    #[test]
    fn test_currency_de_de() {
        let format = Format::with_number_format(NumberFormat::Currency);
        let out = format_for_display_with_locale("1234567.891", Some(&format), &DisplayLocale::de_de());
        assert_eq!(out, "1.234.567,89 €");
    }

    #[test]
    fn test_number_and_percentage() {
        assert_eq!(fmt("1234567", NumberFormat::Number), "1,234,567.00");
        assert_eq!(fmt("0.25", NumberFormat::Percentage), "25.00%");
        assert_eq!(fmt("-0.001", NumberFormat::Number), "0.00");
    }

    #[test]
    fn test_date_and_time() {
        assert_eq!(fmt("45292", NumberFormat::Date), "1/1/2024");
        assert_eq!(fmt("45292.75", NumberFormat::Date), "1/1/2024");
        assert_eq!(fmt("0.5", NumberFormat::Time), "12:00:00 PM");
        assert_eq!(fmt("0.5625", NumberFormat::Time), "1:30:00 PM");
        assert_eq!(fmt("0", NumberFormat::Time), "12:00:00 AM");
    }

    #[test]
    fn test_passthrough_cases() {
        assert_eq!(fmt("hello", NumberFormat::Currency), "hello");
        assert_eq!(fmt("1234.5", NumberFormat::General), "1234.5");
        assert_eq!(fmt("1234.5", NumberFormat::Text), "1234.5");
        assert_eq!(format_for_display("1234.5", None), "1234.5");
        assert_eq!(fmt("99999999", NumberFormat::Date), "99999999");
        assert_eq!(fmt("1234.5", NumberFormat::Other("scientific".into())), "1234.5");
    }
}
