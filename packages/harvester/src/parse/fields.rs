//! Field-level parsers for rate table cells.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::config::DELIMITER;

/// Fractional digits kept on every rate.
const RATE_SCALE: u32 = 4;

/// Escaped quote sequence some exports leave in text cells.
const ESCAPED_QUOTE: &str = "\\u0022";

/// Date-only layouts tried after the regional and ISO forms.
const FALLBACK_DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%Y/%m/%d", "%d.%m.%Y"];

/// Date-time layouts whose date part is kept.
const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Split a row on the table delimiter.
pub fn split_row(line: &str) -> Vec<&str> {
    line.split(DELIMITER).collect()
}

/// Parse a rate cell, accepting `.` or `,` as the decimal separator.
///
/// The result is rounded to 4 fractional digits (banker's rounding).
///
/// # Examples
/// ```
/// use ibptax_harvester::parse::parse_decimal;
///
/// assert_eq!(parse_decimal("13,45").unwrap().to_string(), "13.45");
/// assert_eq!(parse_decimal("1.23456").unwrap().to_string(), "1.2346");
/// assert!(parse_decimal("n/a").is_none());
/// ```
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let value = value.replace(',', ".");
    Decimal::from_str(&value)
        .or_else(|_| Decimal::from_scientific(&value))
        .ok()
        .map(|d| d.round_dp(RATE_SCALE))
}

/// Parse a date cell and render it as ISO `yyyy-MM-dd`.
///
/// Tries `dd/MM/yyyy`, then `yyyy-MM-dd`, then a handful of other common
/// layouts. Returns `None` when nothing matches.
///
/// # Examples
/// ```
/// use ibptax_harvester::parse::parse_date;
///
/// assert_eq!(parse_date("01/03/2024").as_deref(), Some("2024-03-01"));
/// assert_eq!(parse_date("2024-03-01").as_deref(), Some("2024-03-01"));
/// assert!(parse_date("31/02/2024").is_none());
/// ```
pub fn parse_date(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let date = NaiveDate::parse_from_str(value, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
        .or_else(|| parse_date_lenient(value))?;

    Some(date.format("%Y-%m-%d").to_string())
}

fn parse_date_lenient(value: &str) -> Option<NaiveDate> {
    FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            FALLBACK_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Clean a free-text cell.
///
/// Trims, strips one layer of matching `"` or `'` quotes, unescapes
/// `\u0022` to a literal quote, and maps blank results to `None`.
///
/// # Examples
/// ```
/// use ibptax_harvester::parse::clean_text;
///
/// assert_eq!(clean_text("  \"Bovinos\"  ").as_deref(), Some("Bovinos"));
/// assert_eq!(clean_text("'  '"), None);
/// ```
pub fn clean_text(value: &str) -> Option<String> {
    let mut text = value.trim();
    if text.is_empty() {
        return None;
    }

    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            text = &text[1..text.len() - 1];
            break;
        }
    }

    let text = text.replace(ESCAPED_QUOTE, "\"");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
