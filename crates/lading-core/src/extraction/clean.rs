//! Value cleaning and optional date normalisation.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::config::DateFormat;

lazy_static! {
    static ref DATE_ISO: Regex = Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap();

    static ref DATE_NUMERIC: Regex =
        Regex::new(r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{2,4})$").unwrap();

    static ref DATE_DAY_MONTH: Regex =
        Regex::new(r"(?i)^(\d{1,2})\s+([a-z]{3,9})\.?,?\s+(\d{2,4})$").unwrap();

    static ref DATE_MONTH_DAY: Regex =
        Regex::new(r"(?i)^([a-z]{3,9})\.?\s+(\d{1,2}),?\s+(\d{2,4})$").unwrap();
}

/// Normalise an extracted value.
///
/// Runs of spaces and tabs collapse to one space, lines are trimmed and
/// blank lines dropped, then any leading or trailing run of `:`, `-` and
/// whitespace is stripped. Applying it twice gives the same result.
pub fn clean_value(raw: &str) -> String {
    let lines: Vec<String> = raw
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect();

    lines
        .join("\n")
        .trim_matches(|c: char| c == ':' || c == '-' || c.is_whitespace())
        .to_string()
}

/// Apply the configured date format. Returns `None` when the date
/// cannot be understood; the caller keeps the raw text in that case.
pub fn normalize_date(raw: &str, format: DateFormat) -> Option<String> {
    match format {
        DateFormat::Raw => Some(raw.to_string()),
        DateFormat::Iso8601 => parse_date(raw.trim()).map(|d| d.format("%Y-%m-%d").to_string()),
    }
}

/// Parse the date shapes found on Bills of Lading.
///
/// Numeric dates are read day-first; when the first number cannot be a
/// day-of-month pairing (month > 12) they are read month-first.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = DATE_ISO.captures(text) {
        return NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?);
    }

    if let Some(caps) = DATE_NUMERIC.captures(text) {
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let year = parse_year(&caps[3])?;

        return NaiveDate::from_ymd_opt(year, second, first)
            .or_else(|| NaiveDate::from_ymd_opt(year, first, second));
    }

    if let Some(caps) = DATE_DAY_MONTH.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        return NaiveDate::from_ymd_opt(parse_year(&caps[3])?, month, day);
    }

    if let Some(caps) = DATE_MONTH_DAY.captures(text) {
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(parse_year(&caps[3])?, month, day);
    }

    None
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    match s.len() {
        // Two-digit year: 00-50 are 2000s, 51-99 are 1900s
        2 if year <= 50 => Some(2000 + year),
        2 => Some(1900 + year),
        4 => Some(year),
        _ => None,
    }
}

fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?.to_ascii_uppercase();
    let month = match prefix.as_str() {
        "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AUG" => 8,
        "SEP" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DEC" => 12,
        _ => return None,
    };
    Some(month)
}
