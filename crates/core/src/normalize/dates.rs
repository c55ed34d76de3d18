use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;

const LONG_FORM_PATTERNS: [&str; 4] = ["%B %d, %Y", "%b %d, %Y", "%Y/%m/%d", "%d %B %Y"];

fn iso_date() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T\s].*)?$")
            .expect("iso date pattern compiles")
    })
}

fn slash_date() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2}|\d{4})$").expect("slash date pattern compiles")
    })
}

/// Formats a loosely-typed date as `MM/DD/YYYY`, or returns the input unchanged.
///
/// ISO and slash dates are assembled from their captured components rather than
/// parsed as timestamps, so a date-only value never shifts by a day.
pub fn parse_flexible_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return raw.to_owned();
    }

    let parsed = parse_iso(trimmed)
        .or_else(|| parse_slash(trimmed))
        .or_else(|| parse_generic(trimmed));
    match parsed {
        Some(date) => date.format("%m/%d/%Y").to_string(),
        None => raw.to_owned(),
    }
}

fn parse_iso(value: &str) -> Option<NaiveDate> {
    let captures = iso_date().captures(value)?;
    let year = captures[1].parse().ok()?;
    let month = captures[2].parse().ok()?;
    let day = captures[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_slash(value: &str) -> Option<NaiveDate> {
    let captures = slash_date().captures(value)?;
    let month = captures[1].parse().ok()?;
    let day = captures[2].parse().ok()?;
    let year_digits = &captures[3];
    let mut year: i32 = year_digits.parse().ok()?;
    if year_digits.len() == 2 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_generic(value: &str) -> Option<NaiveDate> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc2822(value) {
        return Some(timestamp.date_naive());
    }
    LONG_FORM_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDate::parse_from_str(value, pattern).ok())
}
