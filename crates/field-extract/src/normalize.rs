use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use voterflow_core_types::Gender;

/// Canonicalize a free-form gender string.
///
/// Female forms are matched before the generic "male" substring check
/// because "female" contains "male". Returns `None` when nothing matches;
/// callers must treat that as "could not normalize", never as `Other`.
pub fn normalize_gender(input: &str) -> Option<Gender> {
    let value = input.trim().to_ascii_lowercase();
    if value.is_empty() {
        return None;
    }
    if value.contains("female") || value == "f" || value == "woman" {
        return Some(Gender::Female);
    }
    if value.contains("male") || value == "m" || value == "man" {
        return Some(Gender::Male);
    }
    if value.contains("other") || value == "o" {
        return Some(Gender::Other);
    }
    None
}

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-/\s.,]+(\d{1,2})[-/\s.,]+(\d{1,2})$").unwrap());
static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[-/\s.,]+(\d{1,2})[-/\s.,]+(\d{4})$").unwrap());
static MONTH_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*[-/\s.,]+(\d{1,2})[-/\s.,]+(\d{4})$")
        .unwrap()
});
static DAY_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[-/\s.,]+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*[-/\s.,]+(\d{4})$")
        .unwrap()
});

const MONTH_ABBREVS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

fn month_number(abbrev: &str) -> Option<u32> {
    MONTH_ABBREVS
        .iter()
        .position(|m| *m == abbrev)
        .map(|idx| idx as u32 + 1)
}

/// Parse a free-form date string into canonical `YYYY-MM-DD`.
///
/// Accepts ISO, numeric `N-N-YYYY` with -, /, space, dot or comma
/// separators, and 3-letter month-name forms in either order. For purely
/// numeric `N-N-YYYY` the leading group is treated as the month; the
/// source convention is ambiguous and this preserves it rather than
/// asserting it is correct. Range checks: year 1900..=current, month
/// 1..=12, day 1..=31 with no per-month day count. Out-of-range or
/// unrecognized input returns `None`.
pub fn normalize_date(input: &str) -> Option<String> {
    let value = input.trim().to_ascii_lowercase();
    if value.is_empty() {
        return None;
    }

    let (year, month, day): (i32, u32, u32) = if let Some(caps) = ISO_DATE.captures(&value) {
        (
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )
    } else if let Some(caps) = NUMERIC_DATE.captures(&value) {
        // Leading group resolves as the month.
        (
            caps[3].parse().ok()?,
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
        )
    } else if let Some(caps) = MONTH_FIRST.captures(&value) {
        (
            caps[3].parse().ok()?,
            month_number(&caps[1])?,
            caps[2].parse().ok()?,
        )
    } else if let Some(caps) = DAY_FIRST.captures(&value) {
        (
            caps[3].parse().ok()?,
            month_number(&caps[2])?,
            caps[1].parse().ok()?,
        )
    } else {
        return None;
    };

    let current_year = Utc::now().year();
    let in_range = (1900..=current_year).contains(&year)
        && (1..=12).contains(&month)
        && (1..=31).contains(&day);
    if !in_range {
        return None;
    }

    Some(format!("{year:04}-{month:02}-{day:02}"))
}
