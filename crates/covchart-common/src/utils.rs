//! Shared utility functions.

use chrono::NaiveDate;

/// Formats a date the way progress messages print it, e.g. `05-11-2020`.
pub fn format_day(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Parses an ISO `YYYY-MM-DD` date or a day-first `DD/MM/YYYY` date.
pub fn parse_flexible_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%d/%m/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(input, "%d-%m-%Y"))
        .ok()
}

/// Formats a value rounded to an integer with thousands separators.
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Removes all whitespace, used to turn region names into file names.
pub fn strip_whitespace(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}
