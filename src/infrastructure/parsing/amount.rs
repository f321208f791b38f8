use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

const CURRENCY_MARKERS: [&str; 2] = ["PLN", "zł"];

// Either thousands-grouped digits or a plain digit run, always with two decimals.
static AMOUNT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\d{1,3}(?:[\s\x{a0}]\d{3})*(?:[.,]\d{2})|\d+[.,]\d{2})")
        .expect("Amount pattern should compile")
});

static DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").expect("Date pattern should compile")
});

/// Parses a locale formatted amount such as `1 234,56 zł`.
///
/// Uses the last amount-like match in the text: amount cells sometimes carry a
/// reference number before the actual amount.
pub fn parse_amount(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }

    let cleaned = CURRENCY_MARKERS
        .iter()
        .fold(text.to_owned(), |acc, marker| acc.replace(marker, ""));

    let numeric = AMOUNT_REGEX.find_iter(&cleaned).last()?.as_str();
    let normalized = numeric
        .replace('\u{a0}', "")
        .replace(' ', "")
        .replace(',', ".");

    normalized.parse::<f64>().ok()
}

/// Parses a `DD.MM.YYYY` date. Anything else yields `None`.
///
/// The year must be exactly four unsigned digits; day and month may drop the
/// leading zero.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let captures = DATE_REGEX.captures(text.trim())?;
    let day = captures[1].parse().ok()?;
    let month = captures[2].parse().ok()?;
    let year = captures[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
