//! Value and date normalization shared by the scorer and the reconciler.
//!
//! Both compared tables must go through the exact same normalization, so the
//! rules live here rather than inside the scorer.

use chrono::NaiveDate;

/// Characters stripped from values before comparison. Commas break numeric
/// comparison across locales; the rest are currency markers.
const STRIPPED_CHARS: [char; 4] = [',', '$', '\u{20AC}', '\u{A3}'];

/// Calendar formats attempted, most specific first. Four-digit-year formats
/// are tried before their two-digit variants so `02/21/2023` never parses as
/// year 20.
/// Comma-less month-name formats: commas are already stripped by
/// [`normalize_value`] before parsing.
const DATE_FORMATS: [&str; 12] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d %b %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%B %d %Y",
    "%m/%d/%y",
    "%d/%m/%y",
];

/// Clean a raw cell for comparison: trim, lowercase, strip commas and
/// currency symbols.
pub fn normalize_value(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect()
}

/// Normalize a date cell to canonical `YYYY-MM-DD`.
///
/// The value is first cleaned with [`normalize_value`], then parsed against
/// the common calendar formats. Values that fail to parse keep their
/// normalized string rather than erroring.
pub fn normalize_date(raw: &str) -> String {
    let cleaned = normalize_value(raw);
    match parse_date(&cleaned) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => cleaned,
    }
}

/// Attempt calendar parsing of an already-normalized value.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.is_empty() || value == crate::types::MISSING {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_value_strips_commas_and_currency() {
        assert_eq!(normalize_value("1,234.50"), "1234.50".to_lowercase());
        assert_eq!(normalize_value("$4,582.36"), "4582.36");
        assert_eq!(normalize_value("  ACC-12345  "), "acc-12345");
    }

    #[test]
    fn test_normalize_value_keeps_sentinel() {
        assert_eq!(normalize_value("-"), "-");
    }

    #[test]
    fn test_normalize_date_iso_passthrough() {
        assert_eq!(normalize_date("2023-01-31"), "2023-01-31");
    }

    #[test]
    fn test_normalize_date_us_format() {
        assert_eq!(normalize_date("02/21/2023"), "2023-02-21");
        assert_eq!(normalize_date("02/21/23"), "2023-02-21");
    }

    #[test]
    fn test_normalize_date_day_first_when_unambiguous() {
        // 21 cannot be a month, so the day-first format matches.
        assert_eq!(normalize_date("21/02/2023"), "2023-02-21");
    }

    #[test]
    fn test_normalize_date_month_name() {
        assert_eq!(normalize_date("21 Feb 2023"), "2023-02-21");
        assert_eq!(normalize_date("Feb 21, 2023"), "2023-02-21");
    }

    #[test]
    fn test_normalize_date_unparseable_kept() {
        assert_eq!(normalize_date("next tuesday"), "next tuesday");
        assert_eq!(normalize_date("-"), "-");
    }

    #[test]
    fn test_parse_date_rejects_sentinel_and_empty() {
        assert!(parse_date("-").is_none());
        assert!(parse_date("").is_none());
    }
}
