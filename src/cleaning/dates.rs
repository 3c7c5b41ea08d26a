//! Lenient date parsing over the common textual date formats

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Canonical output format for normalized date columns
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Month-first formats are tried before day-first ones.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse a cell as a calendar date, dropping any time-of-day component.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    // Shortest accepted form is "1-1-1"; bare numbers are never dates.
    if value.len() < 5 || !value.chars().any(|c| !c.is_ascii_digit()) {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.date_naive());
    }
    None
}

/// Parse and reformat to `YYYY-MM-DD`
pub fn normalize_date(value: &str) -> Option<String> {
    parse_date(value).map(|d| d.format(CANONICAL_DATE_FORMAT).to_string())
}

/// Days since 1970-01-01
pub fn epoch_days(date: NaiveDate) -> i64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days()
}

/// Fraction of the non-missing values that parse as dates, or `None` when
/// there are no non-missing values.
pub fn parse_ratio<'a, I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut total = 0usize;
    let mut parsed = 0usize;
    for value in values.into_iter().flatten() {
        total += 1;
        if parse_date(value).is_some() {
            parsed += 1;
        }
    }
    (total > 0).then(|| parsed as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_formats_normalize() {
        let cases = [
            ("2023-01-15", "2023-01-15"),
            ("2023/01/15", "2023-01-15"),
            ("01/15/2023", "2023-01-15"),
            ("15/01/2023", "2023-01-15"),
            ("15.01.2023", "2023-01-15"),
            ("Jan 15, 2023", "2023-01-15"),
            ("15 January 2023", "2023-01-15"),
            ("2023-01-15 08:30:00", "2023-01-15"),
            ("2023-01-15T08:30:00+02:00", "2023-01-15"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_date(input).as_deref(), Some(expected), "input {input}");
        }
    }

    #[test]
    fn test_month_first_is_preferred() {
        assert_eq!(normalize_date("03/04/2023").as_deref(), Some("2023-03-04"));
    }

    #[test]
    fn test_non_dates_rejected() {
        for input in ["", "hello", "12345", "A", "2023", "not-a-date"] {
            assert!(parse_date(input).is_none(), "input {input}");
        }
    }

    #[test]
    fn test_parse_ratio_ignores_missing() {
        let values = vec![Some("2023-01-01"), None, Some("2023-02-01"), Some("junk"), None];
        let ratio = parse_ratio(values).unwrap();
        assert!((ratio - 2.0 / 3.0).abs() < 1e-12);
        assert!(parse_ratio(vec![None, None]).is_none());
    }

    #[test]
    fn test_epoch_days() {
        let date = NaiveDate::from_ymd_opt(1970, 1, 11).unwrap();
        assert_eq!(epoch_days(date), 10);
    }
}
