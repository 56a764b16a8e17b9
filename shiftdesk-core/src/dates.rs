//! Date parsing for model-supplied arguments.
//!
//! Models are told to use ISO 8601 but older prompts asked for `YYYY/MM/DD`,
//! and full timestamps show up regularly. All of them normalize to a calendar
//! date; the client always receives `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// Parse a date in `YYYY-MM-DD`, `YYYY/MM/DD` or RFC 3339 form.
///
/// For timestamps the date part in the timestamp's own offset is kept.
pub fn parse_flexible_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y/%m/%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.date_naive());
    }
    if let Ok(ts) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ts.date_naive());
    }
    // Local timestamps without an offset
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|dt| dt.date())
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

fn invalid<E: serde::de::Error>(raw: &str) -> E {
    E::custom(format!(
        "invalid date '{}', expected YYYY-MM-DD, YYYY/MM/DD or RFC 3339",
        raw
    ))
}

/// `deserialize_with` helper for `Option<NaiveDate>`.
pub fn deserialize_opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_flexible_date(&s).map(Some).ok_or_else(|| invalid(&s)),
    }
}

/// `deserialize_with` helper for `Vec<NaiveDate>`; `null` becomes empty.
pub fn deserialize_date_list<'de, D>(deserializer: D) -> Result<Vec<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<String>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .iter()
        .map(|s| parse_flexible_date(s).ok_or_else(|| invalid(s)))
        .collect()
}

/// `deserialize_with` helper for `Option<Vec<NaiveDate>>`.
pub fn deserialize_opt_date_list<'de, D>(deserializer: D) -> Result<Option<Vec<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<String>> = Option::deserialize(deserializer)?;
    raw.map(|items| {
        items
            .iter()
            .map(|s| parse_flexible_date(s).ok_or_else(|| invalid(s)))
            .collect()
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_and_slash_dates() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(parse_flexible_date("2025-03-10"), Some(expected));
        assert_eq!(parse_flexible_date("2025/03/10"), Some(expected));
        assert_eq!(parse_flexible_date(" 2025-03-10 "), Some(expected));
    }

    #[test]
    fn test_parse_timestamps_keep_local_date() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(parse_flexible_date("2025-03-10T23:30:00-05:00"), Some(expected));
        assert_eq!(parse_flexible_date("2025-03-10T08:00:00Z"), Some(expected));
        assert_eq!(parse_flexible_date("2025-03-10T08:00:00"), Some(expected));
    }

    #[test]
    fn test_parse_local_timestamps_without_offset() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        assert_eq!(parse_flexible_date("2025-03-11T09:00"), Some(expected));
        assert_eq!(parse_flexible_date("2025-03-11T09:00:00.000"), Some(expected));
        assert_eq!(parse_flexible_date("2025-03-11 09:00:00"), Some(expected));
        assert_eq!(parse_flexible_date("2025-03-11 09:00"), Some(expected));
        assert_eq!(parse_flexible_date("2025-03-11 09:00:00.250"), Some(expected));
    }

    #[test]
    fn test_parse_timestamps_with_fraction_or_space_and_offset() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        assert_eq!(parse_flexible_date("2025-03-11T09:00:00.000Z"), Some(expected));
        assert_eq!(parse_flexible_date("2025-03-11 23:30:00-05:00"), Some(expected));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_flexible_date("tomorrow"), None);
        assert_eq!(parse_flexible_date("2025-13-01"), None);
        assert_eq!(parse_flexible_date(""), None);
        assert_eq!(parse_flexible_date("2025-03-11T25:00"), None);
    }
}
