//! Timestamp parsing and the daily forecast grid.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Spelling family of a timestamp cell. A time column must use one family
/// throughout, so `01/02/2024` is never read month-first in one row and
/// day-first in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateStyle {
    /// `2024-03-05`, `2024-03-05T14:30:00`, RFC 3339 and `2024-03`
    Iso,
    /// `2024/03/05`
    YearSlash,
    /// `2024.03.05`
    YearDot,
    /// `03/05/2024`, optionally with a time of day
    MonthFirst,
    /// `05.03.2024`
    DayFirst,
    /// `5 Mar 2024`
    DayMonthName,
    /// `Mar 5, 2024` and `March 5, 2024`
    MonthNameDay,
}

const DATE_FORMATS: &[(&str, DateStyle)] = &[
    ("%Y-%m-%d", DateStyle::Iso),
    ("%Y/%m/%d", DateStyle::YearSlash),
    ("%Y.%m.%d", DateStyle::YearDot),
    ("%m/%d/%Y", DateStyle::MonthFirst),
    ("%d.%m.%Y", DateStyle::DayFirst),
    ("%d %b %Y", DateStyle::DayMonthName),
    ("%b %d, %Y", DateStyle::MonthNameDay),
    ("%B %d, %Y", DateStyle::MonthNameDay),
];

const DATETIME_FORMATS: &[(&str, DateStyle)] = &[
    ("%Y-%m-%d %H:%M:%S", DateStyle::Iso),
    ("%Y-%m-%d %H:%M:%S%.f", DateStyle::Iso),
    ("%Y-%m-%dT%H:%M:%S", DateStyle::Iso),
    ("%Y-%m-%dT%H:%M:%S%.f", DateStyle::Iso),
    ("%Y-%m-%d %H:%M", DateStyle::Iso),
    ("%Y-%m-%dT%H:%M", DateStyle::Iso),
    ("%m/%d/%Y %H:%M:%S", DateStyle::MonthFirst),
    ("%m/%d/%Y %H:%M", DateStyle::MonthFirst),
];

/// Parse a cell as a timestamp.
///
/// Date-only spellings resolve to midnight; RFC 3339 values with an offset
/// are converted to UTC. `YYYY-MM` resolves to the first of the month.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    parse_timestamp_styled(raw).map(|(dt, _)| dt)
}

/// Like [`parse_timestamp`], also reporting which spelling family matched.
pub fn parse_timestamp_styled(raw: &str) -> Option<(NaiveDateTime, DateStyle)> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for (fmt, style) in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some((d.and_time(NaiveTime::MIN), *style));
        }
    }

    for (fmt, style) in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some((dt, *style));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some((dt.naive_utc(), DateStyle::Iso));
    }

    // Year-month only
    if s.len() == 7 {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
            return Some((d.and_time(NaiveTime::MIN), DateStyle::Iso));
        }
    }

    None
}

/// Parse a request date (`start_date` / `end_date`), which must be `YYYY-MM-DD`.
pub fn parse_request_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ForecastError::InvalidDate {
        value: raw.to_string(),
    })
}

/// Every calendar day from `start` to `end`, both inclusive.
///
/// Empty when `end` is before `start`.
pub fn date_grid(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Fractional days since 1970-01-01T00:00:00.
pub fn days_since_epoch(dt: NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64 / 86_400_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_spellings() {
        let expected = ymd(2024, 3, 5).and_time(NaiveTime::MIN);
        for s in [
            "2024-03-05",
            "2024/03/05",
            "2024.03.05",
            "03/05/2024",
            "05.03.2024",
            "5 Mar 2024",
            "Mar 5, 2024",
            "March 5, 2024",
            " 2024-03-05 ",
        ] {
            assert_eq!(parse_timestamp(s), Some(expected), "spelling {:?}", s);
        }
    }

    #[test]
    fn test_parse_datetime_spellings() {
        let dt = parse_timestamp("2024-03-05 14:30:00").unwrap();
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.minute(), 30);

        let dt = parse_timestamp("2024-03-05T14:30").unwrap();
        assert_eq!(dt.minute(), 30);

        let dt = parse_timestamp("2024-03-05T14:30:00+02:00").unwrap();
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_parse_year_month() {
        assert_eq!(
            parse_timestamp("2024-03"),
            Some(ymd(2024, 3, 1).and_time(NaiveTime::MIN))
        );
    }

    #[test]
    fn test_spelling_families() {
        let style = |s: &str| parse_timestamp_styled(s).map(|(_, st)| st);
        for s in ["2024-03-05", "2024-03-05 14:30", "2024-03-05T14:30:00Z", "2024-03"] {
            assert_eq!(style(s), Some(DateStyle::Iso), "spelling {:?}", s);
        }
        assert_eq!(style("03/05/2024"), style("03/05/2024 14:30"));
        assert_eq!(style("Mar 5, 2024"), style("March 5, 2024"));
        assert_ne!(style("03/05/2024"), style("2024-03-05"));
        assert_ne!(style("05.03.2024"), style("2024.03.05"));
        assert_eq!(style("east"), None);
    }

    #[test]
    fn test_rejects_non_dates() {
        for s in ["east", "Q1 2024", "2024-13-01", "12", "", "abc-de"] {
            assert_eq!(parse_timestamp(s), None, "spelling {:?}", s);
        }
    }

    #[test]
    fn test_parse_request_date() {
        assert_eq!(parse_request_date("2024-01-03").unwrap(), ymd(2024, 1, 3));
        let err = parse_request_date("03/01/2024").unwrap_err();
        assert!(matches!(err, ForecastError::InvalidDate { .. }));
        assert!(parse_request_date("2024-02-30").is_err());
    }

    #[test]
    fn test_date_grid_inclusive() {
        let grid = date_grid(ymd(2024, 2, 27), ymd(2024, 3, 2));
        assert_eq!(
            grid,
            vec![
                ymd(2024, 2, 27),
                ymd(2024, 2, 28),
                ymd(2024, 2, 29),
                ymd(2024, 3, 1),
                ymd(2024, 3, 2),
            ]
        );
        assert_eq!(date_grid(ymd(2024, 1, 1), ymd(2024, 1, 1)).len(), 1);
        assert!(date_grid(ymd(2024, 1, 2), ymd(2024, 1, 1)).is_empty());
    }

    #[test]
    fn test_days_since_epoch() {
        let dt = ymd(1970, 1, 2).and_hms_opt(12, 0, 0).unwrap();
        assert!((days_since_epoch(dt) - 1.5).abs() < 1e-12);
    }
}
