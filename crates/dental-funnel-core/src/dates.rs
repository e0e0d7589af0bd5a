//! Date helpers for the ISO-8601 strings stored on records.

use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date as `YYYY-MM-DD` (UTC).
pub fn today() -> String {
    chrono::Utc::now().date_naive().format(DATE_FORMAT).to_string()
}

/// Current time of day as `HH:MM` (UTC).
pub fn now_hhmm() -> String {
    chrono::Utc::now().format("%H:%M").to_string()
}

/// Parse a date, datetime or RFC 3339 timestamp down to its calendar date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(ts.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Last calendar day of the month (leap-year aware).
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Month immediately before the given one.
pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15"), Some(expected));
        assert_eq!(parse_date("2024-03-15T10:30:00"), Some(expected));
        assert_eq!(parse_date("2024-03-15T10:30:00+09:00"), Some(expected));
        assert_eq!(parse_date(" 2024-03-15 "), Some(expected));
        assert_eq!(parse_date("15/03/2024"), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2024, 2).unwrap().day(), 29);
        assert_eq!(last_day_of_month(2023, 2).unwrap().day(), 28);
        assert_eq!(last_day_of_month(2024, 12).unwrap().day(), 31);
        assert_eq!(last_day_of_month(2024, 4).unwrap().day(), 30);
        assert!(last_day_of_month(2024, 13).is_none());
    }

    #[test]
    fn test_previous_month_wraps_year() {
        assert_eq!(previous_month(2024, 1), (2023, 12));
        assert_eq!(previous_month(2024, 7), (2024, 6));
    }
}
