//! Parsing helpers for dates submitted through HTML forms.

use time::{
    Date, PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

/// The format produced by `<input type="date">`, e.g. "2025-08-07".
const FORM_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The format produced by `<input type="datetime-local">`, e.g. "2025-08-07T14:30".
const FORM_DATE_TIME_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");

/// Parse a date from a date input, trimming surrounding whitespace.
pub fn parse_form_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), FORM_DATE_FORMAT).ok()
}

/// Parse a date-time from a datetime-local input, trimming surrounding
/// whitespace.
pub fn parse_form_date_time(raw: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(raw.trim(), FORM_DATE_TIME_FORMAT).ok()
}

/// Format a date-time for a datetime-local input value.
pub fn format_form_date_time(date_time: PrimitiveDateTime) -> String {
    date_time
        .format(FORM_DATE_TIME_FORMAT)
        .unwrap_or_else(|_| date_time.to_string())
}

#[cfg(test)]
mod form_date_tests {
    use time::macros::{date, datetime};

    use super::{format_form_date_time, parse_form_date, parse_form_date_time};

    #[test]
    fn parses_date_input_values() {
        assert_eq!(parse_form_date("2025-08-07"), Some(date!(2025 - 08 - 07)));
        assert_eq!(parse_form_date(" 2025-08-07 "), Some(date!(2025 - 08 - 07)));
    }

    #[test]
    fn rejects_garbage_dates() {
        assert_eq!(parse_form_date(""), None);
        assert_eq!(parse_form_date("07/08/2025"), None);
        assert_eq!(parse_form_date("2025-13-01"), None);
    }

    #[test]
    fn parses_datetime_local_values() {
        assert_eq!(
            parse_form_date_time("2025-08-07T14:30"),
            Some(datetime!(2025 - 08 - 07 14:30))
        );
    }

    #[test]
    fn round_trips_datetime_local_format() {
        let value = datetime!(2025 - 08 - 07 09:05);

        assert_eq!(
            parse_form_date_time(&format_form_date_time(value)),
            Some(value)
        );
    }
}
