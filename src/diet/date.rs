use serde::Serializer;
use time::{macros::format_description, Date};

use crate::error::DietError;

/// Normalizes a client date string into the calendar date used as the record key.
///
/// Accepts `YYYY-MM-DD` and the unpadded `YYYY-M-D` spelling; surrounding
/// whitespace is ignored. Every read and write path goes through here.
pub fn parse_record_date(raw: &str) -> Result<Date, DietError> {
    Date::parse(
        raw.trim(),
        format_description!("[year]-[month padding:none]-[day padding:none]"),
    )
    .map_err(|_| DietError::InvalidDate(raw.to_string()))
}

/// Serde `serialize_with` writing the canonical `YYYY-MM-DD` form.
pub fn serialize_record_date<S: Serializer>(date: &Date, s: S) -> Result<S::Ok, S::Error> {
    let text = date
        .format(format_description!("[year]-[month]-[day]"))
        .map_err(serde::ser::Error::custom)?;
    s.serialize_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[derive(serde::Serialize)]
    struct Wire {
        #[serde(serialize_with = "serialize_record_date")]
        date: Date,
    }

    #[test]
    fn parses_canonical_form() {
        assert_eq!(parse_record_date("2024-01-15").unwrap(), date!(2024 - 01 - 15));
    }

    #[test]
    fn unpadded_and_padded_spellings_agree() {
        let a = parse_record_date("2024-01-05").unwrap();
        let b = parse_record_date("2024-1-5").unwrap();
        let c = parse_record_date("  2024-01-5 ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn rejects_malformed_input() {
        for raw in [
            "",
            "2024",
            "2024-01",
            "2024-01-15-01",
            "24-01-15",
            "2024/01/15",
            "2024-001-15",
            "2024-0a-15",
            "15-01-2024",
            "2024-01-15T00:00:00",
        ] {
            let err = parse_record_date(raw).unwrap_err();
            assert!(matches!(err, DietError::InvalidDate(_)), "{raw:?} should be invalid");
        }
    }

    #[test]
    fn rejects_impossible_calendar_dates() {
        assert!(parse_record_date("2024-02-30").is_err());
        assert!(parse_record_date("2024-13-01").is_err());
        assert!(parse_record_date("2024-00-10").is_err());
        assert!(parse_record_date("2023-02-29").is_err());
        assert!(parse_record_date("2024-02-29").is_ok());
    }

    #[test]
    fn serializes_zero_padded() {
        let parsed = parse_record_date("2024-1-5").unwrap();
        let json = serde_json::to_value(Wire { date: parsed }).unwrap();
        assert_eq!(json["date"], "2024-01-05");
    }
}
