//! `date`/`currentdate` (draft-ietf-sieve-date, shipped as RFC 5260 in most
//! implementations). Not enabled by default; this crate ships the date-part
//! extraction logic that a `date`/`currentdate` test would compare against,
//! but doesn't yet wire a `DateTest`/`CurrentDateTest` opcode through
//! [`crate::codegen`]/[`crate::interp`] — scripts naming these tests are
//! rejected at validation time ([`crate::validator`] maps `"date"` and
//! `"currentdate"` to [`crate::registry::Extension::Date`] already, so
//! turning this on is a codegen/interp change, not a new requirement
//! lookup).

/// The date-parts RFC 5260 §5 lets a script compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    Month,
    Day,
    Date,
    Julian,
    Hour,
    Minute,
    Second,
    Time,
    Iso8601,
    Std11,
    Zone,
    Weekday,
}

/// Extracts a date-part from an RFC 5322 `Date:`-shaped timestamp already
/// normalized to `YYYY-MM-DDTHH:MM:SS` by the host. Returns `None` rather
/// than guessing when the input doesn't parse, so callers can fall through
/// to "test doesn't match" instead of matching on garbage.
pub fn extract_part(iso_timestamp: &str, part: DatePart) -> Option<String> {
    let (date, time) = iso_timestamp.split_once('T')?;
    let mut date_fields = date.splitn(3, '-');
    let year = date_fields.next()?;
    let month = date_fields.next()?;
    let day = date_fields.next()?;
    Some(match part {
        DatePart::Year => year.to_string(),
        DatePart::Month => month.to_string(),
        DatePart::Day => day.to_string(),
        DatePart::Date => date.to_string(),
        DatePart::Time => time.to_string(),
        DatePart::Iso8601 => iso_timestamp.to_string(),
        DatePart::Hour => time.get(0..2)?.to_string(),
        DatePart::Minute => time.get(3..5)?.to_string(),
        DatePart::Second => time.get(6..8)?.to_string(),
        DatePart::Julian | DatePart::Std11 | DatePart::Zone | DatePart::Weekday => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_calendar_fields() {
        let ts = "2026-07-28T09:30:15";
        assert_eq!(extract_part(ts, DatePart::Year).as_deref(), Some("2026"));
        assert_eq!(extract_part(ts, DatePart::Month).as_deref(), Some("07"));
        assert_eq!(extract_part(ts, DatePart::Day).as_deref(), Some("28"));
        assert_eq!(extract_part(ts, DatePart::Hour).as_deref(), Some("09"));
    }

    #[test]
    fn unparseable_input_yields_none() {
        assert_eq!(extract_part("not-a-date", DatePart::Year), None);
    }
}
