use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Date-time layouts tried in order when no offset is present.
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%y %H:%M:%S%.f",
    "%m/%d/%y %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M:%S%.f UTC",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d %Y %H:%M:%S",
];

const DATETIME_OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%a %b %d %Y %H:%M:%S GMT%z",
];

const DATE_FORMATS: &[&str] = &[
    // two-digit years first: `%Y` would read `1/12/23` as year 1 or 23
    "%m/%d/%y",
    "%m-%d-%y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d-%b-%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%a %B %d %Y",
];

/// Permissive parse of a free-text date or date-time into UTC.
///
/// Accepts RFC 3339, RFC 2822, the layouts above, a bare four-digit year
/// and the `Date.toString()` shape with its trailing `(zone name)`. Values
/// without an offset are read as UTC. Returns `None` for anything that is
/// not a real calendar instant (bad layout, Feb 30, hour 25, ...).
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    // "Sun Jan 15 2023 00:00:00 GMT+0000 (Coordinated Universal Time)"
    let s = match s.find(" (") {
        Some(i) if s.ends_with(')') => s[..i].trim_end(),
        _ => s,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return to_utc(naive);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return to_utc(date.and_time(NaiveTime::MIN));
        }
    }
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year = s.parse::<i32>().ok()?;
        return to_utc(NaiveDate::from_ymd_opt(year, 1, 1)?.and_time(NaiveTime::MIN));
    }
    None
}

fn to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Utc.from_local_datetime(&naive).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn ymd(dt: DateTime<Utc>) -> (i32, u32, u32) {
        (dt.year(), dt.month(), dt.day())
    }

    #[test]
    fn iso_date_is_midnight_utc() {
        let dt = parse_datetime("2023-01-15").unwrap();
        assert_eq!(ymd(dt), (2023, 1, 15));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (0, 0, 0));
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let dt = parse_datetime("2023-01-15T22:30:00-05:00").unwrap();
        assert_eq!(ymd(dt), (2023, 1, 16));
        assert_eq!(dt.hour(), 3);

        let dt = parse_datetime("Sun, 15 Jan 2023 10:00:00 +0000").unwrap();
        assert_eq!(ymd(dt), (2023, 1, 15));
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn common_provider_layouts() {
        for s in [
            "2023/01/15",
            "01/15/2023",
            "1/15/2023",
            "January 15, 2023",
            "Jan 15 2023",
            "15 January 2023",
            "2023-01-15 08:15:00",
            "2023-01-15T08:15",
            "01/15/2023 08:15",
        ] {
            let dt = parse_datetime(s).unwrap_or_else(|| panic!("failed on {s}"));
            assert_eq!(ymd(dt), (2023, 1, 15), "{s}");
        }
    }

    #[test]
    fn two_digit_years_are_this_century() {
        let dt = parse_datetime("1/15/23").unwrap();
        assert_eq!(ymd(dt), (2023, 1, 15));

        let dt = parse_datetime("01/15/23 10:30").unwrap();
        assert_eq!(ymd(dt), (2023, 1, 15));
        assert_eq!((dt.hour(), dt.minute()), (10, 30));

        assert_eq!(ymd(parse_datetime("01-15-23").unwrap()), (2023, 1, 15));
        assert_eq!(ymd(parse_datetime("1/12/23").unwrap()), (2023, 1, 12));
        assert_eq!(ymd(parse_datetime("1/15/2023").unwrap()), (2023, 1, 15));
    }

    #[test]
    fn looser_layouts() {
        let dt = parse_datetime("2023-01-15 10:00:00 UTC").unwrap();
        assert_eq!(ymd(dt), (2023, 1, 15));
        assert_eq!(dt.hour(), 10);

        assert_eq!(ymd(parse_datetime("15-Jan-2023").unwrap()), (2023, 1, 15));
        assert_eq!(ymd(parse_datetime("2023").unwrap()), (2023, 1, 1));

        let dt = parse_datetime("Sun Jan 15 2023 22:00:00 GMT-0500 (Eastern Standard Time)")
            .unwrap();
        assert_eq!(ymd(dt), (2023, 1, 16));
        assert_eq!(dt.hour(), 3);
        let dt = parse_datetime("Sun Jan 15 2023 00:00:00 GMT+0000").unwrap();
        assert_eq!(ymd(dt), (2023, 1, 15));
    }

    #[test]
    fn rejects_impossible_dates() {
        assert_eq!(parse_datetime("2023-02-30"), None);
        assert_eq!(parse_datetime("2023-13-01"), None);
        assert_eq!(parse_datetime("2023-01-15 25:00"), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_datetime("not-a-date"), None);
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("   "), None);
        assert_eq!(parse_datetime("20000"), None);
    }
}
