use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use regex::Regex;
use std::sync::LazyLock;

use super::Timestamp;

static ZONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:(?P<named>utc|gmt|z)|(?P<sign>[+-])(?P<hh>\d{2}):?(?P<mm>\d{2}))$").unwrap()
});
static FRACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<clock>\d{1,2}:\d{2}:\d{2})[.,]\d+").unwrap());
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Date-and-time layouts, month-first where ambiguous.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%d %B %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
    "%b %d, %Y %H:%M:%S",
    "%B %d, %Y %I:%M:%S %p",
    "%b %d, %Y %I:%M:%S %p",
    "%B %d %Y %H:%M:%S",
    "%b %d %Y %H:%M:%S",
    "%Y%m%dT%H%M%S",
    "%Y%m%d %H%M%S",
];

/// Date-only layouts; the time defaults to midnight.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%Y%m%d",
];

/// Best-effort parser for non-EXIF timestamps (ISO-8601, RFC 2822,
/// spreadsheet exports). A trailing offset or `Z`/`UTC` makes the
/// result zone-aware; otherwise it is naive.
pub fn parse_freeform(raw: &str) -> Option<Timestamp> {
    let s = SPACE_RE.replace_all(raw.trim(), " ");
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Some(Timestamp::Aware(dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&s) {
        return Some(Timestamp::Aware(dt));
    }

    let (body, offset) = split_zone(&s);
    let body = FRACTION_RE.replace(body, "$clock");
    let naive = parse_naive(&body)?;

    match offset {
        Some(offset) => offset
            .from_local_datetime(&naive)
            .single()
            .map(Timestamp::Aware),
        None => Some(Timestamp::Naive(naive)),
    }
}

/// Split a trailing zone designator off the string. The zone only
/// counts when it follows a digit, so month names are never eaten.
fn split_zone(s: &str) -> (&str, Option<FixedOffset>) {
    let Some(caps) = ZONE_RE.captures(s) else {
        return (s, None);
    };
    let Some(whole) = caps.get(0) else {
        return (s, None);
    };
    let body = s[..whole.start()].trim_end();
    if !body.ends_with(|c: char| c.is_ascii_digit()) || !body.contains(':') {
        return (s, None);
    }

    match zone_offset(&caps) {
        Some(offset) => (body, Some(offset)),
        None => (s, None),
    }
}

fn zone_offset(caps: &regex::Captures<'_>) -> Option<FixedOffset> {
    if caps.name("named").is_some() {
        return FixedOffset::east_opt(0);
    }
    let hh: i32 = caps.name("hh")?.as_str().parse().ok()?;
    let mm: i32 = caps.name("mm")?.as_str().parse().ok()?;
    let secs = hh * 3600 + mm * 60;
    match caps.name("sign")?.as_str() {
        "-" => FixedOffset::west_opt(secs),
        _ => FixedOffset::east_opt(secs),
    }
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_naive_shapes() {
        let expected = Timestamp::Naive(naive("2021-05-01 10:00:00"));
        assert_eq!(parse_freeform("2021-05-01 10:00:00"), Some(expected));
        assert_eq!(parse_freeform("2021-05-01T10:00:00"), Some(expected));
        assert_eq!(parse_freeform("2021-05-01 10:00:00.250"), Some(expected));
        assert_eq!(parse_freeform("5/1/2021 10:00:00"), Some(expected));
        assert_eq!(parse_freeform("05/01/2021 10:00 AM"), Some(expected));
        assert_eq!(parse_freeform("May 1, 2021 10:00:00"), Some(expected));
        assert_eq!(parse_freeform("  2021-05-01   10:00:00 "), Some(expected));
    }

    #[test]
    fn test_date_only_is_midnight() {
        assert_eq!(
            parse_freeform("2021-05-01"),
            Some(Timestamp::Naive(naive("2021-05-01 00:00:00")))
        );
    }

    #[test]
    fn test_zone_aware_shapes() {
        let Some(Timestamp::Aware(dt)) = parse_freeform("2021-05-01T10:00:00Z") else {
            panic!("expected aware timestamp");
        };
        assert_eq!(dt.offset().local_minus_utc(), 0);

        let Some(Timestamp::Aware(dt)) = parse_freeform("2021-05-01 10:00:00 -0500") else {
            panic!("expected aware timestamp");
        };
        assert_eq!(dt.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(dt.naive_local(), naive("2021-05-01 10:00:00"));

        let Some(Timestamp::Aware(dt)) = parse_freeform("2021-05-01 10:00:00 UTC") else {
            panic!("expected aware timestamp");
        };
        assert_eq!(dt.naive_utc(), naive("2021-05-01 10:00:00"));
    }

    #[test]
    fn test_garbage_is_none() {
        assert!(parse_freeform("not a date").is_none());
        assert!(parse_freeform("nan").is_none());
        assert!(parse_freeform("2021-13-45 10:00:00").is_none());
    }
}
