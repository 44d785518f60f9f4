pub mod exif;
pub mod freeform;

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime};

/// A parsed capture time. EXIF clocks carry no zone; free-form input may.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl Timestamp {
    /// Wall-clock reading with any offset dropped.
    pub fn naive_local(&self) -> NaiveDateTime {
        match self {
            Timestamp::Naive(dt) => *dt,
            Timestamp::Aware(dt) => dt.naive_local(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Naive(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Timestamp::Aware(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%:z")),
        }
    }
}

/// Parse a manifest or EXIF timestamp string.
///
/// Strings whose first 10 characters contain a colon are treated as EXIF
/// (`YYYY:MM:DD HH:MM:SS`, trailing sub-seconds or offsets ignored).
/// Everything else goes through the free-form parser.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let head: String = s.chars().take(10).collect();
    if head.contains(':') {
        exif::parse_exif_timestamp(s).map(Timestamp::Naive)
    } else {
        freeform::parse_freeform(s)
    }
}

/// Absolute distance between two timestamps.
/// If either side is naive, both are compared as wall-clock times.
pub fn time_delta(a: &Timestamp, b: &Timestamp) -> Duration {
    let diff = match (a, b) {
        (Timestamp::Aware(x), Timestamp::Aware(y)) => x.signed_duration_since(*y),
        _ => a.naive_local().signed_duration_since(b.naive_local()),
    };
    diff.abs()
}

/// Inclusive tolerance check used by the time gate.
pub fn within_tolerance(a: &Timestamp, b: &Timestamp, tolerance: Duration) -> bool {
    time_delta(a, b) <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_colon_in_head() {
        let exif = parse_timestamp("2021:05:01 10:03:00").unwrap();
        let iso = parse_timestamp("2021-05-01 10:00:00").unwrap();
        assert!(matches!(exif, Timestamp::Naive(_)));
        assert!(matches!(iso, Timestamp::Naive(_)));
        assert_eq!(time_delta(&exif, &iso), Duration::minutes(3));
        assert!(parse_timestamp("   ").is_none());
    }

    #[test]
    fn test_mixed_naive_and_aware_compare_as_wall_clock() {
        let naive = parse_timestamp("2021:05:01 10:00:00").unwrap();
        let aware = parse_timestamp("2021-05-01T10:04:00+09:00").unwrap();
        assert!(matches!(aware, Timestamp::Aware(_)));
        assert_eq!(time_delta(&naive, &aware), Duration::minutes(4));
        assert_eq!(time_delta(&aware, &naive), Duration::minutes(4));
    }

    #[test]
    fn test_aware_pair_compares_instants() {
        let a = parse_timestamp("2021-05-01T10:00:00+00:00").unwrap();
        let b = parse_timestamp("2021-05-01T12:02:00+02:00").unwrap();
        assert_eq!(time_delta(&a, &b), Duration::minutes(2));
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let a = parse_timestamp("2021:05:01 10:00:00").unwrap();
        let b = parse_timestamp("2021:05:01 10:05:00").unwrap();
        let c = parse_timestamp("2021:05:01 10:05:01").unwrap();
        assert!(within_tolerance(&a, &b, Duration::minutes(5)));
        assert!(!within_tolerance(&a, &c, Duration::minutes(5)));
    }
}
