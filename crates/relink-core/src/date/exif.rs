use chrono::NaiveDateTime;

const EXIF_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Parse an EXIF-style `YYYY:MM:DD HH:MM:SS` string.
/// Only the first 19 characters are significant; sub-seconds and
/// offsets after them are dropped, so the result is always naive.
pub fn parse_exif_timestamp(s: &str) -> Option<NaiveDateTime> {
    let head: String = s.trim().chars().take(19).collect();
    NaiveDateTime::parse_from_str(&head, EXIF_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exif_variants() {
        let base = parse_exif_timestamp("2021:05:01 10:03:00").unwrap();
        assert_eq!(parse_exif_timestamp("2021:05:01 10:03:00.123"), Some(base));
        assert_eq!(parse_exif_timestamp("2021:05:01 10:03:00+09:00"), Some(base));
        assert!(parse_exif_timestamp("0000:00:00 00:00:00").is_none());
        assert!(parse_exif_timestamp("2021:05:01").is_none());
    }
}
