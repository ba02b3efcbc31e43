use chrono::{NaiveDate, NaiveDateTime};

/// Parse an EXIF date tag. The standard shape is `YYYY:MM:DD HH:MM:SS` but
/// cameras and editors also write `-`, `/` or `.` separators, or only the
/// date part. Anything else is treated as absent.
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let cleaned = s
        .trim()
        .replace('-', ":")
        .replace('/', ":")
        .replace('\\', ":")
        .replace('.', ":");

    if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }

    let date_part = cleaned.split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(date_part, "%Y:%m:%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_standard_and_variant_separators() {
        for s in [
            "2024:12:24 15:30:22",
            "2024-12-24 15:30:22",
            "2024/12/24 15:30:22",
            "2024.12.24",
            "2024:12:24T15:30:22Z",
        ] {
            let dt = parse_exif_datetime(s).unwrap_or_else(|| panic!("failed on {s}"));
            assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 12, 24));
        }
    }

    #[test]
    fn test_malformed_is_absent() {
        assert!(parse_exif_datetime("").is_none());
        assert!(parse_exif_datetime("0000:00:00 00:00:00").is_none());
        assert!(parse_exif_datetime("2024:13:40 10:00:00").is_none());
        assert!(parse_exif_datetime("yesterday").is_none());
    }
}
