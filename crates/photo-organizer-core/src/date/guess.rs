use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

struct DatePattern {
    regex: &'static LazyLock<Regex>,
    format: &'static str,
}

static RE_DASH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}(0[1-9]|1[0-2])[0-3]\d-\d{6})").unwrap());
static RE_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}(0[1-9]|1[0-2])[0-3]\d_\d{6})").unwrap());
static RE_ALL_DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}-(0[1-9]|1[0-2])-[0-3]\d-\d{2}-\d{2}-\d{2})").unwrap());
static RE_DASHED_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}-(0[1-9]|1[0-2])-[0-3]\d-\d{6})").unwrap());
static RE_ALL_UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}_(0[1-9]|1[0-2])_[0-3]\d_\d{2}_\d{2}_\d{2})").unwrap());
static RE_COMPACT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|\D)(?P<date>(20|19|18)\d{2}(0[1-9]|1[0-2])[0-3]\d[0-2]\d[0-5]\d[0-5]\d)(?:\D|$)").unwrap());
// Bare calendar date. Digit boundaries are checked by the caller so that
// neighbouring candidates are not swallowed by the match.
static RE_DATE_ONLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(20|19|18)\d{2}[-_]?(0[1-9]|1[0-2])[-_]?[0-3]\d").unwrap());

static PATTERNS: &[DatePattern] = &[
    DatePattern { regex: &RE_DASH, format: "%Y%m%d-%H%M%S" },
    DatePattern { regex: &RE_UNDERSCORE, format: "%Y%m%d_%H%M%S" },
    DatePattern { regex: &RE_ALL_DASHES, format: "%Y-%m-%d-%H-%M-%S" },
    DatePattern { regex: &RE_DASHED_DATE, format: "%Y-%m-%d-%H%M%S" },
    DatePattern { regex: &RE_ALL_UNDERSCORES, format: "%Y_%m_%d_%H_%M_%S" },
    DatePattern { regex: &RE_COMPACT, format: "%Y%m%d%H%M%S" },
];

/// Find a capture timestamp embedded in a file name, e.g.
/// `IMG_20241224_153022.jpg` or `photo_2024-12-26.png`.
///
/// Full timestamps are tried first, then a bare date (midnight). Shapes that
/// match but are not real calendar dates are skipped.
pub fn guess_date_from_filename(filename: &str) -> Option<NaiveDateTime> {
    let basename = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    for pat in PATTERNS {
        if let Some(date_str) = pat.regex.captures(basename).and_then(|c| c.name("date")) {
            if let Ok(dt) = NaiveDateTime::parse_from_str(date_str.as_str(), pat.format) {
                return Some(dt);
            }
        }
    }

    let bytes = basename.as_bytes();
    let mut pos = 0;
    while let Some(m) = RE_DATE_ONLY.find_at(basename, pos) {
        let digit_before = m.start() > 0 && bytes[m.start() - 1].is_ascii_digit();
        let digit_after = bytes.get(m.end()).is_some_and(u8::is_ascii_digit);
        if !digit_before && !digit_after {
            let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
            if let Some(dt) = NaiveDate::parse_from_str(&digits, "%Y%m%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
            {
                return Some(dt);
            }
        }
        // Matches start with an ASCII digit, so the next byte is a char boundary.
        pos = m.start() + 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_guess_patterns() {
        assert!(guess_date_from_filename("Screenshot_20190919-053857.jpg").is_some());
        assert!(guess_date_from_filename("IMG_20190509_154733.jpg").is_some());
        assert!(guess_date_from_filename("signal-2020-10-26-163832.jpg").is_some());
        assert!(guess_date_from_filename("2016_01_30_11_49_15.mp4").is_some());
        assert!(guess_date_from_filename("20180101123000.jpg").is_some());
        assert!(guess_date_from_filename("random_photo.jpg").is_none());
    }

    #[test]
    fn test_timestamp_keeps_time() {
        let dt = guess_date_from_filename("IMG_20241224_153022.jpg").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 12, 24));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (15, 30, 22));
    }

    #[test]
    fn test_bare_dates() {
        for name in ["photo_2024-12-26.png", "2024_12_26 beach.jpg", "scan20241226.jpg"] {
            let dt = guess_date_from_filename(name).unwrap_or_else(|| panic!("failed on {name}"));
            assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 12, 26));
            assert_eq!(dt.hour(), 0);
        }
    }

    #[test]
    fn test_rejects_impossible_and_embedded_digits() {
        assert!(guess_date_from_filename("IMG_20240231.jpg").is_none());
        assert!(guess_date_from_filename("DSC120241226999.jpg").is_none());
        assert!(guess_date_from_filename("IMG_1234.jpg").is_none());
    }

    #[test]
    fn test_valid_date_after_invalid_one() {
        for name in ["2024-02-30_2024-12-26.jpg", "2024-02-30 2024-12-26.jpg"] {
            let dt = guess_date_from_filename(name).unwrap_or_else(|| panic!("failed on {name}"));
            assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 12, 26));
        }
    }
}
