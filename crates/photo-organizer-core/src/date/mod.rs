pub mod exif;
pub mod guess;

use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::metadata::ExifFields;

/// Which source supplied a resolved date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateSource {
    ExifOriginal,
    ExifDateTime,
    ExifDigitized,
    Filename,
    FileModified,
}

impl DateSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DateSource::ExifOriginal => "exif-original",
            DateSource::ExifDateTime => "exif-datetime",
            DateSource::ExifDigitized => "exif-digitized",
            DateSource::Filename => "filename",
            DateSource::FileModified => "file-modified",
        }
    }

    pub fn is_exif(self) -> bool {
        matches!(
            self,
            DateSource::ExifOriginal | DateSource::ExifDateTime | DateSource::ExifDigitized
        )
    }
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar day a photo is filed under, with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub source: DateSource,
}

impl ResolvedDate {
    /// `YYYY-MM-DD`
    pub fn folder_prefix(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

type Extractor<'a> = (DateSource, Box<dyn Fn() -> Option<NaiveDate> + 'a>);

/// Resolve the capture date, first match wins:
/// DateTimeOriginal, DateTime, DateTimeDigitized, a timestamp in the file
/// name, then the file's modification time. The last step always succeeds.
pub fn resolve_date(
    exif: Option<&ExifFields>,
    filename: &str,
    fs_mtime: SystemTime,
) -> ResolvedDate {
    let chain: [Extractor<'_>; 4] = [
        (
            DateSource::ExifOriginal,
            Box::new(move || exif_tag(exif, |e| e.date_time_original.as_deref())),
        ),
        (
            DateSource::ExifDateTime,
            Box::new(move || exif_tag(exif, |e| e.date_time.as_deref())),
        ),
        (
            DateSource::ExifDigitized,
            Box::new(move || exif_tag(exif, |e| e.date_time_digitized.as_deref())),
        ),
        (
            DateSource::Filename,
            Box::new(move || guess::guess_date_from_filename(filename).map(|dt| dt.date())),
        ),
    ];

    let resolved = chain
        .iter()
        .find_map(|(source, extract)| {
            extract().map(|date| ResolvedDate {
                date,
                source: *source,
            })
        })
        .unwrap_or_else(|| ResolvedDate {
            date: DateTime::<Local>::from(fs_mtime).date_naive(),
            source: DateSource::FileModified,
        });

    debug!(filename, date = %resolved.date, source = %resolved.source, "resolved date");
    resolved
}

fn exif_tag(
    exif: Option<&ExifFields>,
    pick: impl Fn(&ExifFields) -> Option<&str>,
) -> Option<NaiveDate> {
    let raw = pick(exif?)?;
    let parsed = exif::parse_exif_datetime(raw);
    if parsed.is_none() {
        debug!(value = raw, "ignoring malformed EXIF date");
    }
    parsed.map(|dt| dt.date())
}
