use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use exif::{Exif, In, Reader, Tag, Value};
use tracing::debug;

use crate::geo::Coordinates;

/// The subset of EXIF this tool cares about. Date tags are kept as raw
/// strings; the date resolver decides whether they parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifFields {
    pub date_time_original: Option<String>,
    pub date_time: Option<String>,
    pub date_time_digitized: Option<String>,
    pub gps: Option<Coordinates>,
}

/// Source of EXIF fields for a photo on disk.
pub trait MetadataSource {
    /// Never fails: unreadable files and files without EXIF yield None.
    fn read(&self, path: &Path) -> Option<ExifFields>;
}

/// [`MetadataSource`] backed by kamadak-exif. Handles JPEG, TIFF-based raw
/// formats, HEIF and PNG containers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifReader;

impl MetadataSource for ExifReader {
    fn read(&self, path: &Path) -> Option<ExifFields> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "cannot open file for EXIF");
                return None;
            }
        };
        match Reader::new().read_from_container(&mut BufReader::new(file)) {
            Ok(exif) => Some(ExifFields::from_exif(&exif)),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no readable EXIF");
                None
            }
        }
    }
}

impl ExifFields {
    pub fn from_exif(exif: &Exif) -> Self {
        Self {
            date_time_original: text_field(exif, Tag::DateTimeOriginal),
            date_time: text_field(exif, Tag::DateTime),
            date_time_digitized: text_field(exif, Tag::DateTimeDigitized),
            gps: gps_coordinates(exif),
        }
    }
}

fn text_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let text = match &field.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())?,
        _ => field.display_value().to_string(),
    };
    let text = text.trim_matches(|c: char| c == '\0' || c == '"' || c.is_whitespace());
    (!text.is_empty()).then(|| text.to_string())
}

fn gps_coordinates(exif: &Exif) -> Option<Coordinates> {
    let latitude = gps_degrees(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 'S')?;
    let longitude = gps_degrees(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 'W')?;
    Some(Coordinates::new(latitude, longitude))
}

/// Degrees/minutes/seconds rationals to signed decimal degrees. A missing
/// reference tag is read as north/east.
fn gps_degrees(exif: &Exif, coord_tag: Tag, ref_tag: Tag, negative: char) -> Option<f64> {
    let field = exif.get_field(coord_tag, In::PRIMARY)?;
    let degrees = match &field.value {
        Value::Rational(v) if v.len() >= 3 => {
            v[0].to_f64() + v[1].to_f64() / 60.0 + v[2].to_f64() / 3600.0
        }
        _ => return None,
    };
    let is_negative = exif
        .get_field(ref_tag, In::PRIMARY)
        .map_or(false, |r| r.display_value().to_string().contains(negative));
    Some(if is_negative { -degrees } else { degrees })
}
