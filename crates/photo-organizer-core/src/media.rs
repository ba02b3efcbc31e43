use std::path::{Path, PathBuf};

use crate::date::ResolvedDate;
use crate::geo::{Coordinates, ResolvedPlace};
use crate::metadata::ExifFields;

/// Lowercase extensions picked up by the source scan.
pub const PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "heif", "raw", "cr2", "nef", "arw",
];

/// Case-insensitive check against [`PHOTO_EXTENSIONS`].
pub fn is_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| {
            PHOTO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Everything learned about one photo while it moves through the pipeline.
/// Lives for a single iteration of the run loop.
#[derive(Debug, Clone)]
pub struct PhotoRecord {
    /// Path in the source directory
    pub source: PathBuf,
    /// Just the filename
    pub filename: String,
    /// Lowercased extension
    pub extension: String,
    /// Parsed EXIF fields, None if the file has none or is unreadable
    pub exif: Option<ExifFields>,
    pub date: Option<ResolvedDate>,
    pub coordinates: Option<Coordinates>,
    pub place: Option<ResolvedPlace>,
}

impl PhotoRecord {
    /// Returns None for paths without a UTF-8 file name.
    pub fn new(source: PathBuf) -> Option<Self> {
        let filename = source.file_name()?.to_str()?.to_string();
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        Some(Self {
            source,
            filename,
            extension,
            exif: None,
            date: None,
            coordinates: None,
            place: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_photo_ignores_case() {
        assert!(is_photo(Path::new("IMG_0001.JPG")));
        assert!(is_photo(Path::new("dir/shot.HeIc")));
        assert!(is_photo(Path::new("raw/DSC0001.arw")));
        assert!(!is_photo(Path::new("clip.mp4")));
        assert!(!is_photo(Path::new("notes.txt")));
        assert!(!is_photo(Path::new("jpg")));
    }

    #[test]
    fn test_record_from_path() {
        let record = PhotoRecord::new(PathBuf::from("/photos/IMG_1.JPEG")).unwrap();
        assert_eq!(record.filename, "IMG_1.JPEG");
        assert_eq!(record.extension, "jpeg");
        assert!(record.exif.is_none());
        assert!(record.date.is_none());
    }
}
