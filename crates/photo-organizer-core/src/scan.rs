use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, warn};

use crate::media::{is_photo, PhotoRecord};

/// List the photos directly inside `dir`. Subdirectories are not visited.
///
/// Results are sorted by file name so collision suffixes are assigned in a
/// stable order from one run to the next.
pub fn scan_photos(dir: &Path) -> anyhow::Result<Vec<PhotoRecord>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))?;

    let mut photos = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || !is_photo(&path) {
            continue;
        }
        match PhotoRecord::new(path) {
            Some(record) => photos.push(record),
            None => warn!(path = %entry.path().display(), "skipping file with a non UTF-8 name"),
        }
    }

    photos.sort_by(|a, b| a.filename.cmp(&b.filename));
    debug!(count = photos.len(), dir = %dir.display(), "scanned source directory");
    Ok(photos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_scan_is_flat_and_filtered() {
        let dir = tempdir().unwrap();
        for name in ["b.jpg", "a.PNG", "notes.txt", "c.Cr2"] {
            File::create(dir.path().join(name)).unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        File::create(dir.path().join("nested").join("d.jpg")).unwrap();
        fs::create_dir(dir.path().join("folder.jpg")).unwrap();

        let photos = scan_photos(dir.path()).unwrap();
        let names: Vec<&str> = photos.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, vec!["a.PNG", "b.jpg", "c.Cr2"]);
    }

    #[test]
    fn test_scan_missing_dir_fails() {
        let dir = tempdir().unwrap();
        assert!(scan_photos(&dir.path().join("missing")).is_err());
    }
}
