use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};

/// How a file reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveMethod {
    Rename,
    /// Cross-volume: verified copy, then source removed.
    Copy,
}

/// Move `source` to `destination`, which must not exist yet.
///
/// A plain rename is used when possible. Across volumes the file is copied to
/// a hidden partial file next to the destination, checked against the source
/// digest, renamed into place, and only then is the source removed. On any
/// failure the source is left untouched and partial output is removed.
pub fn move_file(source: &Path, destination: &Path) -> Result<MoveMethod> {
    if let Err(e) = fs::metadata(source) {
        return Err(Error::SourceUnavailable {
            path: source.to_path_buf(),
            source: e,
        });
    }
    if destination.symlink_metadata().is_ok() {
        return Err(move_error(
            source,
            destination,
            io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
        ));
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(MoveMethod::Rename),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %source.display(), to = %destination.display(), "rename crosses devices, copying");
            copy_then_remove(source, destination)?;
            Ok(MoveMethod::Copy)
        }
        Err(e) => Err(move_error(source, destination, e)),
    }
}

pub(crate) fn copy_then_remove(source: &Path, destination: &Path) -> Result<()> {
    let partial = partial_path(destination);

    let placed = copy_verified(source, &partial).and_then(|()| fs::rename(&partial, destination));
    if let Err(e) = placed {
        let _ = fs::remove_file(&partial);
        return Err(move_error(source, destination, e));
    }

    if let Err(e) = fs::remove_file(source) {
        // Keep the file in exactly one place.
        let _ = fs::remove_file(destination);
        return Err(move_error(source, destination, e));
    }
    Ok(())
}

fn copy_verified(source: &Path, target: &Path) -> io::Result<()> {
    let mut input = File::open(source)?;
    let metadata = input.metadata()?;
    let mut output = File::create_new(target)?;
    io::copy(&mut input, &mut output)?;
    output.sync_all()?;
    drop(output);

    if digest(source)? != digest(target)? {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "copied file does not match source",
        ));
    }

    fs::set_permissions(target, metadata.permissions())?;
    filetime::set_file_mtime(target, FileTime::from_last_modification_time(&metadata))?;
    Ok(())
}

fn digest(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut File::open(path)?, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn partial_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.partial", name))
}

fn move_error(from: &Path, to: &Path, source: io::Error) -> Error {
    Error::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write(path: &Path, bytes: &[u8]) {
        File::create(path).unwrap().write_all(bytes).unwrap();
    }

    #[test]
    fn test_rename_within_volume() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        let dst = dir.path().join("out.jpg");
        write(&src, b"pixels");

        assert_eq!(move_file(&src, &dst).unwrap(), MoveMethod::Rename);
        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"pixels");
    }

    #[test]
    fn test_never_overwrites() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        let dst = dir.path().join("b.jpg");
        write(&src, b"new");
        write(&dst, b"old");

        assert!(matches!(move_file(&src, &dst), Err(Error::Move { .. })));
        assert_eq!(fs::read(&src).unwrap(), b"new");
        assert_eq!(fs::read(&dst).unwrap(), b"old");
    }

    #[test]
    fn test_missing_source() {
        let dir = tempdir().unwrap();
        let err = move_file(&dir.path().join("gone.jpg"), &dir.path().join("x.jpg")).unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }

    #[test]
    fn test_unwritable_destination_leaves_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        write(&src, b"pixels");
        let dst = dir.path().join("missing-folder").join("a.jpg");

        assert!(move_file(&src, &dst).is_err());
        assert_eq!(fs::read(&src).unwrap(), b"pixels");
    }

    #[test]
    fn test_copy_fallback_preserves_content_and_mtime() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        let dst = dir.path().join("b.jpg");
        write(&src, &vec![7u8; 100_000]);
        let mtime = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&src, mtime).unwrap();

        copy_then_remove(&src, &dst).unwrap();

        assert!(!src.exists());
        assert!(!partial_path(&dst).exists());
        assert_eq!(fs::read(&dst).unwrap(), vec![7u8; 100_000]);
        let meta = fs::metadata(&dst).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta).unix_seconds(), 1_600_000_000);
    }

    #[test]
    fn test_copy_fallback_failure_cleans_up() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        write(&src, b"pixels");
        let dst = dir.path().join("nope").join("a.jpg");

        assert!(copy_then_remove(&src, &dst).is_err());
        assert_eq!(fs::read(&src).unwrap(), b"pixels");
        assert!(!partial_path(&dst).exists());
    }

    #[test]
    fn test_partial_path_is_hidden_sibling() {
        let p = partial_path(Path::new("/d/2024-12-24 - Gazeran/IMG.jpg"));
        assert_eq!(p, Path::new("/d/2024-12-24 - Gazeran/.IMG.jpg.partial"));
    }
}
