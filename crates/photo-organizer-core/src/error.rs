use std::fmt;
use std::io;
use std::path::PathBuf;

/// Failure that aborts the processing of a single photo.
///
/// None of these stop the run: the caller records the error against the file
/// and moves on to the next one.
#[derive(Debug)]
pub enum Error {
    /// The source file vanished or could not be inspected.
    SourceUnavailable { path: PathBuf, source: io::Error },
    /// The dated destination folder could not be created.
    CreateFolder { path: PathBuf, source: io::Error },
    /// Rename or copy fallback failed; the source is left in place.
    Move {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    /// Every disambiguated name up to the limit is already taken.
    CollisionExhausted { folder: PathBuf, filename: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SourceUnavailable { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            Error::CreateFolder { path, source } => {
                write!(f, "cannot create folder {}: {}", path.display(), source)
            }
            Error::Move { from, to, source } => write!(
                f,
                "cannot move {} to {}: {}",
                from.display(),
                to.display(),
                source
            ),
            Error::CollisionExhausted { folder, filename } => write!(
                f,
                "no free name left for {} in {}",
                filename,
                folder.display()
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SourceUnavailable { source, .. }
            | Error::CreateFolder { source, .. }
            | Error::Move { source, .. } => Some(source),
            Error::CollisionExhausted { .. } => None,
        }
    }
}
