use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::date::ResolvedDate;
use crate::error::{Error, Result};

/// Highest `(n)` suffix tried before giving up on a file.
pub const MAX_DISAMBIGUATOR: u32 = 9999;

/// `"{YYYY-MM-DD} - {place}"`
pub fn folder_name(date: &ResolvedDate, place: &str) -> String {
    format!("{} - {}", date.folder_prefix(), place)
}

/// Where one photo is going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub folder: PathBuf,
    pub destination: PathBuf,
    /// The `(n)` appended to avoid an existing file, if any.
    pub disambiguator: Option<u32>,
}

/// Path Planner: assigns each photo a free destination path.
///
/// Collision tracking is sequential and keeps one counter per base path, so
/// the n-th clash on a name costs one lookup instead of a rescan. Paths
/// handed out earlier in the run are reserved even if nothing was written
/// there yet (dry runs, failed moves).
pub struct PathPlanner {
    root: PathBuf,
    create_folders: bool,
    name_counters: HashMap<PathBuf, u32>,
    reserved: HashSet<PathBuf>,
    created_dirs: HashSet<PathBuf>,
}

impl PathPlanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            create_folders: true,
            name_counters: HashMap::new(),
            reserved: HashSet::new(),
            created_dirs: HashSet::new(),
        }
    }

    /// A planner that never touches the filesystem except to look.
    pub fn dry_run(root: impl Into<PathBuf>) -> Self {
        Self {
            create_folders: false,
            ..Self::new(root)
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compute the destination for `filename` and make sure its folder exists.
    ///
    /// Existing folders are reused. An existing or reserved file name gets
    /// `name (1).ext`, `name (2).ext`, ... up to [`MAX_DISAMBIGUATOR`].
    pub fn plan_destination(
        &mut self,
        date: &ResolvedDate,
        place: &str,
        filename: &str,
    ) -> Result<PlannedMove> {
        let folder = self.root.join(folder_name(date, place));
        self.ensure_folder(&folder)?;

        let base_dest = folder.join(filename);
        let counter = self.name_counters.entry(base_dest.clone()).or_insert(0);

        let (destination, disambiguator) =
            if *counter == 0 && is_free(&self.reserved, &base_dest) {
                (base_dest, None)
            } else {
                let (stem, ext) = split_name(filename);
                loop {
                    *counter += 1;
                    if *counter > MAX_DISAMBIGUATOR {
                        return Err(Error::CollisionExhausted {
                            folder,
                            filename: filename.to_string(),
                        });
                    }
                    let candidate = folder.join(disambiguated_name(stem, ext, *counter));
                    if is_free(&self.reserved, &candidate) {
                        break (candidate, Some(*counter));
                    }
                }
            };

        if let Some(n) = disambiguator {
            debug!(filename, n, "name taken, adding disambiguator");
        }
        self.reserved.insert(destination.clone());
        Ok(PlannedMove {
            folder,
            destination,
            disambiguator,
        })
    }

    fn ensure_folder(&mut self, folder: &Path) -> Result<()> {
        if !self.create_folders || self.created_dirs.contains(folder) {
            return Ok(());
        }
        fs::create_dir_all(folder).map_err(|source| Error::CreateFolder {
            path: folder.to_path_buf(),
            source,
        })?;
        self.created_dirs.insert(folder.to_path_buf());
        Ok(())
    }
}

fn is_free(reserved: &HashSet<PathBuf>, path: &Path) -> bool {
    !reserved.contains(path) && path.symlink_metadata().is_err()
}

fn split_name(filename: &str) -> (&str, Option<&str>) {
    let path = Path::new(filename);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    let ext = path.extension().and_then(|s| s.to_str());
    (stem, ext)
}

fn disambiguated_name(stem: &str, ext: Option<&str>, n: u32) -> String {
    match ext {
        Some(ext) => format!("{} ({}).{}", stem, n, ext),
        None => format!("{} ({})", stem, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::DateSource;
    use chrono::NaiveDate;
    use std::fs::File;
    use tempfile::tempdir;

    fn day(y: i32, m: u32, d: u32) -> ResolvedDate {
        ResolvedDate {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            source: DateSource::ExifOriginal,
        }
    }

    #[test]
    fn test_folder_name_format() {
        assert_eq!(folder_name(&day(2024, 12, 24), "Gazeran"), "2024-12-24 - Gazeran");
        assert_eq!(folder_name(&day(2024, 1, 5), "Inconnu"), "2024-01-05 - Inconnu");
    }

    #[test]
    fn test_creates_and_reuses_folder() {
        let dir = tempdir().unwrap();
        let mut planner = PathPlanner::new(dir.path().join("Destination"));

        let a = planner.plan_destination(&day(2024, 12, 24), "Gazeran", "a.jpg").unwrap();
        assert!(a.folder.is_dir());
        assert_eq!(a.destination, dir.path().join("Destination/2024-12-24 - Gazeran/a.jpg"));
        assert_eq!(a.disambiguator, None);

        let b = planner.plan_destination(&day(2024, 12, 24), "Gazeran", "b.jpg").unwrap();
        assert_eq!(a.folder, b.folder);

        // A fresh planner over an existing tree reuses the folder as well.
        let mut again = PathPlanner::new(dir.path().join("Destination"));
        assert!(again.plan_destination(&day(2024, 12, 24), "Gazeran", "c.jpg").is_ok());
    }

    #[test]
    fn test_collisions_increment_in_order() {
        let dir = tempdir().unwrap();
        let mut planner = PathPlanner::dry_run(dir.path());
        let date = day(2024, 12, 26);

        let names: Vec<String> = (0..3)
            .map(|_| {
                let planned = planner.plan_destination(&date, "Inconnu", "IMG_1.jpg").unwrap();
                planned.destination.file_name().unwrap().to_string_lossy().into_owned()
            })
            .collect();
        assert_eq!(names, vec!["IMG_1.jpg", "IMG_1 (1).jpg", "IMG_1 (2).jpg"]);
        // Dry run leaves the tree untouched.
        assert!(!dir.path().join("2024-12-26 - Inconnu").exists());
    }

    #[test]
    fn test_existing_files_are_skipped() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("2024-12-26 - Inconnu");
        fs::create_dir_all(&folder).unwrap();
        File::create(folder.join("a.jpg")).unwrap();
        File::create(folder.join("a (1).jpg")).unwrap();
        File::create(folder.join("noext")).unwrap();

        let mut planner = PathPlanner::new(dir.path());
        let planned = planner.plan_destination(&day(2024, 12, 26), "Inconnu", "a.jpg").unwrap();
        assert_eq!(planned.destination, folder.join("a (2).jpg"));
        assert_eq!(planned.disambiguator, Some(2));

        let planned = planner.plan_destination(&day(2024, 12, 26), "Inconnu", "noext").unwrap();
        assert_eq!(planned.destination, folder.join("noext (1)"));
    }

    #[test]
    fn test_same_name_different_folders_do_not_clash() {
        let dir = tempdir().unwrap();
        let mut planner = PathPlanner::dry_run(dir.path());
        let a = planner.plan_destination(&day(2024, 12, 24), "Gazeran", "x.jpg").unwrap();
        let b = planner.plan_destination(&day(2024, 12, 25), "Gazeran", "x.jpg").unwrap();
        assert_eq!(a.disambiguator, None);
        assert_eq!(b.disambiguator, None);
    }

    #[test]
    fn test_collision_exhaustion() {
        let dir = tempdir().unwrap();
        let mut planner = PathPlanner::dry_run(dir.path());
        let date = day(2024, 12, 26);
        for _ in 0..=MAX_DISAMBIGUATOR {
            planner.plan_destination(&date, "Inconnu", "x.jpg").unwrap();
        }
        let err = planner.plan_destination(&date, "Inconnu", "x.jpg").unwrap_err();
        assert!(matches!(err, Error::CollisionExhausted { .. }));
    }

    #[test]
    fn test_folder_creation_failure() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("2024-12-26 - Inconnu")).unwrap();
        let mut planner = PathPlanner::new(dir.path());
        let err = planner.plan_destination(&day(2024, 12, 26), "Inconnu", "x.jpg").unwrap_err();
        assert!(matches!(err, Error::CreateFolder { .. }));
    }
}
