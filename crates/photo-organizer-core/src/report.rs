use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::date::DateSource;
use crate::geo::{Coordinates, PlaceSource};
use crate::media::PhotoRecord;
use crate::mover::MoveMethod;
use crate::planner::PlannedMove;
use crate::ProcessResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    Moved,
    /// Dry run: destination computed, nothing moved.
    Planned,
    Failed,
}

/// Outcome for one photo, including every fallback that was taken.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub filename: String,
    pub destination: Option<PathBuf>,
    pub date: Option<NaiveDate>,
    pub date_source: Option<DateSource>,
    pub coordinates: Option<Coordinates>,
    pub place: Option<String>,
    pub place_source: Option<PlaceSource>,
    pub disambiguator: Option<u32>,
    pub method: Option<MoveMethod>,
    pub status: FileStatus,
    pub error: Option<String>,
}

impl FileReport {
    pub fn new(
        record: &PhotoRecord,
        planned: Option<&PlannedMove>,
        method: Option<MoveMethod>,
        status: FileStatus,
        error: Option<String>,
    ) -> Self {
        Self {
            source: record.source.clone(),
            filename: record.filename.clone(),
            destination: planned.map(|p| p.destination.clone()),
            date: record.date.map(|d| d.date),
            date_source: record.date.map(|d| d.source),
            coordinates: record.coordinates,
            place: record.place.as_ref().map(|p| p.name.clone()),
            place_source: record.place.as_ref().map(|p| p.source),
            disambiguator: planned.and_then(|p| p.disambiguator),
            method,
            status,
            error,
        }
    }

    /// Destination as `folder/file` relative to `root`, with `/` separators.
    pub fn relative_destination(&self, root: &Path) -> Option<String> {
        self.destination.as_ref().map(|dest| {
            dest.strip_prefix(root)
                .unwrap_or(dest)
                .to_string_lossy()
                .replace('\\', "/")
        })
    }
}

#[derive(Serialize)]
struct ReportEntry<'a> {
    source: &'a Path,
    destination: Option<String>,
    date: Option<NaiveDate>,
    date_source: Option<DateSource>,
    coordinates: Option<Coordinates>,
    place: Option<&'a str>,
    place_source: Option<PlaceSource>,
    disambiguator: Option<u32>,
    method: Option<MoveMethod>,
    status: FileStatus,
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct RunReport<'a> {
    source: &'a Path,
    destination: &'a Path,
    dry_run: bool,
    cancelled: bool,
    total: u64,
    moved: u64,
    planned: u64,
    failed: u64,
    files: Vec<ReportEntry<'a>>,
}

/// Write the run summary as pretty JSON. Destinations are relative to the
/// destination root.
pub fn write_report(
    result: &ProcessResult,
    source_dir: &Path,
    destination_root: &Path,
    dry_run: bool,
    report_path: &Path,
) -> anyhow::Result<()> {
    let report = RunReport {
        source: source_dir,
        destination: destination_root,
        dry_run,
        cancelled: result.cancelled,
        total: result.total,
        moved: result.moved,
        planned: result.planned,
        failed: result.failed,
        files: result
            .files
            .iter()
            .map(|f| ReportEntry {
                source: &f.source,
                destination: f.relative_destination(destination_root),
                date: f.date,
                date_source: f.date_source,
                coordinates: f.coordinates,
                place: f.place.as_deref(),
                place_source: f.place_source,
                disambiguator: f.disambiguator,
                method: f.method,
                status: f.status,
                error: f.error.as_deref(),
            })
            .collect(),
    };

    if let Some(parent) = report_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(report_path)?;
    serde_json::to_writer_pretty(file, &report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::ResolvedDate;
    use crate::geo::ResolvedPlace;
    use tempfile::tempdir;

    #[test]
    fn test_report_uses_relative_destinations() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("Destination");

        let mut record = PhotoRecord::new(dir.path().join("Source/IMG_1.jpg")).unwrap();
        record.date = Some(ResolvedDate {
            date: NaiveDate::from_ymd_opt(2024, 12, 26).unwrap(),
            source: DateSource::Filename,
        });
        record.place = Some(ResolvedPlace {
            name: "Inconnu".into(),
            source: PlaceSource::NoCoordinates,
        });
        let planned = PlannedMove {
            folder: root.join("2024-12-26 - Inconnu"),
            destination: root.join("2024-12-26 - Inconnu").join("IMG_1 (1).jpg"),
            disambiguator: Some(1),
        };
        let report = FileReport::new(&record, Some(&planned), Some(MoveMethod::Rename), FileStatus::Moved, None);
        assert_eq!(
            report.relative_destination(&root).as_deref(),
            Some("2024-12-26 - Inconnu/IMG_1 (1).jpg")
        );

        let result = ProcessResult {
            total: 1,
            moved: 1,
            planned: 0,
            failed: 0,
            cancelled: false,
            files: vec![report],
        };
        let path = dir.path().join("reports/run.json");
        write_report(&result, &dir.path().join("Source"), &root, false, &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(json["moved"], 1);
        let entry = &json["files"][0];
        assert_eq!(entry["destination"], "2024-12-26 - Inconnu/IMG_1 (1).jpg");
        assert_eq!(entry["date"], "2024-12-26");
        assert_eq!(entry["date_source"], "filename");
        assert_eq!(entry["place_source"], "no-coordinates");
        assert_eq!(entry["status"], "moved");
        assert_eq!(entry["disambiguator"], 1);
    }
}
