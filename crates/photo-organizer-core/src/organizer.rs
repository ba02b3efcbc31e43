use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{error, info, warn};

use crate::date::resolve_date;
use crate::error::{Error, Result};
use crate::geo::{LocationResolver, ReverseGeocoder};
use crate::media::PhotoRecord;
use crate::metadata::MetadataSource;
use crate::mover::{self, MoveMethod};
use crate::planner::{PathPlanner, PlannedMove};
use crate::report::{FileReport, FileStatus};
use crate::{scan, ProcessControl, ProcessResult, ProgressCallback};

/// Runs the per-photo pipeline over a source directory, one photo at a time:
/// metadata, date, place, destination, move.
pub struct Organizer<M, G> {
    source_dir: PathBuf,
    dry_run: bool,
    metadata: M,
    locations: LocationResolver<G>,
    planner: PathPlanner,
}

impl<M: MetadataSource, G: ReverseGeocoder> Organizer<M, G> {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        destination_root: impl Into<PathBuf>,
        dry_run: bool,
        metadata: M,
        locations: LocationResolver<G>,
    ) -> Self {
        let planner = if dry_run {
            PathPlanner::dry_run(destination_root)
        } else {
            PathPlanner::new(destination_root)
        };
        Self {
            source_dir: source_dir.into(),
            dry_run,
            metadata,
            locations,
            planner,
        }
    }

    /// Process every photo in the source directory.
    ///
    /// Only setup problems (missing source, destination root not creatable)
    /// are returned as errors. A photo that fails is recorded in the result
    /// and the run moves on.
    pub fn run(
        &mut self,
        control: &ProcessControl,
        progress: &ProgressCallback<'_>,
    ) -> anyhow::Result<ProcessResult> {
        if !self.source_dir.is_dir() {
            anyhow::bail!("source directory not found: {}", self.source_dir.display());
        }
        if !self.dry_run {
            fs::create_dir_all(self.planner.root()).with_context(|| {
                format!("cannot create destination {}", self.planner.root().display())
            })?;
        }

        let photos = scan::scan_photos(&self.source_dir)?;
        let total = photos.len() as u64;
        info!(
            total,
            source = %self.source_dir.display(),
            destination = %self.planner.root().display(),
            dry_run = self.dry_run,
            "organizing photos"
        );

        let mut result = ProcessResult {
            total,
            ..ProcessResult::default()
        };

        for (i, record) in photos.into_iter().enumerate() {
            if let Some(ref token) = control.cancel_token {
                if token.check().is_err() {
                    warn!(remaining = total - i as u64, "cancelled, remaining photos left in place");
                    result.cancelled = true;
                    break;
                }
            }

            let report = self.process_photo(record);
            match report.status {
                FileStatus::Moved => result.moved += 1,
                FileStatus::Planned => result.planned += 1,
                FileStatus::Failed => result.failed += 1,
            }
            progress(i as u64, total, &report);
            result.files.push(report);
        }

        info!(
            moved = result.moved,
            planned = result.planned,
            failed = result.failed,
            "finished"
        );
        Ok(result)
    }

    /// Resolve, plan and move a single photo. Never fails; errors end up in
    /// the returned report.
    pub fn process_photo(&mut self, mut record: PhotoRecord) -> FileReport {
        let mut planned = None;
        match self.organize(&mut record, &mut planned) {
            Ok(Some(method)) => {
                info!(
                    file = %record.filename,
                    destination = %planned.as_ref().map(|p| p.destination.display().to_string()).unwrap_or_default(),
                    ?method,
                    "moved"
                );
                FileReport::new(&record, planned.as_ref(), Some(method), FileStatus::Moved, None)
            }
            Ok(None) => FileReport::new(&record, planned.as_ref(), None, FileStatus::Planned, None),
            Err(e) => {
                error!(file = %record.filename, error = %e, "failed to organize photo");
                FileReport::new(
                    &record,
                    planned.as_ref(),
                    None,
                    FileStatus::Failed,
                    Some(e.to_string()),
                )
            }
        }
    }

    fn organize(
        &mut self,
        record: &mut PhotoRecord,
        planned: &mut Option<PlannedMove>,
    ) -> Result<Option<MoveMethod>> {
        let mtime = fs::metadata(&record.source)
            .and_then(|m| m.modified())
            .map_err(|source| Error::SourceUnavailable {
                path: record.source.clone(),
                source,
            })?;

        record.exif = self.metadata.read(&record.source);
        let date = resolve_date(record.exif.as_ref(), &record.filename, mtime);
        if !date.source.is_exif() {
            info!(file = %record.filename, source = %date.source, "no EXIF date, using fallback");
        }
        record.date = Some(date);

        record.coordinates = record.exif.as_ref().and_then(|e| e.gps);
        let place = self.locations.resolve_location(record.coordinates);
        let place_name = place.name.clone();
        record.place = Some(place);
        let plan = planned.insert(
            self.planner
                .plan_destination(&date, &place_name, &record.filename)?,
        );

        if self.dry_run {
            return Ok(None);
        }
        mover::move_file(&record.source, &plan.destination).map(Some)
    }
}
