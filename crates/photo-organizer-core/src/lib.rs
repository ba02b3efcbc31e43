pub mod control;
pub mod date;
pub mod error;
pub mod geo;
pub mod media;
pub mod metadata;
pub mod mover;
pub mod organizer;
pub mod planner;
pub mod report;
pub mod scan;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use geo::{LocationResolver, NominatimClient};
use metadata::ExifReader;

pub use control::{CancellationToken, CancelledError};
pub use error::Error;
pub use geo::UNKNOWN_PLACE;
pub use organizer::Organizer;
pub use report::{FileReport, FileStatus};

/// Name of the folder created next to the source directory.
pub const DESTINATION_DIR_NAME: &str = "Destination";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderOptions {
    /// Base URL of a Nominatim instance
    pub endpoint: String,
    pub user_agent: String,
    /// Preferred language for place names
    pub language: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Minimum gap between request starts
    pub min_interval_ms: u64,
    /// Extra attempts for transient failures
    pub retries: u32,
    /// Skip all lookups; every place resolves to "Inconnu"
    pub offline: bool,
}

impl Default for GeocoderOptions {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: format!("photo_organizer/{}", env!("CARGO_PKG_VERSION")),
            language: "fr".to_string(),
            timeout_secs: 10,
            min_interval_ms: 1000,
            retries: 1,
            offline: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessOptions {
    /// Flat directory of photos to organize
    pub source: PathBuf,
    /// Defaults to a `Destination` folder next to `source`
    pub destination: Option<PathBuf>,
    /// Plan and report without creating folders or moving files
    pub dry_run: bool,
    /// Where to write the JSON run report, if anywhere
    pub report: Option<PathBuf>,
    pub geocoder: GeocoderOptions,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::from("."),
            destination: None,
            dry_run: false,
            report: None,
            geocoder: GeocoderOptions::default(),
        }
    }
}

/// Summary of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessResult {
    pub total: u64,
    pub moved: u64,
    pub planned: u64,
    pub failed: u64,
    /// Stopped early; photos not yet reached are still in the source.
    pub cancelled: bool,
    pub files: Vec<FileReport>,
}

/// Control options for process execution.
#[derive(Debug, Clone, Default)]
pub struct ProcessControl {
    /// Cancellation token checked between photos.
    pub cancel_token: Option<CancellationToken>,
}

impl ProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }
}

/// Called after each photo with (index, total, outcome). May borrow from
/// the caller's stack.
pub type ProgressCallback<'a> = dyn Fn(u64, u64, &FileReport) + Send + Sync + 'a;

/// `Destination` next to `source`, or inside it when it has no parent.
pub fn default_destination(source: &Path) -> PathBuf {
    source
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(source)
        .join(DESTINATION_DIR_NAME)
}

/// Organize the photos described by `options`.
pub fn process(
    options: &ProcessOptions,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<ProcessResult> {
    process_with_control(options, &ProcessControl::default(), progress_callback)
}

/// Organize with cancellation support.
pub fn process_with_control(
    options: &ProcessOptions,
    control: &ProcessControl,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<ProcessResult> {
    let source = fs::canonicalize(&options.source).with_context(|| {
        format!("source directory not found: {}", options.source.display())
    })?;
    let destination = options
        .destination
        .clone()
        .unwrap_or_else(|| default_destination(&source));

    let result = if options.geocoder.offline {
        let locations = LocationResolver::<NominatimClient>::offline();
        Organizer::new(&source, &destination, options.dry_run, ExifReader, locations)
            .run(control, progress_callback)?
    } else {
        let locations = LocationResolver::new(NominatimClient::new(&options.geocoder)?);
        Organizer::new(&source, &destination, options.dry_run, ExifReader, locations)
            .run(control, progress_callback)?
    };

    if let Some(ref report_path) = options.report {
        report::write_report(&result, &source, &destination, options.dry_run, report_path)?;
    }

    Ok(result)
}
