use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use photo_organizer_core::{
    CancellationToken, FileReport, FileStatus, GeocoderOptions, ProcessControl, ProcessOptions,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "photo-organizer",
    version,
    about = "Sort photos into \"YYYY-MM-DD - Place\" folders using EXIF dates and GPS",
    after_help = "Examples:\n  photo-organizer                  # current directory\n  photo-organizer ./my_photos      # a given directory\n  photo-organizer ./dcim --dry-run # show what would happen"
)]
struct Cli {
    /// Directory containing the photos (subdirectories are not scanned)
    #[arg(default_value = ".")]
    source_dir: PathBuf,

    /// Destination root [default: "Destination" next to the source directory]
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Show where each photo would go without moving anything
    #[arg(long)]
    dry_run: bool,

    /// Write a JSON report of the run to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Language for place names
    #[arg(long, default_value = "fr")]
    lang: String,

    /// Do not contact the geocoding service; every place becomes "Inconnu"
    #[arg(long)]
    offline: bool,

    /// Nominatim base URL
    #[arg(long, value_name = "URL")]
    geocoder_url: Option<String>,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn describe(report: &FileReport) -> String {
    let date = match (report.date, report.date_source) {
        (Some(d), Some(src)) => format!("{} ({})", d.format("%Y-%m-%d"), src),
        _ => "-".to_string(),
    };
    let gps = report
        .coordinates
        .map(|c| c.to_string())
        .unwrap_or_else(|| "no GPS".to_string());
    let place = match (&report.place, report.place_source) {
        (Some(p), Some(src)) => format!("{} ({})", p, src),
        _ => "-".to_string(),
    };
    let target = report
        .destination
        .as_ref()
        .map(|d| {
            let folder = d
                .parent()
                .and_then(|p| p.file_name())
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            let name = d
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("{folder}/{name}")
        })
        .unwrap_or_default();

    match report.status {
        FileStatus::Moved => format!("{}  {date}  {gps}  {place}  -> {target}", report.filename),
        FileStatus::Planned => format!("{}  {date}  {gps}  {place}  => {target} (dry run)", report.filename),
        FileStatus::Failed => format!(
            "{}  FAILED: {}",
            report.filename,
            report.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let t_total = std::time::Instant::now();

    let token = CancellationToken::new();
    {
        let token = token.clone();
        ctrlc::set_handler(move || {
            warn!("interrupted: finishing the current photo, then stopping");
            token.cancel();
        })?;
    }

    let mut geocoder = GeocoderOptions {
        language: cli.lang,
        offline: cli.offline,
        ..GeocoderOptions::default()
    };
    if let Some(url) = cli.geocoder_url {
        geocoder.endpoint = url;
    }

    let options = ProcessOptions {
        source: cli.source_dir,
        destination: cli.destination,
        dry_run: cli.dry_run,
        report: cli.report,
        geocoder,
    };

    let pb = ProgressBar::new(0);
    pb.set_style(ProgressStyle::with_template("[{bar:40}] {pos}/{len} {msg}")?);

    let control = ProcessControl::new().with_cancel_token(token);
    let result = photo_organizer_core::process_with_control(&options, &control, &|current, total, report| {
        pb.set_length(total);
        pb.set_position(current + 1);
        pb.println(describe(report));
    });
    pb.finish_and_clear();
    let result = result?;

    eprintln!(
        "Done! {} photo(s): {} moved, {} planned, {} failed{} ({:.2}s)",
        result.total,
        result.moved,
        result.planned,
        result.failed,
        if result.cancelled { ", cancelled" } else { "" },
        t_total.elapsed().as_secs_f64()
    );

    if result.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
