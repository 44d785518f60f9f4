use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use relink_core::{metadata, AbsentCameraPolicy, LinkMode, ReaderKind, RelinkOptions};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum CameraArg {
    /// A missing make on either side never rejects a candidate
    MatchAny,
    /// A lone exact match with an unconfirmed make goes to review
    RequireReview,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReaderArg {
    Exif,
    Exiftool,
}

#[derive(Parser)]
#[command(name = "relink", version, about = "Find missing catalog photos on disk and script the relinks")]
struct Cli {
    /// CSV of missing photos (Photo, Camera Make, Width, Height, Date/Time Original (Capture))
    manifest: PathBuf,

    /// Directory tree to search
    #[arg(short, long)]
    search_root: PathBuf,

    /// Skip directories whose path contains this text (repeatable)
    #[arg(short = 'x', long = "exclude")]
    exclude: Vec<String>,

    /// Directory for the link script and review reports
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Allowed capture time difference in minutes
    #[arg(long, default_value_t = 5)]
    tolerance_minutes: i64,

    /// Only evaluate N randomly sampled rows
    #[arg(long, value_name = "N")]
    test_n: Option<usize>,

    /// Seed for --test-n sampling
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Handling of missing camera makes
    #[arg(long, value_enum, default_value = "match-any")]
    absent_camera: CameraArg,

    /// Metadata backend
    #[arg(long, value_enum, default_value = "exif")]
    reader: ReaderArg,

    /// exiftool executable for --reader exiftool
    #[arg(long, default_value = "exiftool")]
    exiftool: PathBuf,

    /// Worker threads (0 = one per core, 1 = serial)
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,

    /// Emit `ln -s` instead of hard links
    #[arg(long)]
    symlink: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// `-v` picks the level; a non-empty RUST_LOG replaces it entirely.
fn log_filter(verbosity: u8, rust_log: Option<&str>) -> EnvFilter {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        return EnvFilter::new(directives);
    }
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    EnvFilter::default().add_directive(level.into())
}

fn init_tracing(verbosity: u8) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbosity, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let t_total = std::time::Instant::now();

    let mut options = RelinkOptions::new(cli.manifest, cli.search_root, cli.output);
    options.excluded_subtrees = cli.exclude;
    options.tolerance_secs = cli.tolerance_minutes * 60;
    options.sample = cli.test_n;
    options.seed = cli.seed;
    options.jobs = cli.jobs;
    options.exiftool = cli.exiftool;
    options.absent_camera = match cli.absent_camera {
        CameraArg::MatchAny => AbsentCameraPolicy::MatchAny,
        CameraArg::RequireReview => AbsentCameraPolicy::RequireReview,
    };
    options.reader = match cli.reader {
        ReaderArg::Exif => ReaderKind::Exif,
        ReaderArg::Exiftool => ReaderKind::Exiftool,
    };
    if cli.symlink {
        options.link_mode = LinkMode::Symbolic;
    }

    let reader = metadata::reader_for(options.reader, &options.exiftool);

    let pb = ProgressBar::new(0);
    pb.set_style(ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} {msg}")?);
    let result = relink_core::run(&options, &*reader, &|stage, current, total, message| {
        if stage == "match" {
            pb.set_length(total);
            pb.set_position(current + 1);
        }
        pb.set_message(message.to_string());
    });
    pb.finish_and_clear();
    let result = result?;

    eprintln!(
        "Done! {} records: {} resolved, {} ambiguous, {} resolution mismatches, {} still missing ({} files indexed, {:.2}s)",
        result.summary.total,
        result.summary.resolved,
        result.summary.ambiguous,
        result.summary.resolution_mismatch,
        result.summary.still_missing,
        result.indexed_files,
        t_total.elapsed().as_secs_f64()
    );
    for path in &result.artifacts {
        eprintln!("  wrote {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_rust_log_overrides_verbosity() {
        assert_eq!(log_filter(0, Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(3, Some("warn")).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_verbosity_applies_without_rust_log() {
        assert_eq!(log_filter(0, None).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(log_filter(2, Some("  ")).max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
