/// Explain why one file does or does not match a manifest record.
/// Usage: relink-compare <manifest.csv> <expected_filename> <candidate_file>
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use relink_core::{compare, manifest, metadata, ReaderKind, ScoringRules};

#[derive(Clone, Copy, ValueEnum)]
enum ReaderArg {
    Exif,
    Exiftool,
}

#[derive(Parser)]
#[command(name = "relink-compare", version, about = "Compare one candidate file against a missing-photo record")]
struct Args {
    /// CSV of missing photos
    manifest: PathBuf,

    /// Filename to look up in the manifest's Photo column (case-insensitive)
    expected_filename: String,

    /// File on disk to compare
    candidate: PathBuf,

    /// Allowed capture time difference in minutes
    #[arg(long, default_value_t = 5)]
    tolerance_minutes: i64,

    #[arg(long, value_enum, default_value = "exif")]
    reader: ReaderArg,

    /// exiftool executable for --reader exiftool
    #[arg(long, default_value = "exiftool")]
    exiftool: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let manifest = manifest::load(&args.manifest)?;
    let Some(row) = manifest.find_by_filename(&args.expected_filename) else {
        eprintln!(
            "No record for {} in {}",
            args.expected_filename,
            args.manifest.display()
        );
        std::process::exit(1);
    };

    let kind = match args.reader {
        ReaderArg::Exif => ReaderKind::Exif,
        ReaderArg::Exiftool => ReaderKind::Exiftool,
    };
    let reader = metadata::reader_for(kind, &args.exiftool);
    let found = match reader.read(&args.candidate) {
        Ok(found) => found,
        Err(err) => {
            eprintln!("Cannot read {}: {}", args.candidate.display(), err);
            std::process::exit(1);
        }
    };

    let rules = ScoringRules::default().with_tolerance_secs(args.tolerance_minutes * 60);
    let comparison = compare::compare(&row.record, &args.candidate, found, &rules);
    println!("{}", comparison);

    if !comparison.is_match() {
        std::process::exit(2);
    }
    Ok(())
}
