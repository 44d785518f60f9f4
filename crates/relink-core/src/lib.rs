pub mod classify;
pub mod compare;
pub mod date;
pub mod index;
pub mod manifest;
pub mod metadata;
pub mod record;
pub mod report;
pub mod score;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub use classify::{Disposition, MissingReason};
pub use index::FilesystemIndex;
pub use metadata::{Metadata, MetadataError, MetadataReader, ReaderKind};
pub use record::MissingRecord;
pub use report::{LinkMode, Outcome, Summary};
pub use score::{AbsentCameraPolicy, ScoringRules};

fn default_tolerance_secs() -> i64 {
    score::DEFAULT_TOLERANCE_SECS
}

fn default_raw_extensions() -> Vec<String> {
    score::DEFAULT_RAW_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_seed() -> u64 {
    42
}

fn default_exiftool() -> PathBuf {
    PathBuf::from("exiftool")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelinkOptions {
    /// CSV listing the missing photos
    pub manifest: PathBuf,
    /// Tree to search for candidates
    pub search_root: PathBuf,
    /// Directories whose path contains any of these are skipped
    #[serde(default)]
    pub excluded_subtrees: Vec<String>,
    /// Where reports and the link script are written
    pub output: PathBuf,
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: i64,
    #[serde(default = "default_raw_extensions")]
    pub raw_extensions: Vec<String>,
    #[serde(default)]
    pub absent_camera: AbsentCameraPolicy,
    /// Only evaluate a seeded random sample of this many rows
    #[serde(default)]
    pub sample: Option<usize>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Worker threads for record evaluation (0 = one per core, 1 = serial)
    #[serde(default)]
    pub jobs: usize,
    #[serde(default)]
    pub link_mode: LinkMode,
    #[serde(default)]
    pub reader: ReaderKind,
    #[serde(default = "default_exiftool")]
    pub exiftool: PathBuf,
}

impl Default for RelinkOptions {
    fn default() -> Self {
        Self {
            manifest: PathBuf::new(),
            search_root: PathBuf::new(),
            excluded_subtrees: Vec::new(),
            output: PathBuf::from("."),
            tolerance_secs: default_tolerance_secs(),
            raw_extensions: default_raw_extensions(),
            absent_camera: AbsentCameraPolicy::default(),
            sample: None,
            seed: default_seed(),
            jobs: 0,
            link_mode: LinkMode::default(),
            reader: ReaderKind::default(),
            exiftool: default_exiftool(),
        }
    }
}

impl RelinkOptions {
    pub fn new(
        manifest: impl Into<PathBuf>,
        search_root: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            manifest: manifest.into(),
            search_root: search_root.into(),
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn rules(&self) -> ScoringRules {
        ScoringRules {
            raw_extensions: self.raw_extensions.clone(),
            absent_camera: self.absent_camera,
            ..ScoringRules::default()
        }
        .with_tolerance_secs(self.tolerance_secs)
    }
}

/// Type alias for progress callback. The lifetime lets callers pass
/// closures that borrow locals such as a progress bar.
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + Send + Sync + 'a;

/// Throttled progress reporter: emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback<'a>,
    last_emit: Mutex<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback<'a>) -> Self {
        let start = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .unwrap_or_else(Instant::now);
        Self {
            inner,
            last_emit: Mutex::new(start),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            let mut last = self.last_emit.lock().unwrap_or_else(|e| e.into_inner());
            if last.elapsed().as_millis() < 200 {
                return;
            }
            *last = Instant::now();
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Everything a run produced, in manifest order.
#[derive(Debug)]
pub struct RunResult {
    pub outcomes: Vec<Outcome>,
    pub summary: Summary,
    pub indexed_files: usize,
    pub artifacts: Vec<PathBuf>,
}

/// Classify one record against the index. Never fails: every problem
/// below the manifest level folds into a disposition.
pub fn evaluate_record(
    record: &MissingRecord,
    index: &FilesystemIndex,
    reader: &dyn MetadataReader,
    rules: &ScoringRules,
) -> Disposition {
    let candidates = record
        .stem_key()
        .map(|key| index.candidates(&key))
        .unwrap_or(&[]);
    if candidates.is_empty() {
        return Disposition::still_missing(MissingReason::NoCandidates);
    }

    let target = match record.target() {
        Ok(target) => target,
        Err(reason) => {
            if reason == MissingReason::UnparseableTime {
                tracing::warn!(
                    "{}: cannot parse capture time {:?}",
                    record.original_path,
                    record.capture_time_raw.as_deref().unwrap_or("")
                );
            }
            return Disposition::still_missing(reason);
        }
    };

    let scored = candidates
        .iter()
        .filter_map(|path| score::score(&target, path, reader, rules))
        .collect();
    classify::classify(scored, rules.absent_camera)
}

/// Run the full pipeline: load the manifest, index the search root,
/// classify every record and write the reports.
pub fn run(
    options: &RelinkOptions,
    reader: &dyn MetadataReader,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<RunResult> {
    let tp = ThrottledProgress::new(progress_callback);

    // Stage 1: Manifest
    let mut manifest = manifest::load(&options.manifest)?;
    if let Some(n) = options.sample {
        tracing::info!("Sampling {} of {} rows (seed {})", n, manifest.len(), options.seed);
        manifest = manifest.sample(n, options.seed);
    }
    if !options.search_root.is_dir() {
        anyhow::bail!("search root {} is not a directory", options.search_root.display());
    }

    // Stage 2: Index
    tp.report("index", 0, 1, "Indexing search root");
    let index = FilesystemIndex::build(&options.search_root, &options.excluded_subtrees);
    tp.report("index", 1, 1, &format!("Indexed {} files", index.file_count()));

    // Stage 3: Match
    let rules = options.rules();
    let total = manifest.len() as u64;
    let counter = AtomicU64::new(0);
    let evaluate = |row: &manifest::ManifestRow| {
        let disposition = evaluate_record(&row.record, &index, reader, &rules);
        let current = counter.fetch_add(1, Ordering::Relaxed);
        tp.report("match", current, total, "Matching records");
        disposition
    };

    let dispositions: Vec<Disposition> = if options.jobs == 1 {
        manifest.rows.iter().map(&evaluate).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .build()
            .context("failed to start worker pool")?;
        pool.install(|| manifest.rows.par_iter().map(&evaluate).collect())
    };

    let outcomes: Vec<Outcome> = manifest
        .rows
        .into_iter()
        .zip(dispositions)
        .map(|(row, disposition)| Outcome { row, disposition })
        .collect();

    // Stage 4: Reports
    let report = report::Report::from_outcomes(&manifest.headers, &outcomes);
    let summary = report.summary();
    let artifacts = report.write(options)?;
    tracing::info!(
        "{} resolved, {} ambiguous, {} resolution mismatches, {} still missing",
        summary.resolved,
        summary.ambiguous,
        summary.resolution_mismatch,
        summary.still_missing
    );

    Ok(RunResult {
        outcomes,
        summary,
        indexed_files: index.file_count(),
        artifacts,
    })
}
