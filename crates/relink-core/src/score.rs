use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::date;
use crate::metadata::{Metadata, MetadataReader};
use crate::record::Target;

/// Default time gate width.
pub const DEFAULT_TOLERANCE_SECS: i64 = 5 * 60;

/// Extensions treated as camera originals, lower-case without the dot.
pub const DEFAULT_RAW_EXTENSIONS: &[&str] = &["dng", "orf", "arw", "cr2", "nef", "rw2", "raf", "pef"];

/// How to treat a camera make that is missing on either side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbsentCameraPolicy {
    /// Missing make matches anything
    #[default]
    MatchAny,
    /// Missing make still passes the gate, but a lone exact match that
    /// relied on it is sent to review instead of being linked
    RequireReview,
}

/// Parameters for the candidate gates and classifier.
#[derive(Debug, Clone)]
pub struct ScoringRules {
    pub tolerance: Duration,
    pub raw_extensions: Vec<String>,
    pub absent_camera: AbsentCameraPolicy,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            tolerance: Duration::seconds(DEFAULT_TOLERANCE_SECS),
            raw_extensions: DEFAULT_RAW_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            absent_camera: AbsentCameraPolicy::default(),
        }
    }
}

impl ScoringRules {
    pub fn with_tolerance_secs(mut self, secs: i64) -> Self {
        self.tolerance = Duration::seconds(secs);
        self
    }

    pub fn is_raw(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.raw_extensions
            .iter()
            .any(|raw| raw.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub metadata: Option<Metadata>,
}

/// A candidate that passed the time and camera gates.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: CandidateFile,
    pub time_ok: bool,
    pub camera_ok: bool,
    pub resolution_exact: bool,
    /// 2 = same make, 1 = one contains the other, 0 = not compared
    pub camera_score: u8,
    pub resolution_area: u64,
    pub is_raw_format: bool,
    /// The camera gate passed only because a make was absent
    pub camera_assumed: bool,
    pub time_delta: Duration,
}

impl ScoredCandidate {
    pub fn path(&self) -> &Path {
        &self.candidate.path
    }
}

/// Why a candidate was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    Unreadable(String),
    NoTimestamp,
    OutsideTolerance(Duration),
    CameraMismatch { expected: String, found: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Unreadable(err) => write!(f, "metadata unreadable ({})", err),
            Rejection::NoTimestamp => write!(f, "no parseable capture time"),
            Rejection::OutsideTolerance(delta) => {
                write!(f, "capture time off by {}s", delta.num_seconds())
            }
            Rejection::CameraMismatch { expected, found } => {
                write!(f, "camera '{}' does not match '{}'", found, expected)
            }
        }
    }
}

/// Outcome of comparing two camera make strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraCheck {
    pub ok: bool,
    pub score: u8,
    pub assumed: bool,
}

/// Compare two camera makes, case-insensitively. Symmetric in its arguments.
/// An empty side passes without being compared.
pub fn check_camera(a: &str, b: &str) -> CameraCheck {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return CameraCheck {
            ok: true,
            score: 0,
            assumed: true,
        };
    }

    let score = if a == b {
        2
    } else if a.contains(&b) || b.contains(&a) {
        1
    } else {
        0
    };
    CameraCheck {
        ok: score > 0,
        score,
        assumed: false,
    }
}

/// Run the gates for one candidate whose metadata is already known.
pub fn evaluate(
    target: &Target,
    path: &Path,
    metadata: Metadata,
    rules: &ScoringRules,
) -> Result<ScoredCandidate, Rejection> {
    let found_time = metadata.capture_time.ok_or(Rejection::NoTimestamp)?;

    let time_delta = date::time_delta(&target.capture_time, &found_time);
    if !date::within_tolerance(&target.capture_time, &found_time, rules.tolerance) {
        return Err(Rejection::OutsideTolerance(time_delta));
    }

    let expected_make = target.camera_make.as_deref().unwrap_or("");
    let camera = check_camera(expected_make, &metadata.camera_make);
    if !camera.ok {
        return Err(Rejection::CameraMismatch {
            expected: expected_make.to_string(),
            found: metadata.camera_make,
        });
    }

    Ok(ScoredCandidate {
        time_ok: true,
        camera_ok: true,
        resolution_exact: metadata.width == target.width && metadata.height == target.height,
        camera_score: camera.score,
        resolution_area: u64::from(metadata.width) * u64::from(metadata.height),
        is_raw_format: rules.is_raw(path),
        camera_assumed: camera.assumed,
        time_delta,
        candidate: CandidateFile {
            path: path.to_path_buf(),
            metadata: Some(metadata),
        },
    })
}

/// Read a candidate's metadata and score it. Read failures and gate
/// rejections drop the candidate; they never fail the record.
pub fn score(
    target: &Target,
    path: &Path,
    reader: &dyn MetadataReader,
    rules: &ScoringRules,
) -> Option<ScoredCandidate> {
    let metadata = match reader.read(path) {
        Ok(metadata) => metadata,
        Err(err) => {
            tracing::debug!("{}: {}", path.display(), Rejection::Unreadable(err.to_string()));
            return None;
        }
    };

    match evaluate(target, path, metadata, rules) {
        Ok(scored) => Some(scored),
        Err(rejection) => {
            tracing::debug!("{}: {}", path.display(), rejection);
            None
        }
    }
}
