use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::classify::MissingReason;
use crate::date::{self, Timestamp};
use crate::metadata::Metadata;
use crate::record::MissingRecord;
use crate::score::{self, CameraCheck, Rejection, ScoringRules};

/// What the scorer would make of one candidate for one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    ExactMatch,
    ResolutionMismatch,
    Ineligible(MissingReason),
    Rejected(Rejection),
}

/// Field-by-field comparison of a manifest record against one file.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub candidate: PathBuf,
    pub record: MissingRecord,
    pub found: Metadata,
    pub camera: CameraCheck,
    pub expected_time: Option<Timestamp>,
    pub time_delta: Option<Duration>,
    pub tolerance: Duration,
    pub verdict: Verdict,
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        self.verdict == Verdict::ExactMatch
    }
}

/// Compare `record` against a candidate whose metadata was already read.
pub fn compare(record: &MissingRecord, candidate: &Path, found: Metadata, rules: &ScoringRules) -> Comparison {
    let camera = score::check_camera(record.camera_make.as_deref().unwrap_or(""), &found.camera_make);
    let expected_time = record.capture_time_raw.as_deref().and_then(date::parse_timestamp);
    let time_delta = expected_time
        .as_ref()
        .zip(found.capture_time.as_ref())
        .map(|(a, b)| date::time_delta(a, b));

    let verdict = match record.target() {
        Err(reason) => Verdict::Ineligible(reason),
        Ok(target) => match score::evaluate(&target, candidate, found.clone(), rules) {
            Ok(scored) if scored.resolution_exact => Verdict::ExactMatch,
            Ok(_) => Verdict::ResolutionMismatch,
            Err(rejection) => Verdict::Rejected(rejection),
        },
    };

    Comparison {
        candidate: candidate.to_path_buf(),
        record: record.clone(),
        found,
        camera,
        expected_time,
        time_delta,
        tolerance: rules.tolerance,
        verdict,
    }
}

fn show<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.record;
        writeln!(f, "Manifest: {}", r.original_path)?;
        writeln!(f, "File:     {}", self.candidate.display())?;
        writeln!(
            f,
            "Camera Make: manifest='{}' file='{}' (score {}{})",
            r.camera_make.as_deref().unwrap_or(""),
            self.found.camera_make,
            self.camera.score,
            if self.camera.assumed { ", not compared" } else { "" }
        )?;
        writeln!(f, "Width:  manifest={} file={}", show(r.width), self.found.width)?;
        writeln!(f, "Height: manifest={} file={}", show(r.height), self.found.height)?;
        writeln!(
            f,
            "Capture time: manifest='{}' file='{}'",
            r.capture_time_raw.as_deref().unwrap_or(""),
            self.found.capture_time_raw
        )?;
        match self.time_delta {
            Some(delta) => writeln!(
                f,
                "Time difference: {}s (tolerance {}s)",
                delta.num_seconds(),
                self.tolerance.num_seconds()
            )?,
            None => writeln!(f, "Time difference: could not parse one or both timestamps")?,
        }

        match &self.verdict {
            Verdict::ExactMatch => write!(f, "MATCH: would be linked if it is the only exact candidate"),
            Verdict::ResolutionMismatch => {
                write!(f, "RESOLUTION MISMATCH: same photo by time and camera, dimensions differ")
            }
            Verdict::Ineligible(reason) => write!(f, "NOT COMPARABLE: {}", reason),
            Verdict::Rejected(rejection) => write!(f, "NO MATCH: {}", rejection),
        }
    }
}
