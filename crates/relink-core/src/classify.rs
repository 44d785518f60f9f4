use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::score::{AbsentCameraPolicy, ScoredCandidate};

/// Why a record ended up still missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingReason {
    /// No file in the tree shares the stem
    NoCandidates,
    /// Manifest lacks fields needed for matching
    Ineligible { fields: Vec<&'static str> },
    /// Manifest capture time could not be parsed
    UnparseableTime,
    /// Candidates existed but none passed the gates
    NoSurvivors,
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingReason::NoCandidates => write!(f, "no file with this name"),
            MissingReason::Ineligible { fields } => {
                write!(f, "manifest missing {}", fields.join(", "))
            }
            MissingReason::UnparseableTime => write!(f, "manifest capture time unparseable"),
            MissingReason::NoSurvivors => write!(f, "no candidate matched time and camera"),
        }
    }
}

/// Terminal classification of one manifest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    /// Exactly one candidate matched; safe to link
    Resolved { path: PathBuf },
    /// Several plausible candidates, best first
    Ambiguous { candidates: Vec<PathBuf> },
    /// Identity confirmed but dimensions differ from the manifest
    ResolutionMismatch {
        best: PathBuf,
        alternatives: Vec<PathBuf>,
    },
    StillMissing { reason: MissingReason },
}

impl Disposition {
    pub fn still_missing(reason: MissingReason) -> Self {
        Disposition::StillMissing { reason }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Disposition::Resolved { .. } => "resolved",
            Disposition::Ambiguous { .. } => "ambiguous",
            Disposition::ResolutionMismatch { .. } => "resolution mismatch",
            Disposition::StillMissing { .. } => "still missing",
        }
    }
}

/// Preference order: RAW originals first, then stronger camera agreement,
/// then larger pixel count. Path breaks remaining ties so the order does
/// not depend on how the tree was walked.
pub fn compare_candidates(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.is_raw_format
        .cmp(&a.is_raw_format)
        .then_with(|| b.camera_score.cmp(&a.camera_score))
        .then_with(|| b.resolution_area.cmp(&a.resolution_area))
        .then_with(|| a.path().cmp(b.path()))
}

fn ranked_paths(mut candidates: Vec<ScoredCandidate>) -> Vec<PathBuf> {
    candidates.sort_by(compare_candidates);
    candidates.into_iter().map(|c| c.candidate.path).collect()
}

/// Reduce a record's surviving candidates to one disposition.
///
/// `Ambiguous` lists every exact-resolution candidate first, ranked by
/// [`compare_candidates`], followed by the non-exact survivors ranked the
/// same way. A non-exact RAW file therefore never outranks an exact match.
pub fn classify(scored: Vec<ScoredCandidate>, policy: AbsentCameraPolicy) -> Disposition {
    let (mut exact, rest): (Vec<_>, Vec<_>) = scored.into_iter().partition(|c| c.resolution_exact);

    match exact.len() {
        0 if rest.is_empty() => Disposition::still_missing(MissingReason::NoSurvivors),
        0 => {
            let mut ranked = ranked_paths(rest);
            let best = ranked.remove(0);
            Disposition::ResolutionMismatch {
                best,
                alternatives: ranked,
            }
        }
        1 if !(policy == AbsentCameraPolicy::RequireReview && exact[0].camera_assumed) => {
            Disposition::Resolved {
                path: exact.swap_remove(0).candidate.path,
            }
        }
        _ => {
            let mut candidates = ranked_paths(exact);
            candidates.extend(ranked_paths(rest));
            Disposition::Ambiguous { candidates }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::CandidateFile;
    use chrono::Duration;

    fn scored(path: &str, exact: bool, raw: bool, camera_score: u8, area: u64) -> ScoredCandidate {
        ScoredCandidate {
            candidate: CandidateFile {
                path: PathBuf::from(path),
                metadata: None,
            },
            time_ok: true,
            camera_ok: true,
            resolution_exact: exact,
            camera_score,
            resolution_area: area,
            is_raw_format: raw,
            camera_assumed: camera_score == 0,
            time_delta: Duration::zero(),
        }
    }

    fn paths(v: &[&str]) -> Vec<PathBuf> {
        v.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_raw_preference_dominates() {
        let a = scored("/a.CR2", true, true, 1, 100);
        let b = scored("/b.jpg", true, false, 2, 200);
        assert_eq!(compare_candidates(&a, &b), Ordering::Less);
        assert_eq!(compare_candidates(&b, &a), Ordering::Greater);
    }

    #[test]
    fn test_single_exact_resolves_despite_others() {
        let d = classify(
            vec![
                scored("/x/IMG_1.jpg", false, true, 2, 24_000_000),
                scored("/y/IMG_1.jpg", true, false, 2, 12_000_000),
            ],
            AbsentCameraPolicy::MatchAny,
        );
        assert_eq!(d, Disposition::Resolved { path: PathBuf::from("/y/IMG_1.jpg") });
    }

    #[test]
    fn test_multiple_exact_is_ambiguous_raw_first() {
        let d = classify(
            vec![
                scored("/a/IMG_1.jpg", true, false, 2, 100),
                scored("/b/IMG_1.NEF", true, true, 2, 100),
                scored("/c/IMG_1.jpg", false, false, 2, 50),
            ],
            AbsentCameraPolicy::MatchAny,
        );
        assert_eq!(
            d,
            Disposition::Ambiguous {
                candidates: paths(&["/b/IMG_1.NEF", "/a/IMG_1.jpg", "/c/IMG_1.jpg"])
            }
        );
    }

    #[test]
    fn test_exact_candidates_outrank_non_exact_raw() {
        let d = classify(
            vec![
                scored("/a/IMG_1.ORF", false, true, 2, 24_000_000),
                scored("/b/IMG_1.jpg", true, false, 1, 100),
                scored("/c/IMG_1.jpg", true, false, 2, 100),
            ],
            AbsentCameraPolicy::MatchAny,
        );
        assert_eq!(
            d,
            Disposition::Ambiguous {
                candidates: paths(&["/c/IMG_1.jpg", "/b/IMG_1.jpg", "/a/IMG_1.ORF"])
            }
        );
    }

    #[test]
    fn test_ambiguous_order_independent_of_input_order() {
        let make = || {
            vec![
                scored("/b/IMG_1.jpg", true, false, 1, 100),
                scored("/a/IMG_1.jpg", true, false, 1, 100),
                scored("/c/IMG_1.tif", true, false, 2, 100),
            ]
        };
        let forward = classify(make(), AbsentCameraPolicy::MatchAny);
        let mut reversed_input = make();
        reversed_input.reverse();
        assert_eq!(forward, classify(reversed_input, AbsentCameraPolicy::MatchAny));
        assert_eq!(
            forward,
            Disposition::Ambiguous {
                candidates: paths(&["/c/IMG_1.tif", "/a/IMG_1.jpg", "/b/IMG_1.jpg"])
            }
        );
    }

    #[test]
    fn test_no_exact_is_resolution_mismatch() {
        let d = classify(
            vec![
                scored("/a/IMG_1.jpg", false, false, 2, 500),
                scored("/b/IMG_1.jpg", false, false, 2, 900),
            ],
            AbsentCameraPolicy::MatchAny,
        );
        assert_eq!(
            d,
            Disposition::ResolutionMismatch {
                best: PathBuf::from("/b/IMG_1.jpg"),
                alternatives: paths(&["/a/IMG_1.jpg"]),
            }
        );
    }

    #[test]
    fn test_nothing_scored_is_still_missing() {
        assert_eq!(
            classify(vec![], AbsentCameraPolicy::MatchAny),
            Disposition::still_missing(MissingReason::NoSurvivors)
        );
    }

    #[test]
    fn test_require_review_holds_back_assumed_camera() {
        let lone = || vec![scored("/a/IMG_1.jpg", true, false, 0, 100)];
        assert_eq!(
            classify(lone(), AbsentCameraPolicy::MatchAny),
            Disposition::Resolved { path: PathBuf::from("/a/IMG_1.jpg") }
        );
        assert_eq!(
            classify(lone(), AbsentCameraPolicy::RequireReview),
            Disposition::Ambiguous { candidates: paths(&["/a/IMG_1.jpg"]) }
        );

        let confirmed = vec![scored("/a/IMG_1.jpg", true, false, 2, 100)];
        assert!(matches!(
            classify(confirmed, AbsentCameraPolicy::RequireReview),
            Disposition::Resolved { .. }
        ));
    }
}
