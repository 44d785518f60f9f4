use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use csv::{StringRecord, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::classify::{Disposition, MissingReason};
use crate::manifest::ManifestRow;
use crate::RelinkOptions;

pub const RELINK_SCRIPT: &str = "relink_good_matches.sh";
pub const AMBIGUOUS_CSV: &str = "ambiguous_matches.csv";
pub const MISMATCH_CSV: &str = "resolution_mismatches.csv";
pub const STILL_MISSING_CSV: &str = "Still_Missing_Photos.csv";
pub const SUMMARY_JSON: &str = "relink_summary.json";

const REASON_COLUMN: &str = "Relink Reason";

/// How the generated script links a found file back to its catalog path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkMode {
    #[default]
    Hard,
    Symbolic,
}

/// A manifest row paired with its disposition.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub row: ManifestRow,
    pub disposition: Disposition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: u64,
    pub resolved: u64,
    pub ambiguous: u64,
    pub resolution_mismatch: u64,
    pub still_missing: u64,
}

#[derive(Serialize)]
struct SummaryFile<'a> {
    options: &'a RelinkOptions,
    summary: &'a Summary,
}

/// Outcomes grouped by disposition, ready to be written.
pub struct Report<'a> {
    headers: &'a StringRecord,
    resolved: Vec<(&'a ManifestRow, &'a Path)>,
    ambiguous: Vec<(&'a ManifestRow, &'a [PathBuf])>,
    mismatched: Vec<(&'a ManifestRow, &'a Path, &'a [PathBuf])>,
    missing: Vec<(&'a ManifestRow, &'a MissingReason)>,
}

impl<'a> Report<'a> {
    pub fn from_outcomes(headers: &'a StringRecord, outcomes: &'a [Outcome]) -> Self {
        let mut report = Report {
            headers,
            resolved: Vec::new(),
            ambiguous: Vec::new(),
            mismatched: Vec::new(),
            missing: Vec::new(),
        };
        for outcome in outcomes {
            let row = &outcome.row;
            match &outcome.disposition {
                Disposition::Resolved { path } => report.resolved.push((row, path.as_path())),
                Disposition::Ambiguous { candidates } => {
                    report.ambiguous.push((row, candidates.as_slice()))
                }
                Disposition::ResolutionMismatch { best, alternatives } => {
                    report
                        .mismatched
                        .push((row, best.as_path(), alternatives.as_slice()))
                }
                Disposition::StillMissing { reason } => report.missing.push((row, reason)),
            }
        }
        report
    }

    pub fn summary(&self) -> Summary {
        let resolved = self.resolved.len() as u64;
        let ambiguous = self.ambiguous.len() as u64;
        let resolution_mismatch = self.mismatched.len() as u64;
        let still_missing = self.missing.len() as u64;
        Summary {
            total: resolved + ambiguous + resolution_mismatch + still_missing,
            resolved,
            ambiguous,
            resolution_mismatch,
            still_missing,
        }
    }

    /// Write the link script, the three review CSVs and the summary into
    /// `options.output`. Returns the paths written.
    pub fn write(&self, options: &RelinkOptions) -> anyhow::Result<Vec<PathBuf>> {
        let dir = &options.output;
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;

        let written = vec![
            self.write_script(&dir.join(RELINK_SCRIPT), options.link_mode)?,
            self.write_ambiguous(&dir.join(AMBIGUOUS_CSV))?,
            self.write_mismatched(&dir.join(MISMATCH_CSV))?,
            self.write_missing(&dir.join(STILL_MISSING_CSV))?,
            self.write_summary(&dir.join(SUMMARY_JSON), options)?,
        ];
        Ok(written)
    }

    fn write_script(&self, path: &Path, mode: LinkMode) -> anyhow::Result<PathBuf> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "#!/bin/bash")?;
        for (row, found) in &self.resolved {
            writeln!(out, "{}", link_command(found, &row.record.original_path, mode))?;
        }
        out.flush()?;
        drop(out);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
        }
        Ok(path.to_path_buf())
    }

    fn write_ambiguous(&self, path: &Path) -> anyhow::Result<PathBuf> {
        let mut writer = WriterBuilder::new().from_path(path)?;
        writer.write_record(["Missing", "Candidates"])?;
        for (row, candidates) in &self.ambiguous {
            let joined = join_paths(candidates);
            writer.write_record([row.record.original_path.as_str(), joined.as_str()])?;
        }
        writer.flush()?;
        Ok(path.to_path_buf())
    }

    fn write_mismatched(&self, path: &Path) -> anyhow::Result<PathBuf> {
        let mut writer = WriterBuilder::new().from_path(path)?;
        writer.write_record(["Missing", "Expected Resolution", "Best Candidate", "Alternatives"])?;
        for (row, best, alternatives) in &self.mismatched {
            let expected = match (row.record.width, row.record.height) {
                (Some(w), Some(h)) => format!("{}x{}", w, h),
                _ => String::new(),
            };
            let best = best.to_string_lossy();
            let joined = join_paths(alternatives);
            writer.write_record([
                row.record.original_path.as_str(),
                expected.as_str(),
                &*best,
                joined.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(path.to_path_buf())
    }

    fn write_missing(&self, path: &Path) -> anyhow::Result<PathBuf> {
        let mut writer = WriterBuilder::new().flexible(true).from_path(path)?;
        let mut headers = self.headers.clone();
        headers.push_field(REASON_COLUMN);
        writer.write_record(&headers)?;

        let width = self.headers.len();
        for (row, reason) in &self.missing {
            let mut fields: Vec<String> = row.fields.iter().map(str::to_string).collect();
            fields.resize(width.max(fields.len()), String::new());
            fields.push(reason.to_string());
            writer.write_record(&fields)?;
        }
        writer.flush()?;
        Ok(path.to_path_buf())
    }

    fn write_summary(&self, path: &Path, options: &RelinkOptions) -> anyhow::Result<PathBuf> {
        let file = File::create(path)?;
        let summary = self.summary();
        serde_json::to_writer_pretty(
            file,
            &SummaryFile {
                options,
                summary: &summary,
            },
        )?;
        Ok(path.to_path_buf())
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Quote `s` for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// `ln` command linking the found file to the path the catalog expects.
pub fn link_command(found: &Path, original_path: &str, mode: LinkMode) -> String {
    let flag = match mode {
        LinkMode::Hard => "",
        LinkMode::Symbolic => "-s ",
    };
    format!(
        "ln {}{} {}",
        flag,
        shell_quote(&found.to_string_lossy()),
        shell_quote(original_path)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest;
    use tempfile::tempdir;

    const MANIFEST: &str = "\
Photo,Camera Make,Width,Height,Date/Time Original (Capture)
/orig/IMG_1.jpg,Canon,4000,3000,2021-05-01 10:00:00
/orig/IMG_2.jpg,Canon,4000,3000,2021-05-01 10:00:00
/orig/IMG_3.jpg,Canon,4000,3000,2021-05-01 10:00:00
/orig/Bob's IMG_4.jpg,Canon,,3000,
";

    fn outcomes(m: &manifest::Manifest) -> Vec<Outcome> {
        let dispositions = vec![
            Disposition::Resolved {
                path: PathBuf::from("/lib/IMG_1.CR2"),
            },
            Disposition::Ambiguous {
                candidates: vec![PathBuf::from("/lib/a/IMG_2.NEF"), PathBuf::from("/lib/b/IMG_2.jpg")],
            },
            Disposition::ResolutionMismatch {
                best: PathBuf::from("/lib/IMG_3.jpg"),
                alternatives: vec![],
            },
            Disposition::still_missing(MissingReason::Ineligible {
                fields: vec!["capture time", "width"],
            }),
        ];
        m.rows
            .iter()
            .cloned()
            .zip(dispositions)
            .map(|(row, disposition)| Outcome { row, disposition })
            .collect()
    }

    #[test]
    fn test_shell_quoting() {
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("Bob's"), r"'Bob'\''s'");
        assert_eq!(
            link_command(Path::new("/lib/x.jpg"), "/orig/x.jpg", LinkMode::Symbolic),
            "ln -s '/lib/x.jpg' '/orig/x.jpg'"
        );
    }

    #[test]
    fn test_write_all_artifacts() {
        let m = manifest::parse(MANIFEST.as_bytes()).unwrap();
        let outcomes = outcomes(&m);
        let report = Report::from_outcomes(&m.headers, &outcomes);
        assert_eq!(
            report.summary(),
            Summary {
                total: 4,
                resolved: 1,
                ambiguous: 1,
                resolution_mismatch: 1,
                still_missing: 1,
            }
        );

        let dir = tempdir().unwrap();
        let mut options = RelinkOptions::new("m.csv", "/lib", dir.path());
        options.link_mode = LinkMode::Hard;
        let written = report.write(&options).unwrap();
        assert_eq!(written.len(), 5);

        let script = fs::read_to_string(dir.path().join(RELINK_SCRIPT)).unwrap();
        assert_eq!(script, "#!/bin/bash\nln '/lib/IMG_1.CR2' '/orig/IMG_1.jpg'\n");

        let ambiguous = fs::read_to_string(dir.path().join(AMBIGUOUS_CSV)).unwrap();
        assert_eq!(
            ambiguous,
            "Missing,Candidates\n/orig/IMG_2.jpg,/lib/a/IMG_2.NEF; /lib/b/IMG_2.jpg\n"
        );

        let mismatched = fs::read_to_string(dir.path().join(MISMATCH_CSV)).unwrap();
        assert_eq!(
            mismatched,
            "Missing,Expected Resolution,Best Candidate,Alternatives\n/orig/IMG_3.jpg,4000x3000,/lib/IMG_3.jpg,\n"
        );

        let missing = fs::read_to_string(dir.path().join(STILL_MISSING_CSV)).unwrap();
        let mut lines = missing.lines();
        assert_eq!(
            lines.next(),
            Some("Photo,Camera Make,Width,Height,Date/Time Original (Capture),Relink Reason")
        );
        assert_eq!(
            lines.next(),
            Some("/orig/Bob's IMG_4.jpg,Canon,,3000,,\"manifest missing capture time, width\"")
        );

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(SUMMARY_JSON)).unwrap()).unwrap();
        assert_eq!(summary["summary"]["resolved"], 1);
        assert_eq!(summary["options"]["link_mode"], "hard");
    }
}
