use std::path::{Path, PathBuf};
use std::process::Command;

use super::{Metadata, MetadataError, MetadataReader};
use crate::date;

const TAG_ARGS: [&str; 5] = ["-S", "-Make", "-ImageWidth", "-ImageHeight", "-DateTimeOriginal"];

/// Reads metadata by running `exiftool` once per file.
#[derive(Debug, Clone)]
pub struct ExiftoolReader {
    program: PathBuf,
}

impl Default for ExiftoolReader {
    fn default() -> Self {
        Self::new("exiftool")
    }
}

impl ExiftoolReader {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MetadataReader for ExiftoolReader {
    fn read(&self, path: &Path) -> Result<Metadata, MetadataError> {
        let output = Command::new(&self.program)
            .args(TAG_ARGS)
            .arg(path)
            .output()
            .map_err(|source| MetadataError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            return Err(MetadataError::Tool {
                program: self.program.display().to_string(),
                path: path.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `-S` style `Key: value` lines.
pub fn parse_output(text: &str) -> Metadata {
    let mut meta = Metadata::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Make" => meta.camera_make = value.to_string(),
            "ImageWidth" => meta.width = parse_pixels(value),
            "ImageHeight" => meta.height = parse_pixels(value),
            "DateTimeOriginal" => {
                meta.capture_time = date::parse_timestamp(value);
                meta.capture_time_raw = value.to_string();
            }
            _ => {}
        }
    }
    meta
}

fn parse_pixels(value: &str) -> u32 {
    value
        .trim_end_matches(" pixels")
        .trim()
        .parse()
        .unwrap_or(0)
}
