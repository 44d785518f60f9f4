pub mod exif;
pub mod exiftool;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::date::Timestamp;

pub use self::exif::ExifMetadataReader;
pub use self::exiftool::ExiftoolReader;

/// What a candidate file says about itself.
/// Absent tags default to an empty make, 0x0 and no capture time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub camera_make: String,
    pub width: u32,
    pub height: u32,
    pub capture_time: Option<Timestamp>,
    /// Capture time as stored in the file, kept for reports
    pub capture_time_raw: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no EXIF data or image header in {}", .path.display())]
    NoMetadata { path: PathBuf },
    #[error("{program} failed on {}: {message}", .path.display())]
    Tool {
        program: String,
        path: PathBuf,
        message: String,
    },
}

/// Source of candidate metadata. Implementations must be shareable
/// across worker threads.
pub trait MetadataReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Metadata, MetadataError>;
}

/// Which reader a run should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReaderKind {
    /// In-process EXIF and image header decoding
    #[default]
    Exif,
    /// Shell out to exiftool
    Exiftool,
}

/// Build the reader selected by `kind`.
pub fn reader_for(kind: ReaderKind, exiftool_program: &Path) -> Box<dyn MetadataReader> {
    match kind {
        ReaderKind::Exif => Box::new(ExifMetadataReader),
        ReaderKind::Exiftool => Box::new(ExiftoolReader::new(exiftool_program)),
    }
}
