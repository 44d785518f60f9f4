use serde::Serialize;

use crate::classify::MissingReason;
use crate::date::{self, Timestamp};
use crate::index;

/// One manifest row describing a photo the catalog can no longer find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingRecord {
    /// Path the catalog expects the photo at
    pub original_path: String,
    /// Final component of `original_path`
    pub expected_filename: String,
    pub camera_make: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Capture time exactly as the manifest spelled it
    pub capture_time_raw: Option<String>,
}

/// The parts of a record needed to score candidates, already parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub camera_make: Option<String>,
    pub width: u32,
    pub height: u32,
    pub capture_time: Timestamp,
}

impl MissingRecord {
    pub fn new(original_path: impl Into<String>) -> Self {
        let original_path = original_path.into();
        let expected_filename = original_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or("")
            .to_string();
        Self {
            original_path,
            expected_filename,
            camera_make: None,
            width: None,
            height: None,
            capture_time_raw: None,
        }
    }

    pub fn with_camera(mut self, make: impl Into<String>) -> Self {
        self.camera_make = Some(make.into());
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_capture_time(mut self, raw: impl Into<String>) -> Self {
        self.capture_time_raw = Some(raw.into());
        self
    }

    /// Index key for this record's expected filename.
    pub fn stem_key(&self) -> Option<String> {
        if self.expected_filename.is_empty() {
            return None;
        }
        Some(index::stem_key(&self.expected_filename))
    }

    /// Check eligibility and parse the record's own timestamp.
    /// Camera make may be absent; time, width and height may not.
    pub fn target(&self) -> Result<Target, MissingReason> {
        let mut absent = Vec::new();
        if self.capture_time_raw.is_none() {
            absent.push("capture time");
        }
        if self.width.is_none() {
            absent.push("width");
        }
        if self.height.is_none() {
            absent.push("height");
        }
        let (Some(raw), Some(width), Some(height)) = (&self.capture_time_raw, self.width, self.height)
        else {
            return Err(MissingReason::Ineligible { fields: absent });
        };

        let capture_time = date::parse_timestamp(raw).ok_or(MissingReason::UnparseableTime)?;

        Ok(Target {
            camera_make: self
                .camera_make
                .as_ref()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            width,
            height,
            capture_time,
        })
    }
}
