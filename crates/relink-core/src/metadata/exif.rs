use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use exif::{Exif, In, Reader, Tag, Value};

use super::{Metadata, MetadataError, MetadataReader};
use crate::date;

/// Capture-time tags in priority order.
const TIME_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Reads metadata in-process with kamadak-exif, probing the image header
/// for pixel dimensions when the format is one the `image` crate decodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifMetadataReader;

impl MetadataReader for ExifMetadataReader {
    fn read(&self, path: &Path) -> Result<Metadata, MetadataError> {
        let file = File::open(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let exif = Reader::new()
            .read_from_container(&mut BufReader::new(file))
            .ok();
        let header_dims = if is_image(path) {
            image::image_dimensions(path).ok()
        } else {
            None
        };

        if exif.is_none() && header_dims.is_none() {
            return Err(MetadataError::NoMetadata {
                path: path.to_path_buf(),
            });
        }

        let mut meta = Metadata::default();
        if let Some(exif) = &exif {
            meta.camera_make = ascii_field(exif, Tag::Make).unwrap_or_default();
            if let Some(raw) = TIME_TAGS.iter().find_map(|tag| ascii_field(exif, *tag)) {
                meta.capture_time = date::parse_timestamp(&raw);
                meta.capture_time_raw = raw;
            }
        }

        let (width, height) = header_dims
            .or_else(|| exif.as_ref().and_then(exif_dimensions))
            .unwrap_or((0, 0));
        meta.width = width;
        meta.height = height;

        Ok(meta)
    }
}

fn is_image(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map_or(false, |mime| mime.type_() == mime_guess::mime::IMAGE)
}

/// First ASCII value of a primary-IFD tag, NUL padding and whitespace removed.
fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Ascii(parts) = &field.value else {
        return None;
    };
    let text = String::from_utf8_lossy(parts.first()?);
    let text = text.trim_matches(char::from(0)).trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn uint_field(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
}

/// Exif IFD pixel dimensions, falling back to the IFD0 image size.
fn exif_dimensions(exif: &Exif) -> Option<(u32, u32)> {
    let pixel = uint_field(exif, Tag::PixelXDimension).zip(uint_field(exif, Tag::PixelYDimension));
    pixel.or_else(|| uint_field(exif, Tag::ImageWidth).zip(uint_field(exif, Tag::ImageLength)))
}
