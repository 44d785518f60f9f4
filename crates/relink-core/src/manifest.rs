use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use csv::{ReaderBuilder, StringRecord, Trim};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::record::MissingRecord;

pub const PHOTO_COLUMN: &str = "Photo";
pub const CAMERA_MAKE_COLUMN: &str = "Camera Make";
pub const WIDTH_COLUMN: &str = "Width";
pub const HEIGHT_COLUMN: &str = "Height";
pub const CAPTURE_TIME_COLUMN: &str = "Date/Time Original (Capture)";

/// A manifest row: the parsed record plus the raw cells, so unresolved
/// rows can be written back out unchanged.
#[derive(Debug, Clone)]
pub struct ManifestRow {
    pub record: MissingRecord,
    pub fields: StringRecord,
}

#[derive(Debug, Clone)]
pub struct Manifest {
    pub headers: StringRecord,
    pub rows: Vec<ManifestRow>,
}

struct Columns {
    photo: usize,
    camera_make: Option<usize>,
    width: Option<usize>,
    height: Option<usize>,
    capture_time: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> anyhow::Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Ok(Self {
            photo: find(PHOTO_COLUMN)
                .with_context(|| format!("manifest has no '{}' column", PHOTO_COLUMN))?,
            camera_make: find(CAMERA_MAKE_COLUMN),
            width: find(WIDTH_COLUMN),
            height: find(HEIGHT_COLUMN),
            capture_time: find(CAPTURE_TIME_COLUMN),
        })
    }
}

/// Load a manifest CSV from disk.
pub fn load(path: &Path) -> anyhow::Result<Manifest> {
    let file = File::open(path)
        .with_context(|| format!("failed to open manifest {}", path.display()))?;
    parse(file).with_context(|| format!("failed to read manifest {}", path.display()))
}

/// Parse manifest CSV. Blank cells become absent fields.
pub fn parse<R: Read>(input: R) -> anyhow::Result<Manifest> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);
    let headers = reader.headers()?.clone();
    let columns = Columns::locate(&headers)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let fields = result?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| fields.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let mut record = MissingRecord::new(cell(Some(columns.photo)).unwrap_or(""));
        record.camera_make = cell(columns.camera_make).map(str::to_string);
        record.width = cell(columns.width).and_then(parse_dimension);
        record.height = cell(columns.height).and_then(parse_dimension);
        record.capture_time_raw = cell(columns.capture_time).map(str::to_string);

        rows.push(ManifestRow { record, fields });
    }

    Ok(Manifest { headers, rows })
}

/// Integer pixel count, also accepting whole floats like `4000.0`.
fn parse_dimension(value: &str) -> Option<u32> {
    if let Ok(v) = value.parse::<u32>() {
        return Some(v);
    }
    let f: f64 = value.parse().ok()?;
    (f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&f)).then_some(f as u32)
}

impl Manifest {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep `n` rows picked with a seeded RNG, in manifest order.
    pub fn sample(mut self, n: usize, seed: u64) -> Self {
        if n >= self.rows.len() {
            return self;
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut picked = rand::seq::index::sample(&mut rng, self.rows.len(), n).into_vec();
        picked.sort_unstable();

        self.rows = self
            .rows
            .into_iter()
            .enumerate()
            .filter(|(i, _)| picked.binary_search(i).is_ok())
            .map(|(_, row)| row)
            .collect();
        self
    }

    /// First row whose photo path contains `filename`, ignoring case.
    pub fn find_by_filename(&self, filename: &str) -> Option<&ManifestRow> {
        let needle = filename.to_lowercase();
        self.rows
            .iter()
            .find(|row| row.record.original_path.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Photo,Camera Make,Width,Height,Date/Time Original (Capture),Rating
/orig/IMG_0099.jpg,Canon,4000,3000,2021-05-01 10:00:00,5
/orig/IMG_0100.jpg,,4000.0,3000.0,2021-05-01 10:01:00,
/orig/IMG_0101.jpg, Canon ,,3000,,2
";

    #[test]
    fn test_parse_fields_and_absence() {
        let manifest = parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.headers.len(), 6);

        let first = &manifest.rows[0].record;
        assert_eq!(first.expected_filename, "IMG_0099.jpg");
        assert_eq!(first.camera_make.as_deref(), Some("Canon"));
        assert_eq!((first.width, first.height), (Some(4000), Some(3000)));
        assert_eq!(first.capture_time_raw.as_deref(), Some("2021-05-01 10:00:00"));

        let second = &manifest.rows[1].record;
        assert_eq!(second.camera_make, None);
        assert_eq!((second.width, second.height), (Some(4000), Some(3000)));

        let third = &manifest.rows[2].record;
        assert_eq!(third.camera_make.as_deref(), Some("Canon"));
        assert_eq!(third.width, None);
        assert_eq!(third.capture_time_raw, None);
        assert_eq!(manifest.rows[2].fields.get(5), Some("2"));
    }

    #[test]
    fn test_missing_optional_columns_and_required_photo() {
        let manifest = parse("Photo\n/a/b.jpg\n".as_bytes()).unwrap();
        assert_eq!(manifest.rows[0].record.width, None);
        assert!(parse("Name,Width\na.jpg,1\n".as_bytes()).is_err());
    }

    #[test]
    fn test_parse_dimension() {
        assert_eq!(parse_dimension("4000"), Some(4000));
        assert_eq!(parse_dimension("4000.0"), Some(4000));
        assert_eq!(parse_dimension("4000.5"), None);
        assert_eq!(parse_dimension("nan"), None);
        assert_eq!(parse_dimension("-1"), None);
        assert_eq!(parse_dimension("wide"), None);
    }

    #[test]
    fn test_sample_is_seeded_and_ordered() {
        let mut csv = String::from("Photo\n");
        for i in 0..50 {
            csv.push_str(&format!("/orig/IMG_{:04}.jpg\n", i));
        }
        let manifest = parse(csv.as_bytes()).unwrap();

        let a = manifest.clone().sample(10, 42);
        let b = manifest.clone().sample(10, 42);
        let names = |m: &Manifest| -> Vec<String> {
            m.rows.iter().map(|r| r.record.original_path.clone()).collect()
        };
        assert_eq!(a.len(), 10);
        assert_eq!(names(&a), names(&b));
        let mut sorted = names(&a);
        sorted.sort();
        assert_eq!(names(&a), sorted);

        assert_eq!(manifest.clone().sample(500, 42).len(), 50);
    }

    #[test]
    fn test_find_by_filename_ignores_case() {
        let manifest = parse(SAMPLE.as_bytes()).unwrap();
        let row = manifest.find_by_filename("img_0100.JPG").unwrap();
        assert_eq!(row.record.original_path, "/orig/IMG_0100.jpg");
        assert!(manifest.find_by_filename("IMG_9999.jpg").is_none());
    }
}
