use std::collections::HashMap;
use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;
use walkdir::{DirEntry, WalkDir};

/// Lookup from lower-cased filename stem to every file sharing that stem.
/// Built once per run and read-only afterwards.
#[derive(Debug, Default)]
pub struct FilesystemIndex {
    by_stem: HashMap<String, Vec<PathBuf>>,
    file_count: usize,
}

/// Index key for a filename: NFC-normalized, lower-cased stem.
pub fn stem_key(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| file_name.into());
    stem.nfc().collect::<String>().to_lowercase()
}

/// Only the part of the path below `root` is matched, so a root whose own
/// name contains a pattern is still walked.
fn is_excluded(entry: &DirEntry, root: &Path, excluded: &[String]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
    let path = relative.to_string_lossy();
    excluded
        .iter()
        .any(|pattern| !pattern.is_empty() && path.contains(pattern.as_str()))
}

impl FilesystemIndex {
    /// Walk `root` once. Directories whose path contains any of `excluded`
    /// are pruned before descent; unreadable entries are skipped.
    pub fn build(root: &Path, excluded: &[String]) -> Self {
        tracing::info!("Indexing files under {}", root.display());
        let mut index = Self::default();

        let walker = WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| !is_excluded(e, root, excluded));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!("skipping unreadable entry: {}", err);
                    continue;
                }
            };
            // Links are not followed, but a link to a file is still a candidate.
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if is_file {
                index.insert(entry.into_path());
            }
        }

        tracing::info!(
            "Indexed {} files under {} stems",
            index.file_count,
            index.stem_count()
        );
        index
    }

    pub fn insert(&mut self, path: PathBuf) {
        let Some(name) = path.file_name() else {
            return;
        };
        let key = stem_key(&name.to_string_lossy());
        self.by_stem.entry(key).or_default().push(path);
        self.file_count += 1;
    }

    /// Files sharing `key`, in walk order. Empty when the stem is unknown.
    pub fn candidates(&self, key: &str) -> &[PathBuf] {
        self.by_stem.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn stem_count(&self) -> usize {
        self.by_stem.len()
    }
}
