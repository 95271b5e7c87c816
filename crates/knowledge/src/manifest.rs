//! Persisted record of indexed source files.
//!
//! The manifest is a JSON object keyed by source path:
//!
//! ```json
//! { "hr/general/leave.pdf": { "last_modified": 1717000000.5, "processed_at": "2024-05-29T10:00:00+00:00" } }
//! ```
//!
//! An entry is only written after the file's chunks are in the index, so a
//! crash leaves the file eligible for the next run.

use chrono::Utc;
use handbook_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Source mtime (seconds since epoch) at the time it was indexed
    pub last_modified: f64,

    /// When indexing finished, RFC 3339
    #[serde(default)]
    pub processed_at: String,
}

#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// An empty manifest that will be saved to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the manifest at `path`.
    ///
    /// A missing, empty or unparseable file yields an empty manifest; the
    /// next save replaces it. Other I/O failures are returned.
    pub fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No manifest yet, starting empty");
                return Ok(Self::empty(path));
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                let err = AppError::ManifestCorruption(format!("{}: {}", path.display(), e));
                tracing::warn!(error = %err, "Treating manifest as empty");
                return Ok(Self::empty(path));
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Self::empty(path));
        }

        match serde_json::from_str::<BTreeMap<String, ManifestEntry>>(&contents) {
            Ok(entries) => {
                tracing::debug!(path = %path.display(), entries = entries.len(), "Loaded manifest");
                Ok(Self { path, entries })
            }
            Err(e) => {
                let err = AppError::ManifestCorruption(format!("{}: {}", path.display(), e));
                tracing::warn!(error = %err, "Treating manifest as empty");
                Ok(Self::empty(path))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, source: &str) -> Option<&ManifestEntry> {
        self.entries.get(source)
    }

    /// True when `source` has no entry or was modified after it was indexed.
    pub fn is_changed(&self, source: &str, last_modified: f64) -> bool {
        match self.entries.get(source) {
            Some(entry) => last_modified > entry.last_modified,
            None => true,
        }
    }

    /// Mark `source` as indexed at its current mtime. Call `save` to persist.
    pub fn record(&mut self, source: impl Into<String>, last_modified: f64) {
        self.entries.insert(
            source.into(),
            ManifestEntry {
                last_modified,
                processed_at: Utc::now().to_rfc3339(),
            },
        );
    }

    /// Write the manifest atomically (temp file then rename).
    pub fn save(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ManifestEntry)> {
        self.entries.iter()
    }

    /// Most recent `processed_at` value, if any.
    pub fn last_processed_at(&self) -> Option<&str> {
        self.entries
            .values()
            .map(|e| e.processed_at.as_str())
            .filter(|s| !s.is_empty())
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_manifest_is_empty() {
        let temp = TempDir::new().unwrap();
        let manifest = Manifest::load(temp.path().join("data/processed_files.json")).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_corrupted_manifest_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("processed_files.json");
        fs::write(&path, "{ not json").unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data/processed_files.json");

        let mut manifest = Manifest::load(&path).unwrap();
        manifest.record("hr/general/leave.pdf", 1700000000.25);
        manifest.save().unwrap();

        let reloaded = Manifest::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        let entry = reloaded.get("hr/general/leave.pdf").unwrap();
        assert_eq!(entry.last_modified, 1700000000.25);
        assert!(!entry.processed_at.is_empty());
        assert!(!temp.path().join("data/processed_files.json.tmp").exists());
    }

    #[test]
    fn test_corrupted_manifest_heals_on_save() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("processed_files.json");
        fs::write(&path, "[1, 2").unwrap();

        let mut manifest = Manifest::load(&path).unwrap();
        manifest.record("a/b/c.txt", 1.0);
        manifest.save().unwrap();

        assert_eq!(Manifest::load(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_is_changed_requires_strictly_newer_mtime() {
        let mut manifest = Manifest::empty("unused.json");
        assert!(manifest.is_changed("a/b/c.txt", 10.0));

        manifest.record("a/b/c.txt", 10.0);
        assert!(!manifest.is_changed("a/b/c.txt", 10.0));
        assert!(!manifest.is_changed("a/b/c.txt", 9.0));
        assert!(manifest.is_changed("a/b/c.txt", 10.5));
    }

    #[test]
    fn test_tolerates_missing_processed_at() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("processed_files.json");
        fs::write(&path, r#"{"a/b/c.txt": {"last_modified": 3.5}}"#).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.get("a/b/c.txt").unwrap().last_modified, 3.5);
        assert!(manifest.last_processed_at().is_none());
    }
}
