//! Change detection over the documents root.
//!
//! Layout: `<root>/<department>/<role>/.../<file>`. Department and role are
//! taken from the first two path components below the root.

use crate::manifest::Manifest;
use crate::roles::normalize_role;
use crate::types::SourceFile;
use handbook_core::{AppError, AppResult};
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

/// Result of one scan over the documents root.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// New or modified files (every eligible file in force mode), sorted by path
    pub changed: Vec<SourceFile>,

    /// Eligible files already indexed at their current mtime
    pub unchanged: usize,

    /// Supported files excluded because metadata could not be derived
    pub rejected: usize,

    /// Supported files seen
    pub scanned: usize,
}

#[derive(Debug, Clone)]
pub struct ChangeDetector {
    root: PathBuf,
    extensions: Vec<String>,
}

impl ChangeDetector {
    pub fn new<I, S>(root: impl Into<PathBuf>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            root: root.into(),
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Classify every supported file under the root against `manifest`.
    ///
    /// Per-file failures are logged and counted as rejected; only a missing
    /// or unreadable root fails the scan.
    pub fn scan(&self, manifest: &Manifest, force: bool) -> AppResult<ScanOutcome> {
        if !self.root.is_dir() {
            return Err(AppError::Config(format!(
                "Documents directory not found: {}",
                self.root.display()
            )));
        }

        let mut outcome = ScanOutcome::default();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if e.depth() == 0 {
                        return Err(AppError::Io(e.into()));
                    }
                    tracing::warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.is_supported(path) {
                tracing::debug!(path = %path.display(), "Skipping unsupported file");
                continue;
            }

            outcome.scanned += 1;

            let file = match self.describe(path) {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!(error = %e, "Excluding file from sync");
                    outcome.rejected += 1;
                    continue;
                }
            };

            if force || manifest.is_changed(&file.source, file.last_modified) {
                outcome.changed.push(file);
            } else {
                outcome.unchanged += 1;
            }
        }

        tracing::debug!(
            scanned = outcome.scanned,
            changed = outcome.changed.len(),
            unchanged = outcome.unchanged,
            rejected = outcome.rejected,
            force,
            "Scan complete"
        );

        Ok(outcome)
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.extensions.iter().any(|s| s == &e))
    }

    fn describe(&self, path: &Path) -> AppResult<SourceFile> {
        let (source, department, role) = derive_metadata(&self.root, path)?;

        let last_modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| AppError::PathMetadata {
                path: path.to_path_buf(),
                reason: format!("cannot read modification time: {}", e),
            })?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Ok(SourceFile {
            path: path.to_path_buf(),
            source,
            department,
            role,
            last_modified,
        })
    }
}

/// Derive `(source, department, role)` from a path below `root`.
pub fn derive_metadata(root: &Path, path: &Path) -> AppResult<(String, String, String)> {
    let relative = path.strip_prefix(root).map_err(|_| AppError::PathMetadata {
        path: path.to_path_buf(),
        reason: format!("not under documents root {}", root.display()),
    })?;

    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.len() < 3 {
        return Err(AppError::PathMetadata {
            path: path.to_path_buf(),
            reason: "expected <department>/<role>/<file> below the documents root".to_string(),
        });
    }

    let department = normalize_role(&parts[0]);
    let role = normalize_role(&parts[1]);
    if department.is_empty() || role.is_empty() {
        return Err(AppError::PathMetadata {
            path: path.to_path_buf(),
            reason: "department and role must not be blank".to_string(),
        });
    }

    Ok((parts.join("/"), department, role))
}
