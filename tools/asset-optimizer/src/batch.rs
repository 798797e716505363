//! Batch helpers: file enumeration and per-file outcome accumulation
//!
//! Batch operations never abort on a single bad input. Each file's
//! `Result` is recorded, and the outcome keeps successes and failures apart
//! so callers see exactly how many inputs were dropped.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use walkdir::WalkDir;

/// A file that could not be processed
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Successes and failures of one batch run
#[derive(Debug, Clone)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BatchFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one file's result, logging failures
    pub fn record<E: Display>(&mut self, path: &Path, result: Result<T, E>) {
        match result {
            Ok(value) => self.succeeded.push(value),
            Err(e) => {
                error!("Failed to process {}: {}", path.display(), e);
                self.failed.push(BatchFailure {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Number of inputs attempted
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempted() == 0
    }
}

/// Case-insensitive extension filter, the `**/*.{a,b}` globs of the batch commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePattern {
    extensions: Vec<String>,
}

impl FilePattern {
    pub fn new(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    /// `**/*.{gltf,glb}`
    pub fn models() -> Self {
        Self::new(&["gltf", "glb"])
    }

    /// `**/*.{png,jpg,jpeg,webp}`
    pub fn images() -> Self {
        Self::new(&["png", "jpg", "jpeg", "webp"])
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// Recursively list matching files under `dir`
    ///
    /// Unreadable entries are logged and skipped.
    pub fn find(&self, dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.matches(entry.path()))
            .map(|entry| entry.into_path())
            .collect()
    }
}
