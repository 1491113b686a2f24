//! Dataset index: subject discovery and path resolution.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::LayoutConfig;

/// Errors that can occur while resolving the dataset layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Dataset root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Dataset root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Subject sub-{subject} not found under {root}")]
    SubjectNotFound { subject: String, root: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Index over a BIDS dataset root.
///
/// Subject enumeration is always sorted lexicographically so batch
/// order does not depend on filesystem enumeration order.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
    subject_prefix: String,
}

impl DatasetLayout {
    /// Open a dataset root, validating that it exists and is a directory.
    pub fn new(root: &Path, config: &LayoutConfig) -> Result<Self> {
        if !root.exists() {
            return Err(LayoutError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(LayoutError::NotADirectory(root.to_path_buf()));
        }

        Ok(Self {
            root: root.to_path_buf(),
            subject_prefix: config.subject_prefix.clone(),
        })
    }

    /// The dataset root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate subject identifiers (prefix stripped), sorted.
    pub fn subjects(&self) -> Result<Vec<String>> {
        let mut subjects: Vec<String> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix(&self.subject_prefix))
                    .map(|id| id.to_string())
            })
            .collect();

        subjects.sort();
        Ok(subjects)
    }

    /// Path to a subject's directory (not checked for existence).
    pub fn subject_path(&self, subject_id: &str) -> PathBuf {
        self.root
            .join(format!("{}{}", self.subject_prefix, subject_id))
    }

    /// Path to a subject's directory, validated.
    pub fn require_subject(&self, subject_id: &str) -> Result<PathBuf> {
        let path = self.subject_path(subject_id);
        if !path.is_dir() {
            return Err(LayoutError::SubjectNotFound {
                subject: subject_id.to_string(),
                root: self.root.clone(),
            });
        }
        Ok(path)
    }

    /// Subjects without an entry under `derivatives/<name>`.
    ///
    /// HTML report files in the derivatives directory are ignored; only
    /// subject-prefixed subdirectories count as processed.
    pub fn pending_subjects(&self, derivatives_name: &str) -> Result<Vec<String>> {
        let derivatives = self.root.join("derivatives").join(derivatives_name);

        let processed: Vec<String> = if derivatives.is_dir() {
            fs::read_dir(&derivatives)?
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_dir())
                .filter_map(|entry| {
                    entry
                        .file_name()
                        .to_str()
                        .and_then(|name| name.strip_prefix(&self.subject_prefix))
                        .map(|id| id.to_string())
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut pending: Vec<String> = self
            .subjects()?
            .into_iter()
            .filter(|id| !processed.contains(id))
            .collect();

        pending.sort();
        Ok(pending)
    }
}
