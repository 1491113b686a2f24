//! Category directory setup and session-file promotion.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::config::LayoutConfig;

/// Errors that can occur while promoting session files.
#[derive(Debug, Error)]
pub enum PromoteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing category subdirectories under {session_dir}: {categories:?}")]
    MissingCategoryDirs {
        session_dir: PathBuf,
        categories: Vec<String>,
    },

    #[error("Session directory not empty after promotion: {dir}")]
    SessionDirNotEmpty { dir: PathBuf },
}

/// Result type for promotion operations.
pub type Result<T> = std::result::Result<T, PromoteError>;

/// Create the canonical category subdirectories if absent.
///
/// No-op for directories that already exist.
pub fn ensure_category_dirs(
    subject_path: &Path,
    config: &LayoutConfig,
    dry_run: bool,
) -> Result<()> {
    for category in &config.categories {
        let dir = subject_path.join(category);
        if dir.is_dir() {
            continue;
        }
        if dry_run {
            println!("Would create: {}/", dir.display());
        } else {
            fs::create_dir_all(&dir)?;
        }
    }
    Ok(())
}

/// Locate the nested session directory, if any.
///
/// Candidates are matched by name prefix and sorted; when more than one
/// matches, the lexicographically first is used and the rest are logged
/// as ignored. Returns `None` when no session directory exists.
pub fn find_session_dir(subject_path: &Path, session_prefix: &str) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(subject_path)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with(session_prefix))
                    .unwrap_or(false)
        })
        .collect();

    candidates.sort();

    if candidates.len() > 1 {
        warn!(
            "Multiple session directories under {}; using {}, ignoring {:?}",
            subject_path.display(),
            candidates[0].display(),
            &candidates[1..]
        );
    }

    Ok(candidates.into_iter().next())
}

/// Move files out of the nested session directory into the canonical
/// category directories, then remove the emptied session directory.
///
/// Every *present* category subdirectory is drained before absent ones
/// are reported, so a re-run after fixing the tree only has the
/// remainder to do. All removals are non-recursive: content this
/// function did not relocate is reported, never deleted.
///
/// Returns `None` when no session directory exists (already-normalized
/// tree), otherwise the number of files moved.
pub fn promote_session_files(
    subject_path: &Path,
    config: &LayoutConfig,
    dry_run: bool,
) -> Result<Option<usize>> {
    let session_dir = match find_session_dir(subject_path, &config.session_prefix)? {
        Some(dir) => dir,
        None => return Ok(None),
    };

    let mut moved = 0;
    let mut missing: Vec<String> = Vec::new();

    for category in &config.categories {
        let old = session_dir.join(category);
        let new = subject_path.join(category);

        if !old.is_dir() {
            missing.push(category.clone());
            continue;
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(&old)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        entries.sort();

        for entry in entries {
            let file_name = match entry.file_name() {
                Some(name) => name.to_os_string(),
                None => continue,
            };
            let dest = new.join(&file_name);

            if dry_run {
                println!(
                    "Would move: {} -> {}/",
                    entry.display(),
                    new.display()
                );
            } else {
                fs::rename(&entry, &dest)?;
                info!("Moved {} -> {}", entry.display(), dest.display());
            }
            moved += 1;
        }

        if !dry_run {
            fs::remove_dir(&old)?;
        }
    }

    if !missing.is_empty() {
        return Err(PromoteError::MissingCategoryDirs {
            session_dir,
            categories: missing,
        });
    }

    if !dry_run {
        fs::remove_dir(&session_dir).map_err(|_| PromoteError::SessionDirNotEmpty {
            dir: session_dir.clone(),
        })?;
        info!("Removed session directory {}", session_dir.display());
    }

    Ok(Some(moved))
}
