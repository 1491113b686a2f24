//! Tree-wide renaming sweeps: session-token stripping and the final
//! straggler pass.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::{CleanupConfig, LayoutConfig};
use crate::core::tokens;

/// Errors that can occur during renaming sweeps.
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to walk directory tree: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result type for renaming operations.
pub type Result<T> = std::result::Result<T, RenameError>;

/// Collect every entry under `root` (root excluded), deepest first.
///
/// Deepest-first ordering lets a sweep rename a file before its parent
/// directory, so collected paths stay valid throughout the pass.
fn collect_entries(root: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::with_capacity(64);
    for entry in WalkDir::new(root).min_depth(1).contents_first(true).sort_by_file_name() {
        entries.push(entry?.path().to_path_buf());
    }
    Ok(entries)
}

/// Rename one entry within its parent directory, if the new name differs.
fn rename_in_place(path: &Path, new_name: &str, dry_run: bool) -> Result<bool> {
    let parent = match path.parent() {
        Some(parent) => parent,
        None => return Ok(false),
    };
    let dest = parent.join(new_name);

    if dest == path {
        return Ok(false);
    }

    if dry_run {
        println!("Would rename: {} -> {}", path.display(), dest.display());
    } else {
        fs::rename(path, &dest)?;
        info!("Renamed {} -> {}", path.display(), dest.display());
    }
    Ok(true)
}

/// Strip the subject's session token from every file and directory name.
///
/// The token is discovered by scanning the tree; the scan and the
/// rename pass share one token because at most one distinct token
/// exists per subject tree. A tree with no token is left untouched.
///
/// Returns the number of entries renamed.
pub fn strip_session_tokens(
    subject_path: &Path,
    config: &LayoutConfig,
    dry_run: bool,
) -> Result<usize> {
    let entries = collect_entries(subject_path)?;

    let token = entries
        .iter()
        .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
        .find_map(|name| tokens::session_token(name, &config.session_prefix));

    let token = match token {
        Some(token) => token,
        None => {
            debug!("No session token under {}", subject_path.display());
            return Ok(0);
        }
    };

    let mut renamed = 0;
    for path in &entries {
        let name = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name,
            None => continue,
        };

        let new_name = tokens::strip_token(name, &token);
        if rename_in_place(path, &new_name, dry_run)? {
            renamed += 1;
        }
    }

    Ok(renamed)
}

/// Final sweep: strip any remaining session token and the versioning
/// tag from every name, token first.
///
/// Unlike [`strip_session_tokens`], the token is re-derived per name so
/// stragglers introduced after the main pass are still caught.
pub fn sweep_stragglers(
    subject_path: &Path,
    layout: &LayoutConfig,
    cleanup: &CleanupConfig,
    dry_run: bool,
) -> Result<usize> {
    let mut renamed = 0;

    for path in collect_entries(subject_path)? {
        let name = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name,
            None => continue,
        };

        if let Some(new_name) =
            tokens::cleaned_name(name, &layout.session_prefix, &cleanup.version_tag)
        {
            if rename_in_place(&path, &new_name, dry_run)? {
                renamed += 1;
            }
        }
    }

    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_strip_session_tokens() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("anat/sub-01_ses-A1_T1w.nii.gz"));
        touch(&temp_dir.path().join("func/sub-01_ses-A1_task-rest_bold.nii.gz"));
        touch(&temp_dir.path().join("func/sub-01_scans.tsv"));

        let renamed =
            strip_session_tokens(temp_dir.path(), &LayoutConfig::default(), false).unwrap();
        assert_eq!(renamed, 2);

        assert!(temp_dir.path().join("anat/sub-01_T1w.nii.gz").exists());
        assert!(temp_dir
            .path()
            .join("func/sub-01_task-rest_bold.nii.gz")
            .exists());
        assert!(temp_dir.path().join("func/sub-01_scans.tsv").exists());
    }

    #[test]
    fn test_strip_session_tokens_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("anat/sub-01_ses-A1_T1w.nii.gz"));

        let config = LayoutConfig::default();
        strip_session_tokens(temp_dir.path(), &config, false).unwrap();
        let second = strip_session_tokens(temp_dir.path(), &config, false).unwrap();

        assert_eq!(second, 0);
        assert!(temp_dir.path().join("anat/sub-01_T1w.nii.gz").exists());
    }

    #[test]
    fn test_strip_session_tokens_dry_run() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("anat/sub-01_ses-A1_T1w.nii.gz"));

        let renamed =
            strip_session_tokens(temp_dir.path(), &LayoutConfig::default(), true).unwrap();
        assert_eq!(renamed, 1);
        assert!(temp_dir.path().join("anat/sub-01_ses-A1_T1w.nii.gz").exists());
    }

    #[test]
    fn test_sweep_stragglers_handles_adjacent_tags() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("func/sub-01_ses-A1_v2_bold.nii.gz"));
        touch(&temp_dir.path().join("anat/sub-01_v2_T1w.nii.gz"));
        touch(&temp_dir.path().join("anat/sub-01_clean.nii.gz"));

        let renamed = sweep_stragglers(
            temp_dir.path(),
            &LayoutConfig::default(),
            &CleanupConfig::default(),
            false,
        )
        .unwrap();
        assert_eq!(renamed, 2);

        assert!(temp_dir.path().join("func/sub-01_bold.nii.gz").exists());
        assert!(temp_dir.path().join("anat/sub-01_T1w.nii.gz").exists());
        assert!(temp_dir.path().join("anat/sub-01_clean.nii.gz").exists());
    }
}
