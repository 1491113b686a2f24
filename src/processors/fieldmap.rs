//! Field-map sidecar repair: `IntendedFor` rewriting and
//! fieldmap/magnitude disambiguation.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::config::FieldmapConfig;
use crate::core::sidecar::{self, SidecarError};
use crate::core::tokens;

/// Errors that can occur while repairing field-map metadata.
#[derive(Debug, Error)]
pub enum FieldmapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    #[error("No field-map signature found in any sidecar under {dir}")]
    NoFieldmapMatch { dir: PathBuf },
}

/// Result type for field-map operations.
pub type Result<T> = std::result::Result<T, FieldmapError>;

/// Sorted list of sidecar (`.json`) files directly under `dir`.
fn sidecar_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Rewrite the `IntendedFor` list of every sidecar in the field-map
/// directory.
///
/// Sidecar self-references (entries pointing at other `.json` files)
/// are dropped; remaining entries have the session token stripped.
/// Sidecars whose filename carries the field-map word also get the
/// units annotation. Returns the number of sidecars rewritten.
pub fn rewrite_intended_for(
    fmap_dir: &Path,
    config: &FieldmapConfig,
    session_prefix: &str,
    dry_run: bool,
) -> Result<usize> {
    // A subject without a field-map directory has nothing to rewrite
    if !fmap_dir.is_dir() {
        return Ok(0);
    }

    let fieldmap_suffix = format!("{}.json", config.fieldmap_word);
    let mut rewritten = 0;

    for path in sidecar_files(fmap_dir)? {
        let mut value = sidecar::load_sidecar(&path)?;
        let references = sidecar::intended_for(&value, &path)?;

        let cleaned: Vec<String> = references
            .into_iter()
            .filter(|reference| !reference.contains(".json"))
            .map(|reference| match tokens::session_token(&reference, session_prefix) {
                Some(token) => tokens::strip_token_from_path(&reference, &token),
                None => reference,
            })
            .collect();

        sidecar::set_intended_for(&mut value, cleaned);

        let is_fieldmap = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with(&fieldmap_suffix))
            .unwrap_or(false);
        if is_fieldmap {
            sidecar::set_units(&mut value, &config.units);
        }

        if dry_run {
            println!("Would rewrite: {}", path.display());
        } else {
            sidecar::save_sidecar(&path, &value)?;
            info!("Rewrote {}", path.display());
        }
        rewritten += 1;
    }

    Ok(rewritten)
}

/// Find the field-map naming key by content-sniffing each sidecar.
///
/// Sidecars are scanned in lexicographic filename order; the first
/// whose nested `fslhd.filename` contains the field-map word wins.
/// Sidecars without the content field are skipped.
fn isolate_fieldmap_key(fmap_dir: &Path, config: &FieldmapConfig) -> Result<String> {
    if !fmap_dir.is_dir() {
        return Err(FieldmapError::NoFieldmapMatch {
            dir: fmap_dir.to_path_buf(),
        });
    }

    for path in sidecar_files(fmap_dir)? {
        let value = sidecar::load_sidecar(&path)?;

        let matches = sidecar::fslhd_filename(&value)
            .map(|filename| filename.contains(&config.fieldmap_word))
            .unwrap_or(false);

        if matches {
            if let Some(stem) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_suffix(".json"))
            {
                return Ok(stem.to_string());
            }
        }
    }

    Err(FieldmapError::NoFieldmapMatch {
        dir: fmap_dir.to_path_buf(),
    })
}

/// Disambiguate the fieldmap/magnitude acquisition pair.
///
/// The sidecar whose content field matches is the reference; every
/// other file in the directory is renamed to the reference's naming
/// convention with the magnitude word substituted. Only extensions the
/// renamer understands (`.json`, `.nii.gz`, `.nii`) are touched. When
/// no sidecar matches, an error is returned and nothing is renamed.
pub fn rename_magnitude(fmap_dir: &Path, config: &FieldmapConfig, dry_run: bool) -> Result<usize> {
    let fieldmap_key = isolate_fieldmap_key(fmap_dir, config)?;
    let magnitude_key = fieldmap_key.replace(&config.fieldmap_word, &config.magnitude_word);

    let mut entries: Vec<PathBuf> = fs::read_dir(fmap_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    let mut renamed = 0;
    for path in entries {
        let name = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name,
            None => continue,
        };

        // Skip the reference acquisition's own files
        if name.contains(&fieldmap_key) {
            continue;
        }

        let new_name = if name.ends_with(".nii.gz") {
            format!("{}.nii.gz", magnitude_key)
        } else if name.ends_with(".nii") {
            format!("{}.nii", magnitude_key)
        } else if name.ends_with(".json") {
            format!("{}.json", magnitude_key)
        } else {
            warn!("Skipping unrecognized fmap file: {}", path.display());
            continue;
        };

        let dest = fmap_dir.join(&new_name);
        if dest == path {
            continue;
        }
        if dest.exists() {
            warn!("Overwriting existing file: {}", dest.display());
        }

        if dry_run {
            println!("Would rename: {} -> {}", path.display(), dest.display());
        } else {
            fs::rename(&path, &dest)?;
            info!("Renamed {} -> {}", path.display(), dest.display());
        }
        renamed += 1;
    }

    Ok(renamed)
}
