//! JSON sidecar read/rewrite.
//!
//! Sidecars are read into a generic `serde_json::Value` so unknown keys
//! survive a rewrite untouched, and written back with the 5-space
//! indentation the rest of the pipeline expects.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;
use thiserror::Error;

/// The field holding the ordered list of cross-referenced files.
pub const INTENDED_FOR: &str = "IntendedFor";

/// The units annotation field set on field-map sidecars.
pub const UNITS: &str = "Units";

/// Errors that can occur while reading or rewriting sidecars.
#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse sidecar JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sidecar has no IntendedFor field: {path}")]
    MissingIntendedFor { path: PathBuf },

    #[error("IntendedFor is not a list of strings: {path}")]
    MalformedIntendedFor { path: PathBuf },
}

/// Result type for sidecar operations.
pub type Result<T> = std::result::Result<T, SidecarError>;

/// Load a sidecar file as a JSON object.
pub fn load_sidecar(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    Ok(value)
}

/// Write a sidecar back to its original location.
///
/// Indentation is fixed at 5 spaces to keep rewrites byte-stable across
/// runs.
pub fn save_sidecar(path: &Path, value: &Value) -> Result<()> {
    let mut buf = Vec::with_capacity(1024);
    let formatter = PrettyFormatter::with_indent(b"     ");
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    fs::write(path, buf)?;
    Ok(())
}

/// Extract the `IntendedFor` list from a sidecar.
///
/// A missing field is an error; a field of the wrong shape is reported
/// separately so the log distinguishes the two.
pub fn intended_for(value: &Value, path: &Path) -> Result<Vec<String>> {
    let field = value
        .get(INTENDED_FOR)
        .ok_or_else(|| SidecarError::MissingIntendedFor {
            path: path.to_path_buf(),
        })?;

    let entries = field
        .as_array()
        .ok_or_else(|| SidecarError::MalformedIntendedFor {
            path: path.to_path_buf(),
        })?;

    entries
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| SidecarError::MalformedIntendedFor {
                    path: path.to_path_buf(),
                })
        })
        .collect()
}

/// Replace the `IntendedFor` list in a sidecar.
pub fn set_intended_for(value: &mut Value, references: Vec<String>) {
    let entries: Vec<Value> = references.into_iter().map(Value::String).collect();
    value[INTENDED_FOR] = Value::Array(entries);
}

/// Set the units annotation on a sidecar.
pub fn set_units(value: &mut Value, units: &str) {
    value[UNITS] = Value::String(units.to_string());
}

/// Read the nested `fslhd.filename` content field, if present.
///
/// This is the field whose value distinguishes a field-map acquisition
/// from its magnitude pair.
pub fn fslhd_filename(value: &Value) -> Option<&str> {
    value.get("fslhd")?.get("filename")?.as_str()
}
