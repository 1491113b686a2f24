//! Configuration types for the normalizer.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the on-disk BIDS layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Prefix of subject directory names (e.g., "sub-")
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    /// Prefix of the session token (e.g., "ses-")
    #[serde(default = "default_session_prefix")]
    pub session_prefix: String,

    /// Canonical category subdirectories per subject
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Name of the field-map category subdirectory
    #[serde(default = "default_fmap_dir")]
    pub fmap_dir: String,
}

fn default_subject_prefix() -> String {
    "sub-".to_string()
}

fn default_session_prefix() -> String {
    "ses-".to_string()
}

fn default_categories() -> Vec<String> {
    vec!["anat".to_string(), "fmap".to_string(), "func".to_string()]
}

fn default_fmap_dir() -> String {
    "fmap".to_string()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            subject_prefix: default_subject_prefix(),
            session_prefix: default_session_prefix(),
            categories: default_categories(),
            fmap_dir: default_fmap_dir(),
        }
    }
}

/// Configuration for the final straggler sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Secondary versioning tag stripped after the session token
    #[serde(default = "default_version_tag")]
    pub version_tag: String,
}

fn default_version_tag() -> String {
    "v2_".to_string()
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            version_tag: default_version_tag(),
        }
    }
}

/// Configuration for field-map sidecar handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldmapConfig {
    /// Word identifying the field-map acquisition in names and content
    #[serde(default = "default_fieldmap_word")]
    pub fieldmap_word: String,

    /// Word substituted into the paired magnitude acquisition's names
    #[serde(default = "default_magnitude_word")]
    pub magnitude_word: String,

    /// Units annotation written to field-map sidecars
    #[serde(default = "default_units")]
    pub units: String,
}

fn default_fieldmap_word() -> String {
    "fieldmap".to_string()
}

fn default_magnitude_word() -> String {
    "magnitude".to_string()
}

fn default_units() -> String {
    "Hz".to_string()
}

impl Default for FieldmapConfig {
    fn default() -> Self {
        Self {
            fieldmap_word: default_fieldmap_word(),
            magnitude_word: default_magnitude_word(),
            units: default_units(),
        }
    }
}

/// Main normalizer configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub cleanup: CleanupConfig,

    #[serde(default)]
    pub fieldmap: FieldmapConfig,
}

impl NormalizerConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: NormalizerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
