//! In-place normalizer for single-session BIDS datasets.
//!
//! This crate provides tools for:
//! - Promoting files out of nested `ses-*` session directories
//! - Stripping session tags from file and directory names
//! - Rewriting `IntendedFor` cross-references in fieldmap JSON sidecars
//! - Disambiguating fieldmap/magnitude acquisition pairs by sidecar content
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use bids_normalizer::config::NormalizerConfig;
//! use bids_normalizer::processors::subject::{normalize_subject, NormalizeOptions};
//!
//! let config = NormalizerConfig::default();
//! let options = NormalizeOptions::default();
//! let report = normalize_subject(Path::new("./bids/sub-00123"), "00123", &config, &options);
//! assert!(report.succeeded());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use config::{CleanupConfig, FieldmapConfig, LayoutConfig, NormalizerConfig};
pub use crate::core::report::{BatchReport, Stage, StageOutcome, SubjectReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
