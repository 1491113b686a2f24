//! Per-subject stage driver and the batch loop.

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::NormalizerConfig;
use crate::core::layout::DatasetLayout;
use crate::core::report::{BatchReport, Stage, StageOutcome, SubjectReport};
use crate::processors::{fieldmap, promote, rename};

/// Options controlling a normalization run.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    /// Run the fieldmap/magnitude disambiguation stage
    pub rename_magnitude: bool,

    /// Preview changes without mutating the tree
    pub dry_run: bool,
}

/// Run every normalization stage on one subject.
///
/// Each stage failure is recorded in the report and the remaining
/// stages still run; nothing here aborts the batch.
pub fn normalize_subject(
    subject_path: &Path,
    subject_id: &str,
    config: &NormalizerConfig,
    options: &NormalizeOptions,
) -> SubjectReport {
    let mut report = SubjectReport::new(subject_id);
    let dry_run = options.dry_run;
    let fmap_dir = subject_path.join(&config.layout.fmap_dir);

    let outcome = match promote::ensure_category_dirs(subject_path, &config.layout, dry_run) {
        Ok(()) => StageOutcome::Ok,
        Err(e) => StageOutcome::Failed(e.to_string()),
    };
    report.record(Stage::EnsureCategoryDirs, outcome);

    let outcome = match promote::promote_session_files(subject_path, &config.layout, dry_run) {
        Ok(Some(moved)) => {
            info!("sub-{}: promoted {} files", subject_id, moved);
            StageOutcome::Ok
        }
        Ok(None) => StageOutcome::Skipped("no session directory".to_string()),
        Err(e) => StageOutcome::Failed(e.to_string()),
    };
    report.record(Stage::PromoteSessionFiles, outcome);

    let outcome = match rename::strip_session_tokens(subject_path, &config.layout, dry_run) {
        Ok(renamed) => {
            info!("sub-{}: stripped tokens from {} names", subject_id, renamed);
            StageOutcome::Ok
        }
        Err(e) => StageOutcome::Failed(e.to_string()),
    };
    report.record(Stage::StripSessionTokens, outcome);

    let outcome = match fieldmap::rewrite_intended_for(
        &fmap_dir,
        &config.fieldmap,
        &config.layout.session_prefix,
        dry_run,
    ) {
        Ok(rewritten) => {
            info!("sub-{}: rewrote {} sidecars", subject_id, rewritten);
            StageOutcome::Ok
        }
        Err(e) => StageOutcome::Failed(e.to_string()),
    };
    report.record(Stage::RewriteIntendedFor, outcome);

    let outcome = if options.rename_magnitude {
        match fieldmap::rename_magnitude(&fmap_dir, &config.fieldmap, dry_run) {
            Ok(renamed) => {
                info!("sub-{}: renamed {} magnitude files", subject_id, renamed);
                StageOutcome::Ok
            }
            Err(e) => StageOutcome::Failed(e.to_string()),
        }
    } else {
        StageOutcome::Skipped("disabled".to_string())
    };
    report.record(Stage::RenameMagnitude, outcome);

    let outcome = match rename::sweep_stragglers(
        subject_path,
        &config.layout,
        &config.cleanup,
        dry_run,
    ) {
        Ok(renamed) => {
            info!("sub-{}: cleaned {} straggler names", subject_id, renamed);
            StageOutcome::Ok
        }
        Err(e) => StageOutcome::Failed(e.to_string()),
    };
    report.record(Stage::SweepStragglers, outcome);

    if !report.succeeded() {
        warn!(
            "sub-{}: failed stages: {}",
            subject_id,
            report.failed_stages().join(", ")
        );
    }

    report
}

/// Normalize one subject or every subject under the dataset root.
///
/// `subject` of `None` means every subject, in sorted order. A missing
/// root or a missing explicitly-named subject is an unrecoverable
/// configuration error; everything else is caught into the report.
pub fn normalize_dataset(
    root: &Path,
    subject: Option<&str>,
    config: &NormalizerConfig,
    options: &NormalizeOptions,
) -> Result<BatchReport> {
    let layout = DatasetLayout::new(root, &config.layout)
        .with_context(|| format!("Failed to open dataset root: {}", root.display()))?;

    let mut batch = BatchReport::new();

    match subject {
        Some(subject_id) => {
            let subject_path = layout
                .require_subject(subject_id)
                .with_context(|| format!("Invalid subject: {}", subject_id))?;
            batch.push(normalize_subject(&subject_path, subject_id, config, options));
        }
        None => {
            for subject_id in layout.subjects()? {
                let subject_path = layout.subject_path(&subject_id);
                batch.push(normalize_subject(&subject_path, &subject_id, config, options));
            }
        }
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sidecar;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn setup_subject(root: &Path, subject: &str, session: &str) -> std::path::PathBuf {
        let subject_path = root.join(format!("sub-{}", subject));
        for category in ["anat", "fmap", "func"] {
            fs::create_dir_all(subject_path.join(session).join(category)).unwrap();
        }

        fs::write(
            subject_path.join(format!("{session}/anat/sub-{subject}_{session}_T1w.nii.gz")),
            b"",
        )
        .unwrap();
        fs::write(
            subject_path.join(format!(
                "{session}/func/sub-{subject}_{session}_task-rest_bold.nii.gz"
            )),
            b"",
        )
        .unwrap();

        let sidecar_value = json!({
            "fslhd": {"filename": format!("/raw/sub-{subject}_fieldmap.nii")},
            "IntendedFor": [
                format!("sub-{subject}/{session}/func/sub-{subject}_{session}_task-rest_bold.nii.gz"),
                format!("sub-{subject}/{session}/fmap/sub-{subject}_{session}_magnitude.json")
            ]
        });
        fs::write(
            subject_path.join(format!(
                "{session}/fmap/sub-{subject}_{session}_fieldmap.json"
            )),
            serde_json::to_string(&sidecar_value).unwrap(),
        )
        .unwrap();
        fs::write(
            subject_path.join(format!(
                "{session}/fmap/sub-{subject}_{session}_fieldmap.nii.gz"
            )),
            b"",
        )
        .unwrap();

        let magnitude_value = json!({
            "fslhd": {"filename": format!("/raw/sub-{subject}_mag.nii")},
            "IntendedFor": [
                format!("sub-{subject}/{session}/func/sub-{subject}_{session}_task-rest_bold.nii.gz")
            ]
        });
        fs::write(
            subject_path.join(format!("{session}/fmap/sub-{subject}_{session}_acq-2.json")),
            serde_json::to_string(&magnitude_value).unwrap(),
        )
        .unwrap();
        fs::write(
            subject_path.join(format!(
                "{session}/fmap/sub-{subject}_{session}_acq-2.nii.gz"
            )),
            b"",
        )
        .unwrap();

        subject_path
    }

    #[test]
    fn test_normalize_subject_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let subject_path = setup_subject(temp_dir.path(), "00123", "ses-A1");

        let config = NormalizerConfig::default();
        let options = NormalizeOptions {
            rename_magnitude: true,
            dry_run: false,
        };

        let report = normalize_subject(&subject_path, "00123", &config, &options);
        assert!(report.succeeded(), "failed: {:?}", report.failed_stages());

        // Session directory gone, files promoted and stripped
        assert!(!subject_path.join("ses-A1").exists());
        assert!(subject_path.join("anat/sub-00123_T1w.nii.gz").exists());
        assert!(subject_path
            .join("func/sub-00123_task-rest_bold.nii.gz")
            .exists());

        // Fieldmap kept its name, magnitude renamed
        assert!(subject_path.join("fmap/sub-00123_fieldmap.json").exists());
        assert!(subject_path.join("fmap/sub-00123_magnitude.json").exists());
        assert!(subject_path.join("fmap/sub-00123_magnitude.nii.gz").exists());

        // IntendedFor rewritten, self-reference dropped, units set
        let path = subject_path.join("fmap/sub-00123_fieldmap.json");
        let value = sidecar::load_sidecar(&path).unwrap();
        let references = sidecar::intended_for(&value, &path).unwrap();
        assert_eq!(
            references,
            vec!["sub-00123/func/sub-00123_task-rest_bold.nii.gz"]
        );
        assert_eq!(value["Units"], json!("Hz"));
    }

    #[test]
    fn test_normalize_subject_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let subject_path = setup_subject(temp_dir.path(), "00123", "ses-A1");

        let config = NormalizerConfig::default();
        let options = NormalizeOptions {
            rename_magnitude: true,
            dry_run: false,
        };

        let first = normalize_subject(&subject_path, "00123", &config, &options);
        assert!(first.succeeded());

        let second = normalize_subject(&subject_path, "00123", &config, &options);
        assert!(second.succeeded());

        // Second run skipped promotion and changed nothing
        let promote_stage = &second.stages[1];
        assert!(matches!(promote_stage.outcome, StageOutcome::Skipped(_)));
        assert!(subject_path.join("anat/sub-00123_T1w.nii.gz").exists());
        assert!(subject_path.join("fmap/sub-00123_fieldmap.json").exists());
    }

    #[test]
    fn test_normalize_dataset_continues_past_failures() {
        let temp_dir = TempDir::new().unwrap();
        setup_subject(temp_dir.path(), "01", "ses-A1");

        // Subject with a session dir missing its category subdirectories
        let broken = temp_dir.path().join("sub-02");
        fs::create_dir_all(broken.join("ses-B2")).unwrap();
        fs::write(broken.join("ses-B2/stray.txt"), b"").unwrap();

        let config = NormalizerConfig::default();
        let options = NormalizeOptions::default();

        let batch = normalize_dataset(temp_dir.path(), None, &config, &options).unwrap();
        assert_eq!(batch.subjects.len(), 2);
        assert_eq!(batch.succeeded_count(), 1);
        assert_eq!(batch.failed_count(), 1);

        // Healthy subject was still fully normalized
        assert!(temp_dir
            .path()
            .join("sub-01/anat/sub-01_T1w.nii.gz")
            .exists());
    }

    #[test]
    fn test_normalize_dataset_unknown_subject_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        setup_subject(temp_dir.path(), "01", "ses-A1");

        let config = NormalizerConfig::default();
        let options = NormalizeOptions::default();

        let result = normalize_dataset(temp_dir.path(), Some("99"), &config, &options);
        assert!(result.is_err());
    }

    #[test]
    fn test_normalize_subject_dry_run_mutates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let subject_path = setup_subject(temp_dir.path(), "00123", "ses-A1");

        let config = NormalizerConfig::default();
        let options = NormalizeOptions {
            rename_magnitude: false,
            dry_run: true,
        };

        normalize_subject(&subject_path, "00123", &config, &options);

        assert!(subject_path
            .join("ses-A1/anat/sub-00123_ses-A1_T1w.nii.gz")
            .exists());
    }
}
