//! Per-stage outcome accumulation and the plain-text run log.
//!
//! Every stage failure is recorded here instead of propagating, so a
//! bad subject never halts the rest of the batch.

use std::fmt;
use std::io::{self, Write};

/// The normalization stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    EnsureCategoryDirs,
    PromoteSessionFiles,
    StripSessionTokens,
    RewriteIntendedFor,
    RenameMagnitude,
    SweepStragglers,
}

impl Stage {
    /// Stable label used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::EnsureCategoryDirs => "ensure_category_dirs",
            Stage::PromoteSessionFiles => "promote_session_files",
            Stage::StripSessionTokens => "strip_session_tokens",
            Stage::RewriteIntendedFor => "rewrite_intended_for",
            Stage::RenameMagnitude => "rename_magnitude",
            Stage::SweepStragglers => "sweep_stragglers",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single stage for a single subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Stage ran and completed.
    Ok,
    /// Stage did not apply (e.g. no session directory); counts as success.
    Skipped(String),
    /// Stage failed; the subject continues with the next stage.
    Failed(String),
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::Ok => write!(f, "successful"),
            StageOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            StageOutcome::Failed(message) => write!(f, "FAILED: {}", message),
        }
    }
}

/// One recorded stage result.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

/// All stage results for one subject.
#[derive(Debug, Clone)]
pub struct SubjectReport {
    pub subject: String,
    pub stages: Vec<StageReport>,
}

impl SubjectReport {
    pub fn new(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            stages: Vec::with_capacity(6),
        }
    }

    /// Record a stage outcome.
    pub fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.stages.push(StageReport { stage, outcome });
    }

    /// True if no stage failed (skips count as success).
    pub fn succeeded(&self) -> bool {
        !self
            .stages
            .iter()
            .any(|s| matches!(s.outcome, StageOutcome::Failed(_)))
    }

    /// Names of the stages that failed.
    pub fn failed_stages(&self) -> Vec<&'static str> {
        self.stages
            .iter()
            .filter(|s| matches!(s.outcome, StageOutcome::Failed(_)))
            .map(|s| s.stage.as_str())
            .collect()
    }
}

/// Accumulated results for a whole run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub subjects: Vec<SubjectReport>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: SubjectReport) {
        self.subjects.push(report);
    }

    /// Number of subjects with no failed stage.
    pub fn succeeded_count(&self) -> usize {
        self.subjects.iter().filter(|s| s.succeeded()).count()
    }

    /// Number of subjects with at least one failed stage.
    pub fn failed_count(&self) -> usize {
        self.subjects.len() - self.succeeded_count()
    }

    /// Write the plain-text run log: one block per subject, one
    /// `stage: outcome` line per stage.
    pub fn write_log<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for subject in &self.subjects {
            writeln!(writer, "\n** sub-{} **", subject.subject)?;
            for stage in &subject.stages {
                writeln!(writer, "{}:\t{}", stage.stage, stage.outcome)?;
            }
        }
        Ok(())
    }
}
