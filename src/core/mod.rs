//! Core data types and I/O operations.

pub mod layout;
pub mod report;
pub mod sidecar;
pub mod tokens;

pub use layout::{DatasetLayout, LayoutError};
pub use report::{BatchReport, Stage, StageOutcome, SubjectReport};
pub use sidecar::{load_sidecar, save_sidecar, SidecarError};
