//! Normalization stage modules.

pub mod fieldmap;
pub mod promote;
pub mod rename;
pub mod subject;

// Re-export key types for convenience
pub use fieldmap::{rename_magnitude, rewrite_intended_for, FieldmapError};
pub use promote::{ensure_category_dirs, find_session_dir, promote_session_files, PromoteError};
pub use rename::{strip_session_tokens, sweep_stragglers, RenameError};
pub use subject::{normalize_dataset, normalize_subject, NormalizeOptions};
