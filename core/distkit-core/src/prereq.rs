//! Required project file checks

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::error::BuildError;
use crate::fs::FileSystem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrerequisiteStatus {
    /// Path as configured, relative to the project directory.
    pub path: PathBuf,
    pub present: bool,
}

/// Check that every `required` path exists under `root`.
///
/// The error lists exactly the missing entries, in configured order.
pub fn check_prerequisites(
    fs: &dyn FileSystem,
    root: &Path,
    required: &[PathBuf],
) -> Result<Vec<PrerequisiteStatus>, BuildError> {
    let statuses: Vec<PrerequisiteStatus> = required
        .iter()
        .map(|rel| PrerequisiteStatus {
            path: rel.clone(),
            present: fs.exists(&root.join(rel)),
        })
        .collect();

    let missing: Vec<PathBuf> = statuses
        .iter()
        .filter(|s| !s.present)
        .map(|s| s.path.clone())
        .collect();

    if missing.is_empty() {
        info!(count = statuses.len(), "all required files present");
        return Ok(statuses);
    }

    for status in &statuses {
        error!(path = %status.path.display(), present = status.present, "required file");
    }
    Err(BuildError::MissingPrerequisites { missing })
}
