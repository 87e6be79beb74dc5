//! Removal of previous build output directories

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::error::BuildError;
use crate::fs::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirRemoval {
    Absent,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputDirStatus {
    pub path: PathBuf,
    pub removal: DirRemoval,
}

/// Remove each `dirs` entry under `root`, stopping at the first one that
/// cannot be removed or is still there afterwards.
pub fn remove_output_dirs(
    fs: &dyn FileSystem,
    root: &Path,
    dirs: &[PathBuf],
) -> Result<Vec<OutputDirStatus>, BuildError> {
    let mut statuses = Vec::with_capacity(dirs.len());

    for dir in dirs {
        let path = root.join(dir);
        if !fs.exists(&path) {
            statuses.push(OutputDirStatus {
                path,
                removal: DirRemoval::Absent,
            });
            continue;
        }

        info!(path = %path.display(), "removing previous output directory");
        if let Err(source) = fs.remove_dir_all(&path) {
            error!(path = %path.display(), error = %source, "output directory is locked");
            return Err(BuildError::OutputDirLocked { path, source });
        }

        if fs.exists(&path) {
            error!(path = %path.display(), "output directory survived removal");
            return Err(BuildError::OutputDirStillPresent { path });
        }

        statuses.push(OutputDirStatus {
            path,
            removal: DirRemoval::Removed,
        });
    }

    Ok(statuses)
}
