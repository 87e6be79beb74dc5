//! Fatal error taxonomy for distkit runs

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A condition that aborts a build or packaging run.
///
/// Best-effort failures (process kill, cache clear, single file deletions)
/// never become a `BuildError`; they are logged and the run continues.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(
        "could not remove {}: {source}. Close any application using this folder \
         (editor, file explorer, a running copy of the app) and try again",
        .path.display()
    )]
    OutputDirLocked {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "{} still exists after removal; something is holding a lock on it",
        .path.display()
    )]
    OutputDirStillPresent { path: PathBuf },

    #[error("required files not found: {}", join_paths(.missing))]
    MissingPrerequisites { missing: Vec<PathBuf> },

    #[error("build toolchain not available: `{command}` failed; install it and make sure it is on PATH")]
    ToolchainUnavailable { command: String },

    #[error("{step} failed: `{command}` exited unsuccessfully")]
    CommandFailed { step: &'static str, command: String },

    #[error("input script not found: {}", .path.display())]
    MissingInput { path: PathBuf },
}

/// Problems loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prerequisites_lists_every_path() {
        let err = BuildError::MissingPrerequisites {
            missing: vec![PathBuf::from("package.json"), PathBuf::from("vite.config.ts")],
        };
        assert_eq!(
            err.to_string(),
            "required files not found: package.json, vite.config.ts"
        );
    }

    #[test]
    fn locked_dir_suggests_closing_other_applications() {
        let err = BuildError::OutputDirLocked {
            path: PathBuf::from("dist"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "in use"),
        };
        let text = err.to_string();
        assert!(text.starts_with("could not remove dist: in use"));
        assert!(text.contains("try again"));
    }
}
