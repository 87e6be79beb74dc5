//! Run configuration with the built-in defaults and JSON overrides

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Everything the app build pipeline needs to know about a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppBuildConfig {
    /// Image names killed before cleaning, e.g. `electron.exe`.
    pub stale_processes: Vec<String>,
    pub output_dirs: Vec<PathBuf>,
    pub prerequisites: Vec<PathBuf>,
    pub toolchain_check: String,
    pub cache_clear: String,
    pub dependency_dir: PathBuf,
    pub install: String,
    pub build: String,
    /// Directory scanned for installers and swept for license files.
    pub artifact_dir: PathBuf,
    pub installer_extension: String,
    pub prune_licenses: bool,
    pub prune_dependencies: bool,
}

impl Default for AppBuildConfig {
    fn default() -> Self {
        Self {
            stale_processes: vec!["electron.exe".to_string(), "antnote.exe".to_string()],
            output_dirs: vec![
                PathBuf::from("dist"),
                PathBuf::from("dist-electron"),
                PathBuf::from("build"),
            ],
            prerequisites: vec![
                PathBuf::from("package.json"),
                PathBuf::from("vite.config.ts"),
                PathBuf::from("electron").join("main.ts"),
            ],
            toolchain_check: "node --version".to_string(),
            cache_clear: "npm cache clean --force".to_string(),
            dependency_dir: PathBuf::from("node_modules"),
            install: "npm install".to_string(),
            build: "npm run build".to_string(),
            artifact_dir: PathBuf::from("dist"),
            installer_extension: "exe".to_string(),
            prune_licenses: true,
            prune_dependencies: true,
        }
    }
}

impl AppBuildConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("toolchain_check", &self.toolchain_check),
            ("install", &self.install),
            ("build", &self.build),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("app.{field} must not be empty")));
            }
        }

        if self.installer_extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::Invalid(
                "app.installer_extension must not be empty".to_string(),
            ));
        }

        for dir in &self.output_dirs {
            check_project_subdir("app.output_dirs", dir)?;
        }
        check_project_subdir("app.dependency_dir", &self.dependency_dir)?;
        check_project_subdir("app.artifact_dir", &self.artifact_dir)?;

        Ok(())
    }

    /// Extension without a leading dot.
    pub fn installer_extension(&self) -> &str {
        self.installer_extension.trim_start_matches('.')
    }
}

/// Settings for packaging a single script into a console executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageConfig {
    pub tool: String,
    pub script: PathBuf,
    pub name: String,
    /// Holds both the tool's work files and its generated spec file.
    pub work_dir: PathBuf,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            tool: "pyinstaller".to_string(),
            script: PathBuf::from("antagonista.py"),
            name: "antagonista".to_string(),
            work_dir: PathBuf::from("build"),
        }
    }
}

impl PackageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tool.trim().is_empty() {
            return Err(ConfigError::Invalid("package.tool must not be empty".to_string()));
        }
        if self.name.trim().is_empty() || self.name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "package.name `{}` must be a plain file name",
                self.name
            )));
        }
        check_project_subdir("package.work_dir", &self.work_dir)?;
        Ok(())
    }
}

/// Directories that get deleted or swept must name something strictly inside
/// the project: plain components only, no `.`, `..`, root or prefix.
fn check_project_subdir(field: &str, dir: &Path) -> Result<(), ConfigError> {
    let mut components = dir.components().peekable();
    let plain = components.peek().is_some()
        && components.all(|c| matches!(c, Component::Normal(_)));
    if plain {
        return Ok(());
    }
    Err(ConfigError::Invalid(format!(
        "{field}: `{}` must be a directory inside the project",
        dir.display()
    )))
}

/// Top-level config file layout. Both sections are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistkitConfig {
    pub app: AppBuildConfig,
    pub package: PackageConfig,
}

impl DistkitConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.app.validate()?;
        config.package.validate()?;
        Ok(config)
    }
}
