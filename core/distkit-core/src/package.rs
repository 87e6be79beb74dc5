//! Single-executable packaging of one input script

use std::env::consts::EXE_SUFFIX;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::PackageConfig;
use crate::error::BuildError;
use crate::fs::FileSystem;
use crate::runner::{CommandRunner, Invocation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    pub executable: PathBuf,
    pub work_dir_removed: bool,
}

pub struct Packager<'a> {
    config: &'a PackageConfig,
    project_dir: PathBuf,
    runner: &'a dyn CommandRunner,
    fs: &'a dyn FileSystem,
}

impl<'a> Packager<'a> {
    pub fn new(
        config: &'a PackageConfig,
        project_dir: impl Into<PathBuf>,
        runner: &'a dyn CommandRunner,
        fs: &'a dyn FileSystem,
    ) -> Self {
        Self {
            config,
            project_dir: project_dir.into(),
            runner,
            fs,
        }
    }

    pub fn script_path(&self) -> PathBuf {
        self.project_dir.join(&self.config.script)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.project_dir.join(&self.config.work_dir)
    }

    /// Where the packaged executable lands: the project directory, which is
    /// passed to the tool as its dist path.
    pub fn output_executable(&self) -> PathBuf {
        self.project_dir
            .join(format!("{}{}", self.config.name, EXE_SUFFIX))
    }

    /// One-file console build; work and spec files share the work dir, which
    /// the tool cleans before building.
    pub fn arguments(&self) -> Vec<OsString> {
        let work_dir = self.work_dir();
        vec![
            "--onefile".into(),
            "--console".into(),
            "--name".into(),
            self.config.name.clone().into(),
            "--distpath".into(),
            self.project_dir.clone().into_os_string(),
            "--workpath".into(),
            work_dir.clone().into_os_string(),
            "--specpath".into(),
            work_dir.into_os_string(),
            "--clean".into(),
            self.script_path().into_os_string(),
        ]
    }

    /// `tool` may carry leading arguments of its own, as in
    /// `python -m PyInstaller`.
    pub fn invocation(&self) -> Invocation {
        let mut words = self.config.tool.split_whitespace();
        let program = words.next().unwrap_or_default().to_string();
        let args: Vec<OsString> = words
            .map(OsString::from)
            .chain(self.arguments())
            .collect();
        Invocation::program(program, args)
    }

    pub fn run(&self) -> Result<PackageReport, BuildError> {
        let script = self.script_path();
        if !self.fs.exists(&script) {
            error!(script = %script.display(), "input script missing");
            return Err(BuildError::MissingInput { path: script });
        }

        info!(script = %script.display(), tool = %self.config.tool, "packaging executable");
        let invocation = self.invocation();
        let outcome = self.runner.run(&invocation, Some(&self.project_dir));
        if !outcome.success {
            error!(code = ?outcome.code, "packaging tool failed");
            return Err(BuildError::CommandFailed {
                step: "packaging",
                command: invocation.to_string(),
            });
        }

        let executable = self.output_executable();
        info!(executable = %executable.display(), "executable created");

        let work_dir_removed = self.remove_work_dir(&self.work_dir());
        Ok(PackageReport {
            executable,
            work_dir_removed,
        })
    }

    fn remove_work_dir(&self, work_dir: &Path) -> bool {
        if !self.fs.exists(work_dir) {
            return false;
        }
        match self.fs.remove_dir_all(work_dir) {
            Ok(()) => {
                info!(path = %work_dir.display(), "work directory removed");
                true
            }
            Err(err) => {
                warn!(path = %work_dir.display(), error = %err, "could not remove work directory");
                false
            }
        }
    }
}
