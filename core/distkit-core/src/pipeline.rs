//! App build pipeline: ordered, gated stages from cleanup to installer

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

use crate::clean::{remove_output_dirs, OutputDirStatus};
use crate::config::AppBuildConfig;
use crate::error::BuildError;
use crate::fs::FileSystem;
use crate::prereq::{check_prerequisites, PrerequisiteStatus};
use crate::process::{terminate_stale, Termination};
use crate::prune::{prune_dependency_tree, remove_license_files, PruneReport};
use crate::runner::{CommandRunner, Invocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    TerminateProcesses,
    CleanOutputs,
    CheckPrerequisites,
    CheckToolchain,
    ClearCache,
    InstallDependencies,
    Build,
    PruneOutputs,
    CollectArtifacts,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::TerminateProcesses,
        Stage::CleanOutputs,
        Stage::CheckPrerequisites,
        Stage::CheckToolchain,
        Stage::ClearCache,
        Stage::InstallDependencies,
        Stage::Build,
        Stage::PruneOutputs,
        Stage::CollectArtifacts,
    ];

    /// A failing fatal stage ends the run; any other stage only degrades it.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            Stage::CleanOutputs
                | Stage::CheckPrerequisites
                | Stage::CheckToolchain
                | Stage::InstallDependencies
                | Stage::Build
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::TerminateProcesses => "terminate-processes",
            Stage::CleanOutputs => "clean-outputs",
            Stage::CheckPrerequisites => "check-prerequisites",
            Stage::CheckToolchain => "check-toolchain",
            Stage::ClearCache => "clear-cache",
            Stage::InstallDependencies => "install-dependencies",
            Stage::Build => "build",
            Stage::PruneOutputs => "prune-outputs",
            Stage::CollectArtifacts => "collect-artifacts",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StageOutcome {
    Passed,
    /// A best-effort stage did not fully succeed; the run went on.
    Degraded { reason: String },
    Failed { reason: String },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

/// Everything observed during one run, successful or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub stages: Vec<StageRecord>,
    pub terminations: Vec<Termination>,
    pub output_dirs: Vec<OutputDirStatus>,
    pub prerequisites: Vec<PrerequisiteStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_prune: Option<PruneReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_prune: Option<PruneReport>,
    pub artifacts: Vec<PathBuf>,
}

impl RunReport {
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.stages.push(StageRecord { stage, outcome });
    }
}

/// The run stopped at `stage`. `report` holds every stage up to and
/// including the failed one.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct PipelineFailure {
    pub stage: Stage,
    pub report: RunReport,
    #[source]
    pub source: BuildError,
}

/// Drives [`Stage::ALL`] in order against one project directory.
pub struct AppPipeline<'a> {
    config: &'a AppBuildConfig,
    project_dir: PathBuf,
    runner: &'a dyn CommandRunner,
    fs: &'a dyn FileSystem,
}

impl<'a> AppPipeline<'a> {
    pub fn new(
        config: &'a AppBuildConfig,
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

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn run(&self) -> Result<RunReport, PipelineFailure> {
        info!(project = %self.project_dir.display(), "starting app build");
        let mut report = RunReport::default();

        for stage in Stage::ALL {
            let _span = info_span!("stage", stage = %stage).entered();
            match self.run_stage(stage, &mut report) {
                Ok(outcome) => {
                    debug!(?outcome, "stage finished");
                    report.record(stage, outcome);
                }
                Err(err) if !stage.is_fatal() => {
                    warn!(error = %err, "best-effort stage failed; continuing");
                    report.record(
                        stage,
                        StageOutcome::Degraded {
                            reason: err.to_string(),
                        },
                    );
                }
                Err(err) => {
                    error!(error = %err, "stage failed; aborting");
                    report.record(
                        stage,
                        StageOutcome::Failed {
                            reason: err.to_string(),
                        },
                    );
                    return Err(PipelineFailure {
                        stage,
                        report,
                        source: err,
                    });
                }
            }
        }

        info!(artifacts = report.artifacts.len(), "app build finished");
        Ok(report)
    }

    fn run_stage(&self, stage: Stage, report: &mut RunReport) -> Result<StageOutcome, BuildError> {
        match stage {
            Stage::TerminateProcesses => {
                report.terminations = terminate_stale(self.runner, &self.config.stale_processes);
                Ok(StageOutcome::Passed)
            }
            Stage::CleanOutputs => {
                report.output_dirs =
                    remove_output_dirs(self.fs, &self.project_dir, &self.config.output_dirs)?;
                Ok(StageOutcome::Passed)
            }
            Stage::CheckPrerequisites => {
                report.prerequisites =
                    check_prerequisites(self.fs, &self.project_dir, &self.config.prerequisites)?;
                Ok(StageOutcome::Passed)
            }
            Stage::CheckToolchain => {
                if self.shell(&self.config.toolchain_check) {
                    Ok(StageOutcome::Passed)
                } else {
                    Err(BuildError::ToolchainUnavailable {
                        command: self.config.toolchain_check.clone(),
                    })
                }
            }
            Stage::ClearCache => {
                if self.shell(&self.config.cache_clear) {
                    Ok(StageOutcome::Passed)
                } else {
                    Ok(StageOutcome::Degraded {
                        reason: format!("`{}` failed", self.config.cache_clear),
                    })
                }
            }
            Stage::InstallDependencies => {
                self.remove_dependency_tree();
                self.shell_or_fail("dependency install", &self.config.install)
            }
            Stage::Build => self.shell_or_fail("build", &self.config.build),
            Stage::PruneOutputs => Ok(self.prune_outputs(report)),
            Stage::CollectArtifacts => {
                report.artifacts = self.collect_artifacts();
                Ok(StageOutcome::Passed)
            }
        }
    }

    fn shell(&self, line: &str) -> bool {
        self.runner
            .run(&Invocation::shell(line), Some(&self.project_dir))
            .success
    }

    fn shell_or_fail(&self, step: &'static str, line: &str) -> Result<StageOutcome, BuildError> {
        if self.shell(line) {
            Ok(StageOutcome::Passed)
        } else {
            Err(BuildError::CommandFailed {
                step,
                command: line.to_string(),
            })
        }
    }

    /// Removal errors are ignored; the install step reports real problems.
    fn remove_dependency_tree(&self) {
        let deps = self.project_dir.join(&self.config.dependency_dir);
        if !self.fs.exists(&deps) {
            return;
        }
        info!(path = %deps.display(), "removing previous dependency tree");
        if let Err(err) = self.fs.remove_dir_all(&deps) {
            debug!(path = %deps.display(), error = %err, "ignoring dependency tree removal failure");
        }
    }

    fn prune_outputs(&self, report: &mut RunReport) -> StageOutcome {
        if !self.config.prune_licenses && !self.config.prune_dependencies {
            return StageOutcome::Skipped;
        }

        let mut failures = 0;
        if self.config.prune_licenses {
            let licenses = remove_license_files(&self.project_dir.join(&self.config.artifact_dir));
            failures += licenses.failed.len();
            report.license_prune = Some(licenses);
        }
        if self.config.prune_dependencies {
            report.dependency_prune = Some(prune_dependency_tree(
                &self.project_dir.join(&self.config.dependency_dir),
            ));
        }

        if failures == 0 {
            StageOutcome::Passed
        } else {
            StageOutcome::Degraded {
                reason: format!("{failures} license file(s) could not be removed"),
            }
        }
    }

    fn collect_artifacts(&self) -> Vec<PathBuf> {
        let dir = self.project_dir.join(&self.config.artifact_dir);
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "no artifact directory");
            return Vec::new();
        }

        let pattern = format!(
            "{}/*.{}",
            glob::Pattern::escape(&dir.to_string_lossy()),
            glob::Pattern::escape(self.config.installer_extension())
        );
        let mut found: Vec<PathBuf> = match glob::glob(&pattern) {
            Ok(paths) => paths.filter_map(Result::ok).collect(),
            Err(err) => {
                warn!(error = %err, "invalid artifact pattern");
                Vec::new()
            }
        };
        found.sort();

        for path in &found {
            info!(path = %path.display(), "installer found");
        }
        found
    }
}
